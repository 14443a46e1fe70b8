//! 坐标空间层级
//!
//! 每个空间持有到父空间的矩阵和其逆矩阵。任意两个空间之间的转换
//! 经由最低公共祖先（LCA）组合矩阵链得到。
//!
//! - SpaceGraph: 父链接图的抽象（SpaceTree、Armature 实现）
//! - SpaceTree: 独立的空间树 arena

mod tree;

pub use tree::{CoordinateSpace3D, SpaceId, SpaceTree};

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use glam::DVec3;

use crate::math::{Aabb, Matrix4d, MutableMatrix4d};
use crate::{EngineError, Result};

/// 父链接的空间图
///
/// 父链必须有限且无环，否则祖先遍历不会终止。
pub trait SpaceGraph {
    type Id: Copy + Eq + Hash + Debug;

    /// 父空间，None 为根
    fn parent_of(&self, id: Self::Id) -> Option<Self::Id>;

    /// 本空间到父空间
    fn matrix_of(&self, id: Self::Id) -> &Matrix4d;

    /// 父空间到本空间
    fn inverse_matrix_of(&self, id: Self::Id) -> &Matrix4d;
}

/// 最低公共祖先
///
/// 先同步沿两条父链上行检查直线关系（距离短时最快），再收集一侧的
/// 全部祖先并从另一侧探测（处理深度不均衡的情况）。
pub fn lowest_common_ancestor<G: SpaceGraph>(graph: &G, a: G::Id, b: G::Id) -> Option<G::Id> {
    if a == b {
        return Some(a);
    }

    let mut a_ancestor = graph.parent_of(a);
    let mut b_ancestor = graph.parent_of(b);
    while a_ancestor.is_some() || b_ancestor.is_some() {
        if a_ancestor == Some(b) {
            return Some(b);
        }
        if b_ancestor == Some(a) {
            return Some(a);
        }
        a_ancestor = a_ancestor.and_then(|id| graph.parent_of(id));
        b_ancestor = b_ancestor.and_then(|id| graph.parent_of(id));
    }

    let mut ancestors = HashSet::new();
    let mut ancestor = graph.parent_of(a);
    while let Some(id) = ancestor {
        ancestors.insert(id);
        ancestor = graph.parent_of(id);
    }
    let mut ancestor = graph.parent_of(b);
    while let Some(id) = ancestor {
        if ancestors.contains(&id) {
            return Some(id);
        }
        ancestor = graph.parent_of(id);
    }

    None
}

/// from 空间中的点转换到 to 空间的矩阵
pub fn conversion_matrix<G: SpaceGraph>(graph: &G, from: G::Id, to: G::Id) -> Result<Matrix4d> {
    if from == to {
        return Ok(Matrix4d::IDENTITY);
    }
    if graph.parent_of(from) == Some(to) {
        return Ok(*graph.matrix_of(from));
    }
    if graph.parent_of(to) == Some(from) {
        return Ok(*graph.inverse_matrix_of(to));
    }

    let mut scratch = MutableMatrix4d::new();
    conversion_matrix_into(graph, from, to, &mut scratch)?;
    Ok(scratch.to_immutable())
}

/// 同 [`conversion_matrix`]，结果写入调用方提供的缓冲区
///
/// 两个空间呈直线祖先关系（如骨骼到世界）时不做堆分配。
pub fn conversion_matrix_into<G: SpaceGraph>(
    graph: &G,
    from: G::Id,
    to: G::Id,
    out: &mut MutableMatrix4d,
) -> Result<()> {
    let lca = lowest_common_ancestor(graph, from, to).ok_or_else(|| EngineError::UnrelatedSpaces {
        from: format!("{:?}", from),
        to: format!("{:?}", to),
    })?;

    // down(to <- lca) * up(from -> lca)
    out.set_identity();
    let mut node = to;
    while node != lca {
        out.mul_assign(graph.inverse_matrix_of(node));
        node = parent_or_root(graph, node)?;
    }

    // up 链自下而上左乘
    let mut up = MutableMatrix4d::new();
    let mut node = from;
    while node != lca {
        up.pre_mul(graph.matrix_of(node));
        node = parent_or_root(graph, node)?;
    }
    out.mul_assign(&up.to_immutable());
    Ok(())
}

fn parent_or_root<G: SpaceGraph>(graph: &G, id: G::Id) -> Result<G::Id> {
    graph.parent_of(id).ok_or_else(|| EngineError::UnrelatedSpaces {
        from: format!("{:?}", id),
        to: "<root>".to_string(),
    })
}

pub fn convert_point<G: SpaceGraph>(graph: &G, point: DVec3, from: G::Id, to: G::Id) -> Result<DVec3> {
    Ok(conversion_matrix(graph, from, to)?.transform(point))
}

/// 转换到父空间，根空间原样返回
pub fn convert_point_to_parent<G: SpaceGraph>(graph: &G, point: DVec3, id: G::Id) -> DVec3 {
    match graph.parent_of(id) {
        Some(_) => graph.matrix_of(id).transform(point),
        None => point,
    }
}

/// 从父空间转换进来，根空间原样返回
pub fn convert_point_from_parent<G: SpaceGraph>(graph: &G, point: DVec3, id: G::Id) -> DVec3 {
    match graph.parent_of(id) {
        Some(_) => graph.inverse_matrix_of(id).transform(point),
        None => point,
    }
}

/// 把盒子转换为目标空间中包围它的最小轴对齐盒
///
/// **不可逆**：有旋转时返回的盒子包含而不等于原盒，再转回来会继续变大。
pub fn convert_box<G: SpaceGraph>(graph: &G, aabb: &Aabb, from: G::Id, to: G::Id) -> Result<Aabb> {
    let matrix = conversion_matrix(graph, from, to)?;
    Ok(transform_box(&matrix, aabb))
}

/// 转换到父空间，根空间原样返回（同样不可逆）
pub fn convert_box_to_parent<G: SpaceGraph>(graph: &G, aabb: &Aabb, id: G::Id) -> Aabb {
    match graph.parent_of(id) {
        Some(_) => transform_box(graph.matrix_of(id), aabb),
        None => *aabb,
    }
}

/// 从父空间转换进来，根空间原样返回（同样不可逆）
pub fn convert_box_from_parent<G: SpaceGraph>(graph: &G, aabb: &Aabb, id: G::Id) -> Aabb {
    match graph.parent_of(id) {
        Some(_) => transform_box(graph.inverse_matrix_of(id), aabb),
        None => *aabb,
    }
}

fn transform_box(matrix: &Matrix4d, aabb: &Aabb) -> Aabb {
    let corners = aabb.corners().map(|c| matrix.transform(c));
    // 8 个角点，from_points 不会返回 None
    Aabb::from_points(corners).unwrap_or(*aabb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::test_util::{approx_mat, approx_vec};
    use crate::math::Quaternion;

    /// root -> a -> a1, root -> b -> b1 -> b2
    fn sample_tree() -> (SpaceTree, [SpaceId; 6]) {
        let mut tree = SpaceTree::new();
        let root = tree.insert_transform(None, DVec3::new(1.0, 2.0, 3.0), Quaternion::IDENTITY, DVec3::ONE).unwrap();
        let a = tree
            .insert_transform(
                Some(root),
                DVec3::new(0.0, 1.0, 0.0),
                Quaternion::from_angle_deg_axis(90.0, DVec3::Y),
                DVec3::new(2.0, 2.0, 2.0),
            )
            .unwrap();
        let a1 = tree
            .insert_transform(Some(a), DVec3::X, Quaternion::from_angle_deg_axis(30.0, DVec3::Z), DVec3::ONE)
            .unwrap();
        let b = tree
            .insert_transform(Some(root), DVec3::new(-3.0, 0.0, 0.0), Quaternion::IDENTITY, DVec3::new(1.0, 0.5, 1.0))
            .unwrap();
        let b1 = tree
            .insert_transform(Some(b), DVec3::Z, Quaternion::from_angle_deg_axis(-45.0, DVec3::X), DVec3::ONE)
            .unwrap();
        let b2 = tree.insert_matrix(Some(b1), Matrix4d::create_translation(DVec3::new(0.0, 0.0, 5.0))).unwrap();
        (tree, [root, a, a1, b, b1, b2])
    }

    #[test]
    fn test_lca() {
        let (tree, [root, a, a1, b, _b1, b2]) = sample_tree();
        assert_eq!(lowest_common_ancestor(&tree, a1, b2), Some(root));
        assert_eq!(lowest_common_ancestor(&tree, a1, a), Some(a));
        assert_eq!(lowest_common_ancestor(&tree, root, b2), Some(root));
        assert_eq!(lowest_common_ancestor(&tree, b, b), Some(b));
    }

    #[test]
    fn test_round_trip_identity() {
        let (tree, ids) = sample_tree();
        for &from in &ids {
            for &to in &ids {
                let there = conversion_matrix(&tree, from, to).unwrap();
                let back = conversion_matrix(&tree, to, from).unwrap();
                assert!(approx_mat(&(there * back), &Matrix4d::IDENTITY), "{:?} <-> {:?}", from, to);
            }
        }
    }

    #[test]
    fn test_conversion_matches_chain() {
        let (tree, [root, a, a1, b, b1, b2]) = sample_tree();
        let p = DVec3::new(0.5, -1.0, 2.0);

        // a1 -> root 的点再从 root 进入 b2
        let in_root = convert_point_to_parent(&tree, convert_point_to_parent(&tree, p, a1), a);
        let direct = convert_point(&tree, p, a1, root).unwrap();
        assert!(approx_vec(in_root, direct));

        let in_b2 = convert_point(&tree, p, a1, b2).unwrap();
        let in_b = convert_point(&tree, direct, root, b).unwrap();
        let manual = convert_point_from_parent(&tree, convert_point_from_parent(&tree, in_b, b1), b2);
        assert!(approx_vec(in_b2, manual));
    }

    #[test]
    fn test_conversion_into_overwrites_scratch() {
        let (tree, [root, a, a1, b, b1, b2]) = sample_tree();
        let mut scratch = MutableMatrix4d::new();
        for (from, to) in [(a1, b2), (b2, a1), (b1, a), (a1, root), (root, b2), (b, b1)] {
            // 残留内容不影响结果
            scratch.set(&Matrix4d::create_scaling(DVec3::splat(7.0)));
            conversion_matrix_into(&tree, from, to, &mut scratch).unwrap();
            let expected = conversion_matrix(&tree, from, to).unwrap();
            assert!(approx_mat(&scratch.to_immutable(), &expected), "{:?} -> {:?}", from, to);
        }

        // 跨分支：a1 -> root -> b -> b1 -> b2 逐级组合
        conversion_matrix_into(&tree, a1, b2, &mut scratch).unwrap();
        let manual = tree.get(b2).unwrap().inverse_matrix
            * tree.get(b1).unwrap().inverse_matrix
            * tree.get(b).unwrap().inverse_matrix
            * tree.get(a).unwrap().matrix
            * tree.get(a1).unwrap().matrix;
        assert!(approx_mat(&scratch.to_immutable(), &manual));
    }

    #[test]
    fn test_unrelated_spaces() {
        let mut tree = SpaceTree::new();
        let first = tree.insert_matrix(None, Matrix4d::IDENTITY).unwrap();
        let second = tree.insert_matrix(None, Matrix4d::create_translation(DVec3::X)).unwrap();
        let child = tree.insert_matrix(Some(second), Matrix4d::IDENTITY).unwrap();

        let err = conversion_matrix(&tree, first, child).unwrap_err();
        match err {
            EngineError::UnrelatedSpaces { from, to } => {
                assert_eq!(from, format!("{:?}", first));
                assert_eq!(to, format!("{:?}", child));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_box_conversion_grows_under_rotation() {
        let mut tree = SpaceTree::new();
        let root = tree.insert_matrix(None, Matrix4d::IDENTITY).unwrap();
        let rotated = tree
            .insert_transform(Some(root), DVec3::ZERO, Quaternion::from_angle_deg_axis(45.0, DVec3::Z), DVec3::ONE)
            .unwrap();

        let unit = Aabb::new(DVec3::splat(-1.0), DVec3::ONE);
        let out = convert_box(&tree, &unit, rotated, root).unwrap();
        assert!(out.contains_box(&unit));

        let back = convert_box(&tree, &out, root, rotated).unwrap();
        assert!(back.contains_box(&unit));
        assert!(back.size().x > unit.size().x + 1.0);
    }

    #[test]
    fn test_box_from_parent() {
        let mut tree = SpaceTree::new();
        let root = tree.insert_matrix(None, Matrix4d::IDENTITY).unwrap();
        let child = tree
            .insert_transform(Some(root), DVec3::new(2.0, 0.0, 0.0), Quaternion::IDENTITY, DVec3::splat(2.0))
            .unwrap();

        let parent_box = Aabb::new(DVec3::new(2.0, -2.0, -2.0), DVec3::new(6.0, 2.0, 2.0));
        let local = convert_box_from_parent(&tree, &parent_box, child);
        assert!(approx_vec(local.min, DVec3::new(0.0, -1.0, -1.0)));
        assert!(approx_vec(local.max, DVec3::new(2.0, 1.0, 1.0)));

        let back = convert_box_to_parent(&tree, &local, child);
        assert!(approx_vec(back.min, parent_box.min));
        assert!(approx_vec(back.max, parent_box.max));

        // 根空间原样返回
        assert_eq!(convert_box_from_parent(&tree, &parent_box, root), parent_box);
    }
}

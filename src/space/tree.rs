//! 坐标空间树

use glam::DVec3;

use super::SpaceGraph;
use crate::math::{Matrix4d, Quaternion, EPSILON};
use crate::{EngineError, Result};

/// 空间句柄（SpaceTree 内的下标）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(pub usize);

/// 单个坐标空间
#[derive(Clone, Debug)]
pub struct CoordinateSpace3D {
    /// 父空间，None 表示根（世界）
    pub parent: Option<SpaceId>,
    /// 本空间到父空间
    pub matrix: Matrix4d,
    /// 父空间到本空间，由逆变换直接构造而非矩阵求逆
    pub inverse_matrix: Matrix4d,
}

impl CoordinateSpace3D {
    /// T * R * S 及其逆 S⁻¹ * R⁻¹ * T⁻¹
    ///
    /// 零缩放分量的逆缩放取 0，不会报错。
    pub fn from_transform(
        parent: Option<SpaceId>,
        translation: DVec3,
        rotation: Quaternion,
        scale: DVec3,
    ) -> Result<Self> {
        let matrix = Matrix4d::create_translation(translation).rotate(rotation)?.scale(scale);
        let inverse_scale = DVec3::new(inverse_or_zero(scale.x), inverse_or_zero(scale.y), inverse_or_zero(scale.z));
        let inverse_matrix = Matrix4d::create_scaling(inverse_scale)
            .rotate(rotation.invert()?)?
            .translate(-translation);
        Ok(Self { parent, matrix, inverse_matrix })
    }
}

#[inline]
fn inverse_or_zero(v: f64) -> f64 {
    if v.abs() < EPSILON { 0.0 } else { 1.0 / v }
}

/// 空间树 arena
///
/// 插入时父空间必须已存在，因此树天然无环；不支持重新指定父空间。
/// 每个无父空间的节点都是一棵独立的树。
#[derive(Clone, Debug, Default)]
pub struct SpaceTree {
    spaces: Vec<CoordinateSpace3D>,
}

impl SpaceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.is_empty()
    }

    pub fn get(&self, id: SpaceId) -> Option<&CoordinateSpace3D> {
        self.spaces.get(id.0)
    }

    /// 插入空间（矩阵与逆矩阵由调用方提供）
    pub fn insert(&mut self, parent: Option<SpaceId>, matrix: Matrix4d, inverse_matrix: Matrix4d) -> Result<SpaceId> {
        self.push(CoordinateSpace3D { parent, matrix, inverse_matrix })
    }

    /// 由平移/旋转/缩放插入，逆矩阵通过逆变换得到
    pub fn insert_transform(
        &mut self,
        parent: Option<SpaceId>,
        translation: DVec3,
        rotation: Quaternion,
        scale: DVec3,
    ) -> Result<SpaceId> {
        let space = CoordinateSpace3D::from_transform(parent, translation, rotation, scale)?;
        self.push(space)
    }

    /// 由矩阵插入，逆矩阵通过 [`Matrix4d::invert`] 得到
    pub fn insert_matrix(&mut self, parent: Option<SpaceId>, matrix: Matrix4d) -> Result<SpaceId> {
        let inverse_matrix = matrix.invert()?;
        self.push(CoordinateSpace3D { parent, matrix, inverse_matrix })
    }

    /// 原地更新变换（结构不变）
    pub fn set_transform(&mut self, id: SpaceId, translation: DVec3, rotation: Quaternion, scale: DVec3) -> Result<()> {
        let parent = self.space(id)?.parent;
        let updated = CoordinateSpace3D::from_transform(parent, translation, rotation, scale)?;
        self.spaces[id.0] = updated;
        Ok(())
    }

    fn space(&self, id: SpaceId) -> Result<&CoordinateSpace3D> {
        self.spaces
            .get(id.0)
            .ok_or_else(|| EngineError::not_found("space", format!("{}", id.0)))
    }

    fn push(&mut self, space: CoordinateSpace3D) -> Result<SpaceId> {
        if let Some(parent) = space.parent {
            self.space(parent)?;
        }
        let id = SpaceId(self.spaces.len());
        self.spaces.push(space);
        Ok(id)
    }
}

impl SpaceGraph for SpaceTree {
    type Id = SpaceId;

    fn parent_of(&self, id: SpaceId) -> Option<SpaceId> {
        self.spaces.get(id.0).and_then(|s| s.parent)
    }

    fn matrix_of(&self, id: SpaceId) -> &Matrix4d {
        self.spaces.get(id.0).map_or(&Matrix4d::IDENTITY, |s| &s.matrix)
    }

    fn inverse_matrix_of(&self, id: SpaceId) -> &Matrix4d {
        self.spaces.get(id.0).map_or(&Matrix4d::IDENTITY, |s| &s.inverse_matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::test_util::{approx_mat, approx_vec};

    #[test]
    fn test_transform_inverse() {
        let space = CoordinateSpace3D::from_transform(
            None,
            DVec3::new(1.0, -2.0, 3.0),
            Quaternion::from_angle_deg_axis(70.0, DVec3::new(1.0, 1.0, 0.0)),
            DVec3::new(2.0, 0.5, 3.0),
        )
        .unwrap();
        assert!(approx_mat(&(space.matrix * space.inverse_matrix), &Matrix4d::IDENTITY));
    }

    #[test]
    fn test_zero_scale_degrades() {
        let space = CoordinateSpace3D::from_transform(None, DVec3::X, Quaternion::IDENTITY, DVec3::new(1.0, 0.0, 1.0)).unwrap();
        let p = space.inverse_matrix.transform(DVec3::new(2.0, 5.0, 1.0));
        assert!(approx_vec(p, DVec3::new(1.0, 0.0, 1.0)));
    }

    #[test]
    fn test_missing_parent_rejected() {
        let mut tree = SpaceTree::new();
        let err = tree.insert_matrix(Some(SpaceId(3)), Matrix4d::IDENTITY).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: "space", .. }));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_set_transform_keeps_parent() {
        let mut tree = SpaceTree::new();
        let root = tree.insert_matrix(None, Matrix4d::IDENTITY).unwrap();
        let child = tree.insert_matrix(Some(root), Matrix4d::IDENTITY).unwrap();
        tree.set_transform(child, DVec3::Y, Quaternion::IDENTITY, DVec3::ONE).unwrap();
        assert_eq!(tree.parent_of(child), Some(root));
        assert!(approx_vec(tree.matrix_of(child).transform(DVec3::ZERO), DVec3::Y));
    }
}

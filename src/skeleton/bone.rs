//! 骨骼节点
//!
//! Bone 是骨架 arena 中的一个元素，父子关系用下标表示。
//! 每个骨骼同时是一个坐标空间：`matrix` 把骨骼空间的点变换到父空间
//! （根骨骼的父空间是世界空间）。

use std::fmt;

use glam::DVec3;

use super::PoseTransform;
use crate::math::{Matrix4d, Quaternion};
use crate::Result;

/// 外部加载器提供的骨骼绑定数据
#[derive(Clone, Debug, PartialEq)]
pub struct BoneSource {
    pub name: String,
    /// 父骨骼下标，必须小于本骨骼下标
    pub parent: Option<usize>,
    /// 头部位置（模型空间）
    pub position: DVec3,
    /// 相对父骨骼静止姿态的旋转
    pub rotation: Quaternion,
    pub length: f64,
}

impl BoneSource {
    pub fn new(name: impl Into<String>, parent: Option<usize>, position: DVec3, rotation: Quaternion, length: f64) -> Self {
        Self {
            name: name.into(),
            parent,
            position,
            rotation,
            length,
        }
    }
}

/// 骨骼节点
///
/// - 静态数据：名称、父子关系、静止姿态（加载后不变）
/// - 动态数据：姿态驱动写入的 rotation / translation，以及每帧更新的矩阵
/// - 变换计算：matrix = rest_transform * local_transform
#[derive(Clone)]
pub struct Bone {
    // ========================================
    // 静态数据（初始化后不变）
    // ========================================

    /// 骨架内下标
    pub(crate) index: usize,

    pub(crate) name: String,

    /// 父骨骼下标，None 表示根骨骼（父空间为世界）
    pub(crate) parent: Option<usize>,

    pub(crate) children: Vec<usize>,

    /// 静止位置（父骨骼静止空间）
    pub(crate) rest_position: DVec3,

    /// 静止旋转（相对父骨骼）
    pub(crate) rest_rotation: Quaternion,

    pub(crate) length: f64,

    /// 静止姿态下骨骼空间到父空间的变换
    pub(crate) rest_transform: Matrix4d,

    /// rest_transform 的逆（由逆变换构造）
    pub(crate) rest_inverse: Matrix4d,

    /// 逆绑定矩阵：世界空间到本骨骼静止空间（整条链）
    pub(crate) world_to_rest: Matrix4d,

    // ========================================
    // 动态数据（每帧更新）
    // ========================================

    /// 姿态旋转（在本骨骼静止空间中应用）
    pub rotation: Quaternion,

    /// 姿态平移（在本骨骼静止空间中应用）
    pub translation: DVec3,

    /// T(translation) * R(rotation)
    pub(crate) local_transform: Matrix4d,

    /// 当前姿态下骨骼空间到父空间
    pub(crate) matrix: Matrix4d,

    /// 父空间到当前姿态下的骨骼空间
    pub(crate) inverse_matrix: Matrix4d,

    /// 蒙皮矩阵：静止姿态的模型空间顶点 -> 当前姿态的模型空间顶点
    pub(crate) final_matrix: Matrix4d,
}

impl Bone {
    /// 创建骨骼
    ///
    /// `rest_position` 已在父骨骼的静止空间中，`parent_world_to_rest` 为父骨骼的逆绑定矩阵
    /// （根骨骼传单位矩阵）。
    pub(crate) fn new(
        index: usize,
        name: String,
        parent: Option<usize>,
        parent_world_to_rest: &Matrix4d,
        rest_position: DVec3,
        rest_rotation: Quaternion,
        length: f64,
    ) -> Result<Self> {
        let rest = PoseTransform::new(rest_position, rest_rotation);
        let rest_transform = rest.to_matrix()?;
        let rest_inverse = rest.to_inverse_matrix()?;
        let world_to_rest = rest_inverse * *parent_world_to_rest;

        let mut bone = Self {
            index,
            name,
            parent,
            children: Vec::new(),
            rest_position,
            rest_rotation,
            length,
            rest_transform,
            rest_inverse,
            world_to_rest,
            rotation: Quaternion::IDENTITY,
            translation: DVec3::ZERO,
            local_transform: Matrix4d::IDENTITY,
            matrix: rest_transform,
            inverse_matrix: rest_inverse,
            final_matrix: Matrix4d::IDENTITY,
        };
        bone.update_local()?;
        Ok(bone)
    }

    // ========================================
    // 访问器
    // ========================================

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub fn rest_position(&self) -> DVec3 {
        self.rest_position
    }

    #[inline]
    pub fn rest_rotation(&self) -> Quaternion {
        self.rest_rotation
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[inline]
    pub fn rest_transform(&self) -> &Matrix4d {
        &self.rest_transform
    }

    #[inline]
    pub fn world_to_rest(&self) -> &Matrix4d {
        &self.world_to_rest
    }

    #[inline]
    pub fn local_transform(&self) -> &Matrix4d {
        &self.local_transform
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix4d {
        &self.matrix
    }

    #[inline]
    pub fn inverse_matrix(&self) -> &Matrix4d {
        &self.inverse_matrix
    }

    #[inline]
    pub fn final_matrix(&self) -> &Matrix4d {
        &self.final_matrix
    }

    // ========================================
    // 姿态
    // ========================================

    #[inline]
    pub fn pose(&self) -> PoseTransform {
        PoseTransform::new(self.translation, self.rotation)
    }

    #[inline]
    pub fn set_pose(&mut self, pose: PoseTransform) {
        self.translation = pose.translation;
        self.rotation = pose.rotation;
    }

    /// 回到静止姿态
    #[inline]
    pub fn reset_pose(&mut self) {
        self.set_pose(PoseTransform::IDENTITY);
    }

    /// 由当前 rotation / translation 计算 local_transform、matrix、inverse_matrix
    ///
    /// 不涉及父骨骼，final_matrix 由 Armature 在自上而下遍历时计算。
    pub(crate) fn update_local(&mut self) -> Result<()> {
        let pose = self.pose();
        self.local_transform = pose.to_matrix()?;
        self.matrix = self.rest_transform * self.local_transform;
        self.inverse_matrix = pose.to_inverse_matrix()? * self.rest_inverse;
        Ok(())
    }
}

impl fmt::Debug for Bone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bone")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("rotation", &self.rotation)
            .field("translation", &self.translation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::test_util::{approx_mat, approx_vec};

    fn root_bone() -> Bone {
        Bone::new(
            0,
            "root".to_string(),
            None,
            &Matrix4d::IDENTITY,
            DVec3::new(0.0, 1.0, 0.0),
            Quaternion::from_angle_deg_axis(90.0, DVec3::Y),
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_rest_inverse() {
        let bone = root_bone();
        assert!(approx_mat(&(bone.rest_transform * bone.rest_inverse), &Matrix4d::IDENTITY));
        assert!(approx_mat(&(bone.world_to_rest * bone.rest_transform), &Matrix4d::IDENTITY));
    }

    #[test]
    fn test_pose_in_rest_frame() {
        let mut bone = root_bone();
        bone.translation = DVec3::new(0.0, 0.0, 1.0);
        bone.update_local().unwrap();
        // 骨骼空间 +Z 经静止旋转（绕 Y 90 度）后指向父空间 +X
        let origin = bone.matrix.transform(DVec3::ZERO);
        assert!(approx_vec(origin, DVec3::new(1.0, 1.0, 0.0)));
        assert!(approx_mat(&(bone.matrix * bone.inverse_matrix), &Matrix4d::IDENTITY));
    }

    #[test]
    fn test_zero_pose_rotation_errors() {
        let mut bone = root_bone();
        bone.rotation = Quaternion::ZERO;
        assert!(bone.update_local().is_err());
    }
}

//! 骨骼系统
//!
//! 核心设计：
//! - Bone: 骨架 arena 中的单个关节，同时也是一个坐标空间
//! - Armature: 管理骨骼层次结构，实现 SpaceGraph
//! - 静止姿态（rest）在加载时计算一次，动画姿态每帧自上而下更新

mod armature;
mod bone;

pub use armature::{Armature, BoneSpace};
pub use bone::{Bone, BoneSource};

use glam::DVec3;

use crate::math::{Matrix4d, Quaternion};
use crate::Result;

// ============================================================================
// 公共类型定义
// ============================================================================

/// 骨骼局部姿态（相对于静止姿态）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseTransform {
    pub translation: DVec3,
    pub rotation: Quaternion,
}

impl Default for PoseTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PoseTransform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: Quaternion::IDENTITY,
    };

    pub fn new(translation: DVec3, rotation: Quaternion) -> Self {
        Self { translation, rotation }
    }

    /// 转换为 4x4 矩阵：T(translation) * R(rotation)
    #[inline]
    pub fn to_matrix(&self) -> Result<Matrix4d> {
        Matrix4d::create_translation(self.translation).rotate(self.rotation)
    }

    /// 逆矩阵：R⁻¹ * T⁻¹
    #[inline]
    pub fn to_inverse_matrix(&self) -> Result<Matrix4d> {
        Ok(Matrix4d::create_rotation(self.rotation.invert()?)?.translate(-self.translation))
    }
}

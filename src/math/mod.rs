//! 双精度变换代数
//!
//! - Matrix3d / Matrix4d: 不可变矩阵，每次运算返回新值
//! - MutableMatrix3d / MutableMatrix4d: 原地运算，用于每帧骨骼链组合
//! - Quaternion: 旋转四元数
//!
//! 矩阵按行主序存储，`A * B` 表示先应用 B 再应用 A。

mod aabb;
mod matrix3;
mod matrix4;
mod quaternion;

pub use aabb::Aabb;
pub use matrix3::{Matrix3d, MutableMatrix3d};
pub use matrix4::{Matrix4d, MutableMatrix4d};
pub use quaternion::Quaternion;

use std::hash::Hasher;

/// 退化输入阈值（2^-52）
pub const EPSILON: f64 = f64::EPSILON;

/// 写入哈希，-0.0 与 +0.0 视为同一值
#[inline]
pub(crate) fn hash_f64<H: Hasher>(value: f64, state: &mut H) {
    // -0.0 + 0.0 == +0.0
    state.write_u64((value + 0.0).to_bits());
}

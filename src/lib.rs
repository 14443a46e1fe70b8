//! Skeletal Engine - 骨骼模型运行时
//!
//! 提供与宿主无关的骨骼模型核心：
//! - 双精度矩阵 / 四元数代数
//! - 坐标空间层级与最近公共祖先转换
//! - 骨骼、骨架与模型实例（静止姿态与动画姿态分离）
//! - 线性混合蒙皮与面法线重算
//! - 模型重载注册表
//! - Act 关键帧动作

pub mod animation;
pub mod config;
pub mod math;
pub mod model;
pub mod skeleton;
pub mod skinning;
pub mod space;

pub use animation::{Act, ActAction, ActChannel, ActObject};
pub use config::EngineConfig;
pub use math::{Aabb, Matrix3d, Matrix4d, MutableMatrix3d, MutableMatrix4d, Quaternion};
pub use model::{Model, ModelInstance, ModelLibrary, ModelSource};
pub use skeleton::{Armature, Bone, BoneSource, BoneSpace, PoseTransform};
pub use skinning::{BoneIndex, BoneMatrices, VertexWeight};
pub use space::{CoordinateSpace3D, SpaceGraph, SpaceId, SpaceTree};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    #[error("Unrelated coordinate spaces: {from} and {to} share no common ancestor")]
    UnrelatedSpaces { from: String, to: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Invalid model source: {0}")]
    InvalidSource(String),

    #[error("Act parse error at line {line}: {message}")]
    ActParse { line: usize, message: String },
}

impl EngineError {
    pub(crate) fn arithmetic(message: &str) -> Self {
        EngineError::Arithmetic(message.to_string())
    }

    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        EngineError::NotFound { kind, name: name.into() }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

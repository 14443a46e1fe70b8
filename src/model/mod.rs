//! 模型数据与实例
//!
//! - ModelSource: 外部加载器解析好的网格 / 权重 / 骨架 / 动作数据
//! - Model: 共享的只读源数据，可被重载
//! - ModelInstance: 每个使用者持有的可变副本（姿态 + 蒙皮结果）
//! - ModelLibrary: 非拥有的模型列表，统一触发重载

mod instance;
mod library;
mod model;

pub use instance::ModelInstance;
pub use library::ModelLibrary;
pub use model::{InstanceRegistration, Model};

use glam::DVec3;

use crate::animation::Act;
use crate::skeleton::BoneSource;
use crate::skinning::VertexWeight;
use crate::{EngineError, Result};

/// 面（顶点下标与可选的法线下标）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Face {
    pub vertices: Vec<usize>,
    pub normals: Option<Vec<usize>>,
}

impl Face {
    pub fn triangle(vertices: [usize; 3], normals: Option<[usize; 3]>) -> Self {
        Self {
            vertices: vertices.to_vec(),
            normals: normals.map(|n| n.to_vec()),
        }
    }
}

/// 网格数据
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<DVec3>,
    pub normals: Vec<DVec3>,
    pub faces: Vec<Face>,
    /// 每顶点的骨骼权重，可短于顶点数（其余顶点无权重）
    pub weights: Vec<Vec<VertexWeight>>,
}

impl Mesh {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// 骨架绑定数据
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArmatureSource {
    pub name: String,
    pub bones: Vec<BoneSource>,
}

/// 模型源数据
#[derive(Clone, Debug, Default)]
pub struct ModelSource {
    pub mesh: Mesh,
    pub armatures: Vec<ArmatureSource>,
    /// 随模型一起加载的动作
    pub actions: Act,
}

impl ModelSource {
    /// 检查下标引用
    ///
    /// - 父骨骼必须在子骨骼之前
    /// - 面的顶点 / 法线下标不越界
    /// - 权重引用的骨骼存在
    pub fn validate(&self) -> Result<()> {
        for armature in &self.armatures {
            for (i, bone) in armature.bones.iter().enumerate() {
                if let Some(parent) = bone.parent {
                    if parent >= i {
                        return Err(EngineError::InvalidSource(format!(
                            "bone '{}' ({}) in armature '{}' references parent {} which does not precede it",
                            bone.name, i, armature.name, parent
                        )));
                    }
                }
            }
        }

        let mesh = &self.mesh;
        for (i, face) in mesh.faces.iter().enumerate() {
            if let Some(&v) = face.vertices.iter().find(|&&v| v >= mesh.positions.len()) {
                return Err(EngineError::InvalidSource(format!(
                    "face {} references vertex {} but there are {} vertices",
                    i, v, mesh.positions.len()
                )));
            }
            if let Some(normals) = &face.normals {
                if normals.len() != face.vertices.len() {
                    return Err(EngineError::InvalidSource(format!(
                        "face {} has {} vertices but {} normal indices",
                        i, face.vertices.len(), normals.len()
                    )));
                }
                if let Some(&n) = normals.iter().find(|&&n| n >= mesh.normals.len()) {
                    return Err(EngineError::InvalidSource(format!(
                        "face {} references normal {} but there are {} normals",
                        i, n, mesh.normals.len()
                    )));
                }
            }
        }

        if mesh.weights.len() > mesh.positions.len() {
            return Err(EngineError::InvalidSource(format!(
                "{} weight lists for {} vertices",
                mesh.weights.len(),
                mesh.positions.len()
            )));
        }
        for (vertex, weights) in mesh.weights.iter().enumerate() {
            for w in weights {
                let known = self
                    .armatures
                    .get(w.bone.armature)
                    .is_some_and(|a| w.bone.bone < a.bones.len());
                if !known {
                    return Err(EngineError::InvalidSource(format!(
                        "vertex {} weight references missing bone {}:{}",
                        vertex, w.bone.armature, w.bone.bone
                    )));
                }
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_data::triangle_source;

    #[test]
    fn test_valid_source() {
        assert!(triangle_source().validate().is_ok());
    }

    #[test]
    fn test_face_out_of_range() {
        let mut source = triangle_source();
        source.mesh.faces.push(Face::triangle([0, 1, 7], None));
        assert!(matches!(source.validate(), Err(EngineError::InvalidSource(_))));
    }

    #[test]
    fn test_weight_missing_bone() {
        let mut source = triangle_source();
        source.mesh.weights[0].push(VertexWeight::new(0, 9, 1.0));
        assert!(matches!(source.validate(), Err(EngineError::InvalidSource(_))));
    }

    #[test]
    fn test_forward_parent() {
        let mut source = triangle_source();
        source.armatures[0].bones[0].parent = Some(1);
        assert!(matches!(source.validate(), Err(EngineError::InvalidSource(_))));
    }
}

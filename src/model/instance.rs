//! 模型实例

use std::collections::HashMap;
use std::sync::Arc;

use super::{InstanceRegistration, Mesh, Model, ModelSource};
use crate::animation;
use crate::config::{get_config, EngineConfig};
use crate::math::MutableMatrix4d;
use crate::skeleton::{Armature, Bone};
use crate::skinning::{compute_skinning, recompute_face_normals, BoneIndex, BoneMatrices, SkinningInput, SkinningStats};
use crate::{EngineError, Result};

/// 模型实例
///
/// 持有源网格的可变副本和各骨架的姿态。源模型重载后，下一次
/// [`ModelInstance::update_transforms`] 会自动重建。
pub struct ModelInstance {
    registration: InstanceRegistration,
    /// 构建当前状态时的模型代数
    generation: u64,
    /// 静止网格（源数据快照）
    source: Arc<ModelSource>,
    /// 当前姿态下的网格
    mesh: Mesh,
    armatures: Vec<Armature>,
    armature_map: HashMap<String, usize>,
    matrices: BoneMatrices,
    scratch: MutableMatrix4d,
}

impl ModelInstance {
    pub fn new(model: &Arc<Model>) -> Result<Self> {
        let registration = model.register();
        let (generation, source) = model.snapshot();
        let mut instance = Self {
            registration,
            generation,
            mesh: source.mesh.clone(),
            source,
            armatures: Vec::new(),
            armature_map: HashMap::new(),
            matrices: BoneMatrices::new(),
            scratch: MutableMatrix4d::new(),
        };
        instance.build_armatures()?;
        Ok(instance)
    }

    #[inline]
    pub fn model(&self) -> &Arc<Model> {
        self.registration.model()
    }

    /// 当前姿态下的网格（蒙皮位置与重算法线）
    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// 静止网格
    #[inline]
    pub fn rest_mesh(&self) -> &Mesh {
        &self.source.mesh
    }

    #[inline]
    pub fn armatures(&self) -> &[Armature] {
        &self.armatures
    }

    #[inline]
    pub fn armatures_mut(&mut self) -> &mut [Armature] {
        &mut self.armatures
    }

    pub fn find_armature(&self, name: &str) -> Option<&Armature> {
        self.armature_map.get(name).map(|&i| &self.armatures[i])
    }

    /// 按名称查找骨架，不存在时返回 NotFound
    pub fn armature(&self, name: &str) -> Result<&Armature> {
        self.find_armature(name).ok_or_else(|| EngineError::not_found("armature", name))
    }

    pub fn armature_mut(&mut self, name: &str) -> Result<&mut Armature> {
        match self.armature_map.get(name) {
            Some(&i) => Ok(&mut self.armatures[i]),
            None => Err(EngineError::not_found("armature", name)),
        }
    }

    pub fn bone(&self, index: BoneIndex) -> Option<&Bone> {
        self.armatures.get(index.armature)?.get_bone(index.bone)
    }

    pub fn bone_mut(&mut self, index: BoneIndex) -> Option<&mut Bone> {
        self.armatures.get_mut(index.armature)?.get_bone_mut(index.bone)
    }

    /// 从模型当前源数据重建（姿态被重置）
    pub fn load(&mut self) -> Result<()> {
        let (generation, source) = self.model().snapshot();
        self.generation = generation;
        self.mesh = source.mesh.clone();
        self.source = source;
        self.build_armatures()
    }

    fn build_armatures(&mut self) -> Result<()> {
        let armatures = self
            .source
            .armatures
            .iter()
            .enumerate()
            .map(|(i, a)| Armature::from_source(a.name.clone(), i, &a.bones))
            .collect::<Result<Vec<_>>>()?;
        // 重名时保留第一个，与骨骼名查找一致
        self.armature_map.clear();
        for armature in &armatures {
            self.armature_map.entry(armature.name().to_string()).or_insert(armature.index());
        }
        self.armatures = armatures;
        self.matrices.gather(&self.armatures);
        Ok(())
    }

    /// 模型已重载时重建，返回是否发生了重建
    pub fn revalidate(&mut self) -> Result<bool> {
        if self.model().generation() == self.generation {
            return Ok(false);
        }
        log::debug!(
            "[模型] 实例 {} 重建 '{}': 第 {} 代 -> 第 {} 代",
            self.registration.id(),
            self.model().name(),
            self.generation,
            self.model().generation()
        );
        self.load()?;
        Ok(true)
    }

    /// 把模型动作应用到所有骨架，返回被设置姿态的骨骼数
    pub fn apply_action(&mut self, action: &str, frame: f64) -> Result<usize> {
        let source = Arc::clone(&self.source);
        animation::apply_action_to_all(&source.actions, action, &mut self.armatures, frame)
    }

    /// 每帧更新：重新验证、自上而下更新骨骼、蒙皮、重算法线
    pub fn update_transforms(&mut self) -> Result<SkinningStats> {
        let config = get_config();
        self.update_transforms_with(&config)
    }

    pub fn update_transforms_with(&mut self, config: &EngineConfig) -> Result<SkinningStats> {
        self.revalidate()?;
        self.matrices.pose_and_gather(&mut self.armatures, &mut self.scratch)?;

        let input = SkinningInput {
            rest_positions: &self.source.mesh.positions,
            weights: &self.source.mesh.weights,
            matrices: &self.matrices,
        };
        let stats = compute_skinning(&input, config, &mut self.mesh.positions);

        let degenerate = if config.recompute_normals {
            recompute_face_normals(&self.mesh.positions, &self.source.mesh.faces, &mut self.mesh.normals)
        } else {
            0
        };

        if config.debug_log {
            log::debug!(
                "[模型] '{}' 更新: 蒙皮 {} 个顶点, {} 个未受影响, {} 个退化面",
                self.model().name(),
                stats.skinned,
                stats.untouched,
                degenerate
            );
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for ModelInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInstance")
            .field("model", &self.model().name())
            .field("generation", &self.generation)
            .field("armatures", &self.armatures.len())
            .finish()
    }
}

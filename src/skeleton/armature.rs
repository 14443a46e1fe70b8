//! 骨架
//!
//! 管理骨骼 arena 与层次结构。骨骼按源数据顺序存放，父骨骼总在子骨骼之前。

use std::collections::HashMap;

use glam::DVec3;

use super::{Bone, BoneSource};
use crate::math::{Matrix4d, MutableMatrix4d};
use crate::space::{conversion_matrix_into, SpaceGraph};
use crate::{EngineError, Result};

/// 骨架内的坐标空间：世界空间或某个骨骼的空间
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoneSpace {
    World,
    Bone(usize),
}

/// 骨架
#[derive(Clone, Debug)]
pub struct Armature {
    name: String,
    /// 在模型内的下标
    index: usize,
    bones: Vec<Bone>,
    root_bones: Vec<usize>,
    bone_map: HashMap<String, usize>,
}

impl Armature {
    /// 由绑定数据构建
    ///
    /// 模型空间的骨骼位置被换算到父骨骼的静止空间中。
    pub fn from_source(name: impl Into<String>, index: usize, sources: &[BoneSource]) -> Result<Self> {
        let name = name.into();
        let mut bones: Vec<Bone> = Vec::with_capacity(sources.len());
        let mut root_bones = Vec::new();
        let mut bone_map = HashMap::with_capacity(sources.len());

        for (i, source) in sources.iter().enumerate() {
            let bone = match source.parent {
                Some(parent) => {
                    let parent_bone = bones.get(parent).ok_or_else(|| {
                        EngineError::InvalidSource(format!(
                            "bone '{}' ({}) in armature '{}' references parent {} which does not precede it",
                            source.name, i, name, parent
                        ))
                    })?;
                    let position = parent_bone.world_to_rest.transform(source.position);
                    let world_to_rest = parent_bone.world_to_rest;
                    Bone::new(i, source.name.clone(), Some(parent), &world_to_rest, position, source.rotation, source.length)?
                }
                None => {
                    root_bones.push(i);
                    Bone::new(i, source.name.clone(), None, &Matrix4d::IDENTITY, source.position, source.rotation, source.length)?
                }
            };
            if let Some(parent) = source.parent {
                bones[parent].children.push(i);
            }
            // 重名时保留第一个
            bone_map.entry(source.name.clone()).or_insert(i);
            bones.push(bone);
        }

        log::debug!("[骨架] '{}' 加载完成: {} 个骨骼, {} 个根骨骼", name, bones.len(), root_bones.len());

        let mut armature = Self { name, index, bones, root_bones, bone_map };
        let mut scratch = MutableMatrix4d::new();
        armature.update_transforms(&mut scratch)?;
        Ok(armature)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    pub fn bones_mut(&mut self) -> &mut [Bone] {
        &mut self.bones
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// 根骨骼下标
    #[inline]
    pub fn root_bones(&self) -> &[usize] {
        &self.root_bones
    }

    #[inline]
    pub fn get_bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    #[inline]
    pub fn get_bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    pub fn find_bone(&self, name: &str) -> Option<&Bone> {
        self.bone_map.get(name).map(|&i| &self.bones[i])
    }

    pub fn find_bone_index(&self, name: &str) -> Option<usize> {
        self.bone_map.get(name).copied()
    }

    /// 按名称查找，不存在时返回 NotFound
    pub fn bone(&self, name: &str) -> Result<&Bone> {
        self.find_bone(name).ok_or_else(|| EngineError::not_found("bone", name))
    }

    pub fn bone_mut(&mut self, name: &str) -> Result<&mut Bone> {
        match self.bone_map.get(name) {
            Some(&i) => Ok(&mut self.bones[i]),
            None => Err(EngineError::not_found("bone", name)),
        }
    }

    /// 所有骨骼回到静止姿态
    pub fn reset_pose(&mut self) {
        for bone in &mut self.bones {
            bone.reset_pose();
        }
    }

    /// 更新所有骨骼矩阵
    ///
    /// 按下标顺序遍历即自上而下：构建时保证父骨骼下标小于子骨骼，
    /// 父骨骼的 matrix 总在子骨骼之前更新。除 scratch 外不做堆分配。
    pub fn update_transforms(&mut self, scratch: &mut MutableMatrix4d) -> Result<()> {
        for index in 0..self.bones.len() {
            self.update_bone(index, scratch)?;
        }
        Ok(())
    }

    fn update_bone(&mut self, index: usize, scratch: &mut MutableMatrix4d) -> Result<()> {
        self.bones[index].update_local()?;
        conversion_matrix_into(self, BoneSpace::Bone(index), BoneSpace::World, scratch)?;
        let bone = &mut self.bones[index];
        scratch.mul_assign(&bone.world_to_rest);
        bone.final_matrix = scratch.to_immutable();
        Ok(())
    }

    /// 当前姿态下骨骼空间到世界空间
    pub fn bone_world_matrix(&self, index: usize) -> Result<Matrix4d> {
        if index >= self.bones.len() {
            return Err(EngineError::not_found("bone", index.to_string()));
        }
        let mut scratch = MutableMatrix4d::new();
        conversion_matrix_into(self, BoneSpace::Bone(index), BoneSpace::World, &mut scratch)?;
        Ok(scratch.to_immutable())
    }

    /// 当前姿态下骨骼头部的世界位置
    pub fn bone_world_position(&self, index: usize) -> Result<DVec3> {
        Ok(self.bone_world_matrix(index)?.transform(DVec3::ZERO))
    }
}

impl SpaceGraph for Armature {
    type Id = BoneSpace;

    fn parent_of(&self, id: BoneSpace) -> Option<BoneSpace> {
        match id {
            BoneSpace::World => None,
            BoneSpace::Bone(i) => self.bones.get(i).map(|bone| match bone.parent {
                Some(parent) => BoneSpace::Bone(parent),
                None => BoneSpace::World,
            }),
        }
    }

    fn matrix_of(&self, id: BoneSpace) -> &Matrix4d {
        match id {
            BoneSpace::Bone(i) => self.bones.get(i).map_or(&Matrix4d::IDENTITY, |b| &b.matrix),
            BoneSpace::World => &Matrix4d::IDENTITY,
        }
    }

    fn inverse_matrix_of(&self, id: BoneSpace) -> &Matrix4d {
        match id {
            BoneSpace::Bone(i) => self.bones.get(i).map_or(&Matrix4d::IDENTITY, |b| &b.inverse_matrix),
            BoneSpace::World => &Matrix4d::IDENTITY,
        }
    }
}

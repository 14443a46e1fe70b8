//! 顶点蒙皮计算
//!
//! 线性混合蒙皮：每个顶点的静止位置经各影响骨骼的 final_matrix 变换后按权重
//! 加权平均（运行时归一化，权重无需预先归一）。蒙皮后按三角面重算平面法线。

mod skinning;

pub use skinning::{compute_skinning, recompute_face_normals, SkinningStats};

use crate::math::{Matrix4d, MutableMatrix4d};
use crate::skeleton::Armature;
use crate::Result;

/// 骨骼全局下标（骨架下标 + 骨架内骨骼下标）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneIndex {
    pub armature: usize,
    pub bone: usize,
}

impl BoneIndex {
    pub const fn new(armature: usize, bone: usize) -> Self {
        Self { armature, bone }
    }
}

/// 顶点的单个骨骼权重（未归一化）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexWeight {
    pub bone: BoneIndex,
    pub weight: f64,
}

impl VertexWeight {
    pub const fn new(armature: usize, bone: usize, weight: f64) -> Self {
        Self { bone: BoneIndex::new(armature, bone), weight }
    }
}

/// 蒙皮输入数据
pub struct SkinningInput<'a> {
    /// 静止姿态顶点位置
    pub rest_positions: &'a [glam::DVec3],
    /// 每顶点的权重列表，缺失视为无权重
    pub weights: &'a [Vec<VertexWeight>],
    /// 骨骼蒙皮矩阵
    pub matrices: &'a BoneMatrices,
}

/// 每个骨架的 final_matrix 快照
///
/// 姿态更新之后收集一次，蒙皮阶段只读，可安全跨线程共享。
#[derive(Clone, Debug, Default)]
pub struct BoneMatrices {
    armatures: Vec<Vec<Matrix4d>>,
}

impl BoneMatrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_armatures(armatures: &[Armature]) -> Self {
        let mut matrices = Self::new();
        matrices.gather(armatures);
        matrices
    }

    /// 重新收集（复用已有内存）
    pub fn gather(&mut self, armatures: &[Armature]) {
        self.armatures.resize_with(armatures.len(), Vec::new);
        for (table, armature) in self.armatures.iter_mut().zip(armatures) {
            table.clear();
            table.extend(armature.bones().iter().map(|b| *b.final_matrix()));
        }
    }

    /// 先更新姿态再收集
    pub fn pose_and_gather(&mut self, armatures: &mut [Armature], scratch: &mut MutableMatrix4d) -> Result<()> {
        for armature in armatures.iter_mut() {
            armature.update_transforms(scratch)?;
        }
        self.gather(armatures);
        Ok(())
    }

    #[inline]
    pub fn get(&self, index: BoneIndex) -> Option<&Matrix4d> {
        self.armatures.get(index.armature)?.get(index.bone)
    }

    #[inline]
    pub fn armature_count(&self) -> usize {
        self.armatures.len()
    }
}

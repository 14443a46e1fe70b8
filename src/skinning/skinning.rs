//! 顶点蒙皮计算

use glam::DVec3;
use rayon::prelude::*;

use super::{SkinningInput, VertexWeight};
use crate::config::EngineConfig;
use crate::model::Face;

/// 单次蒙皮的统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkinningStats {
    /// 实际被写入的顶点数
    pub skinned: usize,
    /// 总权重为零、保持不变的顶点数
    pub untouched: usize,
    /// 引用了不存在骨骼而被跳过的权重数
    pub skipped_weights: usize,
}

impl std::ops::Add for SkinningStats {
    type Output = SkinningStats;

    fn add(self, rhs: SkinningStats) -> SkinningStats {
        SkinningStats {
            skinned: self.skinned + rhs.skinned,
            untouched: self.untouched + rhs.untouched,
            skipped_weights: self.skipped_weights + rhs.skipped_weights,
        }
    }
}

/// 计算蒙皮
///
/// `out` 与静止位置等长。总权重为零的顶点不会被写入（保持调用方已有的值，
/// 通常就是静止位置）。顶点数达到 `parallel_skinning_threshold` 时用 rayon 并行。
pub fn compute_skinning(input: &SkinningInput, config: &EngineConfig, out: &mut [DVec3]) -> SkinningStats {
    let count = input.rest_positions.len().min(out.len());
    let out = &mut out[..count];

    let stats = if count >= config.parallel_skinning_threshold {
        out.par_iter_mut()
            .enumerate()
            .map(|(i, slot)| skin_into(input, config, i, slot))
            .reduce(SkinningStats::default, |a, b| a + b)
    } else {
        out.iter_mut()
            .enumerate()
            .map(|(i, slot)| skin_into(input, config, i, slot))
            .fold(SkinningStats::default(), |a, b| a + b)
    };

    if stats.skipped_weights > 0 {
        log::warn!("[蒙皮] {} 个权重引用了不存在的骨骼，已跳过", stats.skipped_weights);
    }
    stats
}

fn skin_into(input: &SkinningInput, config: &EngineConfig, index: usize, slot: &mut DVec3) -> SkinningStats {
    let mut stats = SkinningStats::default();
    let weights = match input.weights.get(index) {
        Some(w) if !w.is_empty() => w,
        _ => {
            stats.untouched = 1;
            return stats;
        }
    };

    let (result, skipped) = match config.max_bone_influences {
        Some(n) if weights.len() > n => {
            let mut heaviest = weights.clone();
            heaviest.sort_by(|a, b| b.weight.total_cmp(&a.weight));
            heaviest.truncate(n);
            compute_single_vertex(input, index, &heaviest)
        }
        _ => compute_single_vertex(input, index, weights),
    };

    stats.skipped_weights = skipped;
    match result {
        Some(position) => {
            *slot = position;
            stats.skinned = 1;
        }
        None => stats.untouched = 1,
    }
    stats
}

/// 计算单个顶点的蒙皮，返回 (位置, 被跳过的权重数)
fn compute_single_vertex(input: &SkinningInput, index: usize, weights: &[VertexWeight]) -> (Option<DVec3>, usize) {
    let rest = input.rest_positions[index];
    let mut sum = DVec3::ZERO;
    let mut weight_sum = 0.0;
    let mut skipped = 0;

    for w in weights {
        let Some(matrix) = input.matrices.get(w.bone) else {
            skipped += 1;
            continue;
        };
        sum += matrix.transform(rest) * w.weight;
        weight_sum += w.weight;
    }

    if weight_sum == 0.0 {
        (None, skipped)
    } else {
        (Some(sum / weight_sum), skipped)
    }
}

/// 按三角面重算平面法线
///
/// 只处理恰好 3 个顶点且带法线下标的面：
/// `normal = normalize((c - b) × (a - b))`，写入该面的三个法线槽。
/// 退化三角形写入零向量。返回退化面数。
pub fn recompute_face_normals(positions: &[DVec3], faces: &[Face], normals: &mut [DVec3]) -> usize {
    let mut degenerate = 0;
    for face in faces {
        let Some(normal_indices) = face.normals.as_deref() else {
            continue;
        };
        if face.vertices.len() != 3 || normal_indices.len() != 3 {
            continue;
        }
        let (Some(&a), Some(&b), Some(&c)) = (
            positions.get(face.vertices[0]),
            positions.get(face.vertices[1]),
            positions.get(face.vertices[2]),
        ) else {
            continue;
        };

        let normal = (c - b).cross(a - b).normalize_or_zero();
        if normal == DVec3::ZERO {
            degenerate += 1;
        }
        for &n in normal_indices {
            if let Some(slot) = normals.get_mut(n) {
                *slot = normal;
            }
        }
    }
    degenerate
}

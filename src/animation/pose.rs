//! 把 Act 动作采样为骨骼姿态

use glam::DVec3;

use super::act::{Act, ActAction};
use crate::math::Quaternion;
use crate::skeleton::{Armature, PoseTransform};
use crate::{EngineError, Result};

/// 通道名
pub const CHANNEL_POS_X: &str = "pos.x";
pub const CHANNEL_POS_Y: &str = "pos.y";
pub const CHANNEL_POS_Z: &str = "pos.z";
pub const CHANNEL_ROT_W: &str = "rot.w";
pub const CHANNEL_ROT_X: &str = "rot.x";
pub const CHANNEL_ROT_Y: &str = "rot.y";
pub const CHANNEL_ROT_Z: &str = "rot.z";

impl ActAction {
    fn channel_value_or(&self, name: &str, frame: f64, default: f64) -> Result<f64> {
        match self.channel(name) {
            Some(channel) if !channel.is_empty() => channel.value(frame),
            _ => Ok(default),
        }
    }

    /// 采样局部姿态
    ///
    /// 缺失的平移通道取 0，缺失的旋转通道取单位四元数的分量；旋转归一化后返回。
    pub fn sample_pose(&self, frame: f64) -> Result<PoseTransform> {
        let translation = DVec3::new(
            self.channel_value_or(CHANNEL_POS_X, frame, 0.0)?,
            self.channel_value_or(CHANNEL_POS_Y, frame, 0.0)?,
            self.channel_value_or(CHANNEL_POS_Z, frame, 0.0)?,
        );
        let rotation = Quaternion::new(
            self.channel_value_or(CHANNEL_ROT_X, frame, 0.0)?,
            self.channel_value_or(CHANNEL_ROT_Y, frame, 0.0)?,
            self.channel_value_or(CHANNEL_ROT_Z, frame, 0.0)?,
            self.channel_value_or(CHANNEL_ROT_W, frame, 1.0)?,
        )
        .normalize()?;
        Ok(PoseTransform::new(translation, rotation))
    }
}

/// 把动作应用到骨架：每个含该动作的对象按名称驱动同名骨骼
///
/// 返回被设置姿态的骨骼数。没有任何对象包含该动作时返回 NotFound。
pub fn apply_action(act: &Act, action: &str, armature: &mut Armature, frame: f64) -> Result<usize> {
    if !act.has_action(action) {
        return Err(EngineError::not_found("action", action));
    }
    apply_to_armature(act, action, armature, frame)
}

/// 同 [`apply_action`]，作用于多个骨架
pub fn apply_action_to_all(act: &Act, action: &str, armatures: &mut [Armature], frame: f64) -> Result<usize> {
    if !act.has_action(action) {
        return Err(EngineError::not_found("action", action));
    }
    let mut posed = 0;
    for armature in armatures.iter_mut() {
        posed += apply_to_armature(act, action, armature, frame)?;
    }
    Ok(posed)
}

fn apply_to_armature(act: &Act, action: &str, armature: &mut Armature, frame: f64) -> Result<usize> {
    let mut posed = 0;
    for object in act.objects() {
        let Some(sampled) = object.action(action) else {
            continue;
        };
        let Some(index) = armature.find_bone_index(object.name()) else {
            log::debug!("[动画] 骨架 '{}' 中没有骨骼 '{}'，跳过", armature.name(), object.name());
            continue;
        };
        let pose = sampled.sample_pose(frame)?;
        if let Some(bone) = armature.get_bone_mut(index) {
            bone.set_pose(pose);
            posed += 1;
        }
    }
    Ok(posed)
}

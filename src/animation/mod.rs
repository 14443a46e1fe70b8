//! 动画系统
//!
//! Act 关键帧动作：按对象（骨骼名）组织的标量通道，线性插值，
//! 采样结果作为骨骼的局部姿态。

mod act;
mod act_reader;
mod pose;

pub use act::{Act, ActAction, ActChannel, ActObject};
pub use act_reader::{load_act, parse_act, read_act, read_act_into};
pub use pose::{
    apply_action, apply_action_to_all, CHANNEL_POS_X, CHANNEL_POS_Y, CHANNEL_POS_Z, CHANNEL_ROT_W, CHANNEL_ROT_X,
    CHANNEL_ROT_Y, CHANNEL_ROT_Z,
};

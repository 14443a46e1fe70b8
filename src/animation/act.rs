//! Act 动作数据
//!
//! 层次：Act → ActObject（通常对应骨骼名）→ ActAction（动作名）→ ActChannel（单个标量通道）

use std::collections::HashMap;

use crate::{EngineError, Result};

/// 单个标量通道的关键帧
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActChannel {
    name: String,
    /// (帧, 值)，按帧升序且帧唯一
    samples: Vec<(f64, f64)>,
}

impl ActChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), samples: Vec::new() }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 插入关键帧，同一帧已存在时覆盖
    pub fn add_sample(&mut self, frame: f64, value: f64) {
        match self.samples.binary_search_by(|(f, _)| f.total_cmp(&frame)) {
            Ok(i) => self.samples[i].1 = value,
            Err(i) => self.samples.insert(i, (frame, value)),
        }
    }

    /// 求值
    ///
    /// 恰在关键帧上取该值，两帧之间线性插值，范围外取最近端点的值。
    pub fn value(&self, frame: f64) -> Result<f64> {
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(EngineError::not_found(
                    "channel sample",
                    format!("frame {} of empty channel '{}'", frame, self.name),
                ))
            }
        };

        let next = self.samples.partition_point(|(f, _)| *f < frame);
        if next == 0 {
            return Ok(first.1);
        }
        if next == self.samples.len() {
            return Ok(last.1);
        }
        let (next_frame, next_value) = self.samples[next];
        if next_frame == frame {
            return Ok(next_value);
        }
        let (prev_frame, prev_value) = self.samples[next - 1];
        let fraction = (frame - prev_frame) / (next_frame - prev_frame);
        Ok(prev_value + (next_value - prev_value) * fraction)
    }

    /// 第一个和最后一个关键帧
    pub fn frame_range(&self) -> Option<(f64, f64)> {
        Some((self.samples.first()?.0, self.samples.last()?.0))
    }
}

/// 动作：一组通道
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActAction {
    name: String,
    channels: Vec<ActChannel>,
    channel_map: HashMap<String, usize>,
}

impl ActAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn channels(&self) -> &[ActChannel] {
        &self.channels
    }

    pub fn channel(&self, name: &str) -> Option<&ActChannel> {
        self.channel_map.get(name).map(|&i| &self.channels[i])
    }

    /// 添加通道，重名时报错
    pub fn add_channel(&mut self, channel: ActChannel) -> Result<&mut ActChannel> {
        if self.channel_map.contains_key(channel.name()) {
            return Err(EngineError::InvalidSource(format!(
                "action '{}' already has a channel named '{}'",
                self.name,
                channel.name()
            )));
        }
        let index = self.channels.len();
        self.channel_map.insert(channel.name().to_string(), index);
        self.channels.push(channel);
        Ok(&mut self.channels[index])
    }

    pub(crate) fn channel_at_mut(&mut self, index: usize) -> Option<&mut ActChannel> {
        self.channels.get_mut(index)
    }

    /// 所有通道覆盖的帧范围
    pub fn frame_range(&self) -> Option<(f64, f64)> {
        self.channels
            .iter()
            .filter_map(ActChannel::frame_range)
            .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
    }
}

/// 对象：一组动作
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActObject {
    name: String,
    actions: Vec<ActAction>,
    action_map: HashMap<String, usize>,
}

impl ActObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn actions(&self) -> &[ActAction] {
        &self.actions
    }

    pub fn action(&self, name: &str) -> Option<&ActAction> {
        self.action_map.get(name).map(|&i| &self.actions[i])
    }

    /// 添加动作，重名时报错
    pub fn add_action(&mut self, action: ActAction) -> Result<&mut ActAction> {
        if self.action_map.contains_key(action.name()) {
            return Err(EngineError::InvalidSource(format!(
                "object '{}' already has an action named '{}'",
                self.name,
                action.name()
            )));
        }
        let index = self.actions.len();
        self.action_map.insert(action.name().to_string(), index);
        self.actions.push(action);
        Ok(&mut self.actions[index])
    }

    pub(crate) fn action_at_mut(&mut self, index: usize) -> Option<&mut ActAction> {
        self.actions.get_mut(index)
    }

    /// 合并另一对象的动作，重名动作报错
    pub fn merge(&mut self, other: &ActObject) -> Result<()> {
        if let Some(duplicate) = other.actions.iter().find(|a| self.action_map.contains_key(a.name())) {
            return Err(EngineError::InvalidSource(format!(
                "object '{}' already has an action named '{}'",
                self.name,
                duplicate.name()
            )));
        }
        for action in &other.actions {
            self.add_action(action.clone())?;
        }
        Ok(())
    }
}

/// 动作集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Act {
    objects: Vec<ActObject>,
    object_map: HashMap<String, usize>,
}

impl Act {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn objects(&self) -> &[ActObject] {
        &self.objects
    }

    #[inline]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object(&self, name: &str) -> Option<&ActObject> {
        self.object_map.get(name).map(|&i| &self.objects[i])
    }

    /// 取得同名对象，不存在时创建
    pub fn object_entry(&mut self, name: &str) -> &mut ActObject {
        let index = match self.object_map.get(name) {
            Some(&i) => i,
            None => {
                let i = self.objects.len();
                self.objects.push(ActObject::new(name));
                self.object_map.insert(name.to_string(), i);
                i
            }
        };
        &mut self.objects[index]
    }

    pub(crate) fn object_index(&mut self, name: &str) -> usize {
        self.object_entry(name);
        self.object_map[name]
    }

    pub(crate) fn object_at_mut(&mut self, index: usize) -> Option<&mut ActObject> {
        self.objects.get_mut(index)
    }

    /// 是否有任何对象包含该动作
    pub fn has_action(&self, action: &str) -> bool {
        self.objects.iter().any(|o| o.action(action).is_some())
    }

    /// 合并（失败时不修改自身）
    pub fn merge(&mut self, other: &Act) -> Result<()> {
        let mut merged = self.clone();
        for object in &other.objects {
            merged.object_entry(object.name()).merge(object)?;
        }
        *self = merged;
        Ok(())
    }
}

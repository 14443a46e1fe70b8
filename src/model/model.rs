//! 共享模型与实例注册表

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::ModelSource;
use crate::Result;

struct ModelState {
    source: Arc<ModelSource>,
    /// 每次重载递增，实例据此判断是否需要重建
    generation: u64,
}

/// 共享模型
///
/// 源数据只读，重载时整体替换。实例通过 [`InstanceRegistration`] 登记，
/// guard 析构时自动注销。
pub struct Model {
    name: String,
    state: RwLock<ModelState>,
    instances: Mutex<BTreeSet<u64>>,
    next_instance_id: AtomicU64,
}

impl Model {
    pub fn new(name: impl Into<String>, source: ModelSource) -> Result<Arc<Self>> {
        source.validate()?;
        let name = name.into();
        log::debug!(
            "[模型] '{}' 创建: {} 个顶点, {} 个骨架",
            name,
            source.mesh.vertex_count(),
            source.armatures.len()
        );
        Ok(Arc::new(Self {
            name,
            state: RwLock::new(ModelState { source: Arc::new(source), generation: 0 }),
            instances: Mutex::new(BTreeSet::new()),
            next_instance_id: AtomicU64::new(0),
        }))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 当前源数据
    pub fn source(&self) -> Arc<ModelSource> {
        self.snapshot().1
    }

    /// 当前代数
    pub fn generation(&self) -> u64 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).generation
    }

    /// 同时读取代数与源数据
    pub fn snapshot(&self) -> (u64, Arc<ModelSource>) {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        (state.generation, Arc::clone(&state.source))
    }

    /// 已登记的实例数
    pub fn instance_count(&self) -> usize {
        self.instances.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 替换源数据
    ///
    /// 校验失败时保留旧数据。返回需要重新验证的实例数（实例在下次更新时自行重建）。
    pub fn reload(&self, source: ModelSource) -> Result<usize> {
        source.validate()?;
        let generation = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.source = Arc::new(source);
            state.generation += 1;
            state.generation
        };
        let count = self.instance_count();
        log::debug!("[模型] '{}' 重载: 第 {} 代, {} 个实例待更新", self.name, generation, count);
        Ok(count)
    }

    /// 登记实例
    pub fn register(self: &Arc<Self>) -> InstanceRegistration {
        let id = self.next_instance_id.fetch_add(1, Ordering::Relaxed);
        self.instances.lock().unwrap_or_else(|e| e.into_inner()).insert(id);
        InstanceRegistration { model: Arc::clone(self), id }
    }

    fn deregister(&self, id: u64) {
        self.instances.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("generation", &self.generation())
            .field("instances", &self.instance_count())
            .finish()
    }
}

/// 实例登记 guard，析构时注销
pub struct InstanceRegistration {
    model: Arc<Model>,
    id: u64,
}

impl InstanceRegistration {
    #[inline]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for InstanceRegistration {
    fn drop(&mut self) {
        self.model.deregister(self.id);
    }
}

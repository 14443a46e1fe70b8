//! 模型库：统一重载所有存活的模型

use std::sync::{Arc, Weak};

use super::{Model, ModelSource};
use crate::Result;

/// 非拥有的模型列表
///
/// 只保存弱引用，模型被释放后在下一次重载时移除。
#[derive(Default)]
pub struct ModelLibrary {
    models: Vec<Weak<Model>>,
}

impl ModelLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: &Arc<Model>) {
        self.models.push(Arc::downgrade(model));
    }

    /// 存活模型数
    pub fn len(&self) -> usize {
        self.models.iter().filter(|m| m.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 存活模型
    pub fn models(&self) -> Vec<Arc<Model>> {
        self.models.iter().filter_map(Weak::upgrade).collect()
    }

    /// 重新加载所有存活模型
    ///
    /// `loader` 按模型名称返回新的源数据。加载或校验失败的模型保留旧数据并记录警告。
    /// 返回成功重载的模型数。
    pub fn reload_all<F>(&mut self, mut loader: F) -> usize
    where
        F: FnMut(&str) -> Result<ModelSource>,
    {
        let mut reloaded = 0;
        self.models.retain(|weak| {
            let Some(model) = weak.upgrade() else {
                return false;
            };
            match loader(model.name()).and_then(|source| model.reload(source)) {
                Ok(_) => reloaded += 1,
                Err(e) => log::warn!("[模型] '{}' 重载失败，保留旧数据: {}", model.name(), e),
            }
            true
        });
        log::debug!("[模型] 重载完成: {}/{} 个模型", reloaded, self.models.len());
        reloaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_data::triangle_source;
    use crate::EngineError;

    #[test]
    fn test_prunes_dropped_models() {
        let _ = env_logger::builder().is_test(true).try_init();

        let kept = Model::new("kept", triangle_source()).unwrap();
        let dropped = Model::new("dropped", triangle_source()).unwrap();
        let mut library = ModelLibrary::new();
        library.register(&kept);
        library.register(&dropped);
        assert_eq!(library.len(), 2);

        drop(dropped);
        assert_eq!(library.len(), 1);

        let mut seen = Vec::new();
        let count = library.reload_all(|name| {
            seen.push(name.to_string());
            Ok(triangle_source())
        });
        assert_eq!(count, 1);
        assert_eq!(seen, vec!["kept".to_string()]);
        assert_eq!(kept.generation(), 1);
    }

    #[test]
    fn test_loader_failure_keeps_source() {
        let model = Model::new("tri", triangle_source()).unwrap();
        let mut library = ModelLibrary::new();
        library.register(&model);

        let count = library.reload_all(|name| Err(EngineError::not_found("model file", name)));
        assert_eq!(count, 0);
        assert_eq!(model.generation(), 0);
        assert_eq!(library.len(), 1);
    }
}

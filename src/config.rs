//! 引擎配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 引擎配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // ========== 蒙皮 ==========
    /// 每顶点最多参与的骨骼数，默认 None（全部权重参与）
    /// Some(n) 时只保留权重最大的 n 个
    pub max_bone_influences: Option<usize>,
    /// 达到此顶点数时蒙皮改用 rayon 并行，默认 4096
    pub parallel_skinning_threshold: usize,
    /// 蒙皮后是否重算三角面法线，默认 true
    pub recompute_normals: bool,

    // ========== 调试 ==========
    /// 是否输出每帧调试日志，默认 false
    pub debug_log: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_bone_influences: None,
            // 小模型串行更快，线程调度开销大于计算本身
            parallel_skinning_threshold: 4096,
            recompute_normals: true,

            debug_log: false,
        }
    }
}

/// 全局配置实例
static ENGINE_CONFIG: Lazy<RwLock<EngineConfig>> = Lazy::new(|| {
    RwLock::new(EngineConfig::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> EngineConfig {
    ENGINE_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: EngineConfig) {
    *ENGINE_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *ENGINE_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = EngineConfig::default();
}

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;
use webfarm_core::config::{DebugConfig, WebFarmConfig};

/// 运行时可切换的同步开关
#[derive(Debug)]
pub struct SynchronizationSettings {
    enabled: AtomicBool,
    synchronize_avatars: AtomicBool,
    synchronize_cache: AtomicBool,
}

impl SynchronizationSettings {
    pub fn new(enabled: bool, synchronize_avatars: bool, synchronize_cache: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            synchronize_avatars: AtomicBool::new(synchronize_avatars),
            synchronize_cache: AtomicBool::new(synchronize_cache),
        }
    }

    pub fn from_config(config: &WebFarmConfig) -> Self {
        Self::new(
            config.enabled,
            config.synchronize_avatars,
            config.synchronize_cache,
        )
    }

    /// 本进程是否参与Web农场同步
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn synchronize_avatars(&self) -> bool {
        self.synchronize_avatars.load(Ordering::Relaxed)
    }

    pub fn set_synchronize_avatars(&self, enabled: bool) {
        self.synchronize_avatars.store(enabled, Ordering::Relaxed);
    }

    pub fn synchronize_cache(&self) -> bool {
        self.synchronize_cache.load(Ordering::Relaxed)
    }

    pub fn set_synchronize_cache(&self, enabled: bool) {
        self.synchronize_cache.store(enabled, Ordering::Relaxed);
    }
}

impl Default for SynchronizationSettings {
    fn default() -> Self {
        Self::new(true, true, true)
    }
}

/// 本地调试开关
///
/// 重置时恢复为配置中的默认值。
#[derive(Debug)]
pub struct DebugSettings {
    defaults: DebugConfig,
    debug_sql: AtomicBool,
    debug_cache: AtomicBool,
    debug_requests: AtomicBool,
}

impl DebugSettings {
    pub fn new(defaults: DebugConfig) -> Self {
        Self {
            debug_sql: AtomicBool::new(defaults.debug_sql),
            debug_cache: AtomicBool::new(defaults.debug_cache),
            debug_requests: AtomicBool::new(defaults.debug_requests),
            defaults,
        }
    }

    pub fn set_debug_sql(&self, enabled: bool) {
        self.debug_sql.store(enabled, Ordering::Relaxed);
    }

    pub fn set_debug_cache(&self, enabled: bool) {
        self.debug_cache.store(enabled, Ordering::Relaxed);
    }

    pub fn set_debug_requests(&self, enabled: bool) {
        self.debug_requests.store(enabled, Ordering::Relaxed);
    }

    /// 当前的调试开关
    pub fn current(&self) -> DebugConfig {
        DebugConfig {
            debug_sql: self.debug_sql.load(Ordering::Relaxed),
            debug_cache: self.debug_cache.load(Ordering::Relaxed),
            debug_requests: self.debug_requests.load(Ordering::Relaxed),
        }
    }

    /// 恢复为默认值
    pub fn reset(&self) {
        self.set_debug_sql(self.defaults.debug_sql);
        self.set_debug_cache(self.defaults.debug_cache);
        self.set_debug_requests(self.defaults.debug_requests);
        info!("调试设置已恢复为默认值");
    }
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self::new(DebugConfig::default())
    }
}

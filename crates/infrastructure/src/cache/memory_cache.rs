//! 进程内缓存，支持依赖键失效

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;
use webfarm_core::traits::CacheStore;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    dependencies: Vec<String>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
}

/// 内存缓存
///
/// 缓存项可以声明依赖键，触碰依赖键会移除所有依赖它的缓存项。
/// 键名不区分大小写。
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    state: RwLock<CacheState>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&self, key: &str, value: impl Into<String>, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = CacheEntry {
            value: value.into(),
            dependencies: dependencies
                .into_iter()
                .map(|d| normalize(d.as_ref()))
                .collect(),
        };
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.entries.insert(normalize(key), entry);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.entries.get(&normalize(key)).map(|e| e.value.clone())
    }

    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn touch_key(&self, key: &str) {
        let key = normalize(key);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let before = state.entries.len();
        state
            .entries
            .retain(|name, entry| *name != key && !entry.dependencies.contains(&key));
        let removed = before - state.entries.len();
        debug!("触碰缓存键 {}，移除 {} 个缓存项", key, removed);
    }

    fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let removed = state.entries.len();
        state.entries.clear();
        debug!("清空缓存，移除 {} 个缓存项", removed);
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

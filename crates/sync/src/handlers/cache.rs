use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use webfarm_core::{
    models::{WebFarmTask, WebFarmTaskType},
    traits::{CacheStore, WebFarmTaskHandler},
    SchedulerError, SchedulerResult,
};

/// TOUCHCACHEKEYS 参数：每个参数是一个缓存依赖键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchCacheKeysPayload {
    pub keys: Vec<String>,
}

impl TouchCacheKeysPayload {
    pub fn from_task(task: &WebFarmTask) -> SchedulerResult<Self> {
        let keys: Vec<String> = task
            .parameters
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        if keys.is_empty() {
            return Err(SchedulerError::InvalidTaskArguments {
                task_type: task.task_type.to_string(),
                expected: 1,
                actual: 0,
            });
        }
        Ok(Self { keys })
    }

    pub fn into_task(self, target: impl Into<String>) -> WebFarmTask {
        WebFarmTask::new(WebFarmTaskType::TouchCacheKeys, target).with_parameters(self.keys)
    }
}

pub struct TouchCacheKeysHandler {
    cache: Arc<dyn CacheStore>,
}

impl TouchCacheKeysHandler {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl WebFarmTaskHandler for TouchCacheKeysHandler {
    async fn execute(&self, task: &WebFarmTask) -> SchedulerResult<()> {
        let payload = TouchCacheKeysPayload::from_task(task)?;
        for key in &payload.keys {
            self.cache.touch_key(key);
        }
        debug!("触碰了 {} 个缓存键", payload.keys.len());
        Ok(())
    }
}

pub struct ClearCacheHandler {
    cache: Arc<dyn CacheStore>,
}

impl ClearCacheHandler {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl WebFarmTaskHandler for ClearCacheHandler {
    async fn execute(&self, task: &WebFarmTask) -> SchedulerResult<()> {
        task.expect_parameter_count(0)?;
        self.cache.clear();
        Ok(())
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use webfarm_core::{traits::ScheduledTaskHandler, SchedulerError, SchedulerResult};

/// 定时任务处理器注册表
///
/// 启动时构建，之后只读。任务类型名称不区分大小写，每个类型只能注册一个处理器。
#[derive(Default)]
pub struct ScheduledTaskRegistry {
    handlers: HashMap<String, Arc<dyn ScheduledTaskHandler>>,
}

impl ScheduledTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        task_type: &str,
        handler: Arc<dyn ScheduledTaskHandler>,
    ) -> SchedulerResult<()> {
        let key = Self::key(task_type);
        if key.is_empty() {
            return Err(SchedulerError::InvalidTaskParams(
                "任务类型不能为空".to_string(),
            ));
        }
        if self.handlers.contains_key(&key) {
            return Err(SchedulerError::TaskTypeAlreadyRegistered {
                task_type: task_type.to_string(),
            });
        }
        debug!("注册定时任务处理器: {}", task_type);
        self.handlers.insert(key, handler);
        Ok(())
    }

    pub fn resolve(&self, task_type: &str) -> Option<Arc<dyn ScheduledTaskHandler>> {
        self.handlers.get(&Self::key(task_type)).cloned()
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.handlers.contains_key(&Self::key(task_type))
    }

    /// 已注册的任务类型，按名称排序
    pub fn task_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn key(task_type: &str) -> String {
        task_type.trim().to_ascii_lowercase()
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;
use webfarm_core::{
    models::{WebFarmTask, WebFarmTaskType},
    traits::WebFarmTaskHandler,
    SchedulerError, SchedulerResult,
};

/// 任务能否执行的判定，在创建和执行两端都会调用
pub type TaskCondition = Arc<dyn Fn(&WebFarmTask) -> bool + Send + Sync>;

/// 一个Web农场任务类型的注册信息
#[derive(Clone)]
pub struct TaskTypeRegistration {
    pub task_type: WebFarmTaskType,
    pub handler: Arc<dyn WebFarmTaskHandler>,
    pub condition: Option<TaskCondition>,
    /// 仅内存任务在进程重启后无需执行
    pub is_memory_task: bool,
}

impl TaskTypeRegistration {
    pub fn can_run(&self, task: &WebFarmTask) -> bool {
        self.condition.as_ref().is_none_or(|condition| condition(task))
    }
}

impl fmt::Debug for TaskTypeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskTypeRegistration")
            .field("task_type", &self.task_type)
            .field("has_condition", &self.condition.is_some())
            .field("is_memory_task", &self.is_memory_task)
            .finish()
    }
}

/// Web农场任务注册表
///
/// 启动时构建完成后以 `Arc` 共享，之后只读。每个任务类型至多一个处理器。
#[derive(Default)]
pub struct WebFarmTaskRegistry {
    registrations: HashMap<WebFarmTaskType, TaskTypeRegistration>,
}

impl WebFarmTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_task(
        &mut self,
        task_type: WebFarmTaskType,
        handler: Arc<dyn WebFarmTaskHandler>,
        condition: Option<TaskCondition>,
        is_memory_task: bool,
    ) -> SchedulerResult<()> {
        if self.registrations.contains_key(&task_type) {
            return Err(SchedulerError::TaskTypeAlreadyRegistered {
                task_type: task_type.to_string(),
            });
        }

        debug!(
            "注册Web农场任务类型: {} (仅内存: {})",
            task_type, is_memory_task
        );
        self.registrations.insert(
            task_type.clone(),
            TaskTypeRegistration {
                task_type,
                handler,
                condition,
                is_memory_task,
            },
        );
        Ok(())
    }

    pub fn resolve(&self, task_type: &WebFarmTaskType) -> Option<&TaskTypeRegistration> {
        self.registrations.get(task_type)
    }

    /// 已注册的任务类型名称，按名称排序
    pub fn task_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .registrations
            .keys()
            .map(|t| t.as_str().to_string())
            .collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl WebFarmTaskHandler for Noop {
        async fn execute(&self, _task: &WebFarmTask) -> SchedulerResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = WebFarmTaskRegistry::new();
        registry
            .register_task(WebFarmTaskType::ClearCache, Arc::new(Noop), None, true)
            .unwrap();

        let registration = registry.resolve(&WebFarmTaskType::ClearCache).unwrap();
        assert!(registration.is_memory_task);
        assert!(registry.resolve(&WebFarmTaskType::UpdateAvatar).is_none());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = WebFarmTaskRegistry::new();
        registry
            .register_task(WebFarmTaskType::custom("reindex"), Arc::new(Noop), None, false)
            .unwrap();
        let err = registry
            .register_task(WebFarmTaskType::custom("REINDEX"), Arc::new(Noop), None, false)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::TaskTypeAlreadyRegistered { .. }));
    }

    #[test]
    fn test_condition_is_evaluated() {
        let mut registry = WebFarmTaskRegistry::new();
        let condition: TaskCondition = Arc::new(|task: &WebFarmTask| !task.parameters.is_empty());
        registry
            .register_task(
                WebFarmTaskType::TouchCacheKeys,
                Arc::new(Noop),
                Some(condition),
                true,
            )
            .unwrap();

        let registration = registry.resolve(&WebFarmTaskType::TouchCacheKeys).unwrap();
        let empty = WebFarmTask::new(WebFarmTaskType::TouchCacheKeys, "node-a");
        assert!(!registration.can_run(&empty));
        assert!(registration.can_run(&empty.clone().with_parameters(["key"])));
    }
}

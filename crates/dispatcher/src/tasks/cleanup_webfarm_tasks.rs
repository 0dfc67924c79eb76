use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::info;
use webfarm_core::{
    models::{TaskOutcome, TaskResult},
    traits::{ScheduledTaskContext, ScheduledTaskHandler, WebFarmTransport},
    SchedulerResult,
};

/// 清理超过保留期的Web农场任务
pub struct CleanupWebFarmTasksTask {
    transport: Arc<dyn WebFarmTransport>,
    retention: Duration,
}

impl CleanupWebFarmTasksTask {
    pub const TASK_TYPE: &'static str = "CleanupWebFarmTasks";

    pub fn new(transport: Arc<dyn WebFarmTransport>, retention_hours: i64) -> Self {
        Self {
            transport,
            retention: Duration::hours(retention_hours),
        }
    }
}

#[async_trait]
impl ScheduledTaskHandler for CleanupWebFarmTasksTask {
    async fn execute(&self, _context: &ScheduledTaskContext) -> SchedulerResult<TaskOutcome> {
        let older_than = Utc::now() - self.retention;
        let removed = self.transport.purge_processed(older_than).await?;
        info!("清理了 {} 个过期的Web农场任务", removed);
        Ok(TaskResult::success_with_message(format!("已清理 {removed} 个Web农场任务")).into())
    }

    fn description(&self) -> &str {
        "删除超过保留期的Web农场任务"
    }
}

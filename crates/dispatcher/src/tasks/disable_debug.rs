use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use webfarm_core::{
    models::{TaskOutcome, TaskResult, WebFarmTask, WebFarmTaskType},
    traits::{ScheduledTaskContext, ScheduledTaskHandler},
    SchedulerResult,
};
use webfarm_sync::{DebugSettings, WebFarmService};

/// 关闭调试：重置本地调试设置，并通知其他服务器同样重置
pub struct DisableDebugTask {
    debug: Arc<DebugSettings>,
    webfarm: Arc<WebFarmService>,
}

impl DisableDebugTask {
    pub const TASK_TYPE: &'static str = "DisableDebug";

    pub fn new(debug: Arc<DebugSettings>, webfarm: Arc<WebFarmService>) -> Self {
        Self { debug, webfarm }
    }
}

#[async_trait]
impl ScheduledTaskHandler for DisableDebugTask {
    async fn execute(&self, context: &ScheduledTaskContext) -> SchedulerResult<TaskOutcome> {
        self.debug.reset();

        let task = WebFarmTask::new(WebFarmTaskType::ResetDebugSettings, context.server_name.clone());
        let broadcast = self.webfarm.create_task(task).await?;
        info!("调试设置已重置, 已广播: {}", broadcast);

        let message = if broadcast {
            "调试设置已重置，并已通知其他服务器"
        } else {
            "调试设置已重置"
        };
        Ok(TaskResult::success_with_message(message).into())
    }

    fn description(&self) -> &str {
        "重置调试设置"
    }
}

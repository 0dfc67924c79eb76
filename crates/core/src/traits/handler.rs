//! 任务处理器接口定义
//!
//! - [`ScheduledTaskHandler`]: 定时任务处理器，按定时任务的类型名称注册
//! - [`WebFarmTaskHandler`]: Web农场任务处理器，按 [`WebFarmTaskType`] 注册
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use webfarm_core::models::{TaskOutcome, TaskResult};
//! use webfarm_core::traits::{ScheduledTaskContext, ScheduledTaskHandler};
//!
//! pub struct RebuildIndex;
//!
//! #[async_trait]
//! impl ScheduledTaskHandler for RebuildIndex {
//!     async fn execute(&self, context: &ScheduledTaskContext) -> SchedulerResult<TaskOutcome> {
//!         Ok(TaskResult::success_with_message("索引已重建").into())
//!     }
//! }
//! ```
//!
//! [`WebFarmTaskType`]: crate::models::WebFarmTaskType

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{ScheduledTask, TaskOutcome, WebFarmTask};
use crate::SchedulerResult;

/// 定时任务执行上下文
#[derive(Debug, Clone)]
pub struct ScheduledTaskContext {
    pub task: ScheduledTask,
    /// 执行任务的服务器名称
    pub server_name: String,
    pub started_at: DateTime<Utc>,
}

/// 定时任务处理器
///
/// 返回 `Err` 或发生 panic 时，调度器会把错误文本记录为可恢复错误，
/// 任务不会被禁用。
#[async_trait]
pub trait ScheduledTaskHandler: Send + Sync {
    async fn execute(&self, context: &ScheduledTaskContext) -> SchedulerResult<TaskOutcome>;

    fn description(&self) -> &str {
        ""
    }
}

/// Web农场任务处理器
///
/// 任务可能被重复投递，处理器必须是幂等的；参数可能过期或缺失，
/// 在按位置取值之前必须先校验参数个数。
#[async_trait]
pub trait WebFarmTaskHandler: Send + Sync {
    async fn execute(&self, task: &WebFarmTask) -> SchedulerResult<()>;
}

//! 数据仓储层接口定义
//!
//! 定时任务表由所有节点的调度循环共同读写。一致性依赖底层关系存储的
//! 行级原子更新：`try_acquire_due` 是一次条件更新（比较并设置），
//! 只有一个调用方能把空闲或租约过期、且仍然到期的任务切换为运行状态。
//! 其他节点刚执行完并推进了下一次执行时间的任务不会被再次获取。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use chrono::{Duration, Utc};
//! use webfarm_core::traits::ScheduledTaskRepository;
//!
//! async fn run_once(repo: &dyn ScheduledTaskRepository) -> SchedulerResult<()> {
//!     let now = Utc::now();
//!     for task in repo.get_due_tasks(now, "node-a", 50).await? {
//!         if repo.try_acquire_due(task.id, "node-a", now, now + Duration::minutes(30)).await? {
//!             // 执行处理器 ...
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{ScheduledTask, ScheduledTaskFilter, ScheduledTaskRunUpdate};
use crate::SchedulerResult;

/// 定时任务仓储接口
#[async_trait]
pub trait ScheduledTaskRepository: Send + Sync {
    /// 创建任务，返回带数据库ID的任务
    async fn create(&self, task: &ScheduledTask) -> SchedulerResult<ScheduledTask>;

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<ScheduledTask>>;

    async fn get_by_name(&self, name: &str) -> SchedulerResult<Option<ScheduledTask>>;

    /// 更新任务定义（不修改运行状态与租约）
    async fn update(&self, task: &ScheduledTask) -> SchedulerResult<()>;

    async fn delete(&self, id: i64) -> SchedulerResult<()>;

    async fn list(&self, filter: &ScheduledTaskFilter) -> SchedulerResult<Vec<ScheduledTask>>;

    /// 查询到期任务：已启用、下一次执行时间不晚于 `now`、未被有效租约占用，
    /// 且允许在 `server_name` 上运行。按下一次执行时间升序。
    async fn get_due_tasks(
        &self,
        now: DateTime<Utc>,
        server_name: &str,
        limit: i64,
    ) -> SchedulerResult<Vec<ScheduledTask>>;

    /// 统计队列中的任务数（已启用且下一次执行时间已过）
    async fn count_due_tasks(&self, now: DateTime<Utc>) -> SchedulerResult<i64>;

    /// 原子地获取到期任务的执行租约，成功时任务进入运行状态。
    ///
    /// 在同一条件更新中重新检查任务已启用且 `next_run_time <= now`，
    /// 调度循环读到的到期快照过时时返回 false。
    async fn try_acquire_due(
        &self,
        id: i64,
        owner: &str,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> SchedulerResult<bool>;

    /// 原子地获取执行租约，不检查到期时间，用于手动立即执行
    async fn try_acquire(
        &self,
        id: i64,
        owner: &str,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> SchedulerResult<bool>;

    /// 写回执行结果并释放租约；租约已不属于 `owner` 时返回 false
    async fn complete_run(
        &self,
        id: i64,
        owner: &str,
        update: &ScheduledTaskRunUpdate,
    ) -> SchedulerResult<bool>;

    /// 重置损坏的运行状态：属于 `owner` 或租约已过期的运行中任务恢复为空闲
    async fn reset_corrupted(&self, owner: &str, now: DateTime<Utc>) -> SchedulerResult<u64>;
}

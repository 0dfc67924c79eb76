use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::WebFarmTask;
use crate::SchedulerResult;

/// 服务器名称不区分大小写，登记、投递和查询前统一转换为小写
pub fn normalize_server_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Web农场任务传输接口
///
/// 负责把任务投递给其他服务器节点。投递是发出即忘的：
/// 没有确认回传，也不保证重试。实现可以是数据库队列或进程内通道。
/// 所有接收服务器名称的方法都按 [`normalize_server_name`] 处理。
#[async_trait]
pub trait WebFarmTransport: Send + Sync {
    /// 登记服务器名称，使其成为广播目标
    async fn register_server(&self, server_name: &str) -> SchedulerResult<()>;

    /// 已知的全部服务器名称
    async fn list_servers(&self) -> SchedulerResult<Vec<String>>;

    /// 把任务投递给 `targets` 中的每个服务器
    async fn publish(&self, task: &WebFarmTask, targets: &[String]) -> SchedulerResult<()>;

    /// 拉取发给指定服务器的待处理任务，按创建顺序
    async fn fetch_pending(
        &self,
        server_name: &str,
        limit: usize,
    ) -> SchedulerResult<Vec<WebFarmTask>>;

    /// 标记任务已被指定服务器处理
    async fn acknowledge(&self, server_name: &str, task_id: Uuid) -> SchedulerResult<()>;

    /// 丢弃发给指定服务器的仅内存任务（进程重启时调用）
    async fn drop_memory_tasks(&self, server_name: &str) -> SchedulerResult<u64>;

    /// 清理早于 `older_than` 的任务，超过保留期仍未处理的投递一并丢弃
    async fn purge_processed(&self, older_than: DateTime<Utc>) -> SchedulerResult<u64>;

    /// 发给指定服务器的待处理任务数
    async fn pending_count(&self, server_name: &str) -> SchedulerResult<i64>;
}

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;
use webfarm_core::{
    models::WebFarmTask,
    traits::{normalize_server_name, WebFarmTransport},
    SchedulerResult,
};

/// 内存传输配置
#[derive(Debug, Clone)]
pub struct InMemoryTransportConfig {
    /// 单个服务器队列的最大长度，超过后丢弃最旧的任务
    pub max_queue_size: usize,
}

impl Default for InMemoryTransportConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10_000,
        }
    }
}

/// 进程内Web农场任务传输
///
/// 每个服务器一条队列，任务投递时按目标复制。
/// 适用于单进程部署和测试，进程退出后任务全部丢失。
#[derive(Clone)]
pub struct InMemoryWebFarmTransport {
    servers: Arc<RwLock<BTreeSet<String>>>,
    queues: Arc<RwLock<HashMap<String, VecDeque<WebFarmTask>>>>,
    config: InMemoryTransportConfig,
}

impl InMemoryWebFarmTransport {
    pub fn new() -> Self {
        Self::with_config(InMemoryTransportConfig::default())
    }

    pub fn with_config(config: InMemoryTransportConfig) -> Self {
        info!(
            "创建内存Web农场传输，队列上限: {}",
            config.max_queue_size
        );
        Self {
            servers: Arc::new(RwLock::new(BTreeSet::new())),
            queues: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// 所有队列中的任务总数
    pub async fn total_pending(&self) -> usize {
        self.queues.read().await.values().map(VecDeque::len).sum()
    }
}

impl Default for InMemoryWebFarmTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebFarmTransport for InMemoryWebFarmTransport {
    async fn register_server(&self, server_name: &str) -> SchedulerResult<()> {
        let server_name = normalize_server_name(server_name);
        let inserted = self.servers.write().await.insert(server_name.clone());
        if inserted {
            debug!("登记服务器: {}", server_name);
        }
        self.queues.write().await.entry(server_name).or_default();
        Ok(())
    }

    async fn list_servers(&self) -> SchedulerResult<Vec<String>> {
        Ok(self.servers.read().await.iter().cloned().collect())
    }

    async fn publish(&self, task: &WebFarmTask, targets: &[String]) -> SchedulerResult<()> {
        let targets: BTreeSet<String> = targets.iter().map(|s| normalize_server_name(s)).collect();
        let mut queues = self.queues.write().await;
        for target in &targets {
            let queue = queues.entry(target.clone()).or_default();
            if queue.len() >= self.config.max_queue_size {
                if let Some(dropped) = queue.pop_front() {
                    warn!(
                        "服务器 {} 的队列已满，丢弃最旧的任务 {} ({})",
                        target, dropped.id, dropped.task_type
                    );
                }
            }
            queue.push_back(task.clone());
        }
        debug!(
            "任务 {} ({}) 已投递到 {} 个服务器",
            task.id,
            task.task_type,
            targets.len()
        );
        Ok(())
    }

    async fn fetch_pending(
        &self,
        server_name: &str,
        limit: usize,
    ) -> SchedulerResult<Vec<WebFarmTask>> {
        let queues = self.queues.read().await;
        Ok(queues
            .get(&normalize_server_name(server_name))
            .map(|queue| queue.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn acknowledge(&self, server_name: &str, task_id: Uuid) -> SchedulerResult<()> {
        let mut queues = self.queues.write().await;
        if let Some(queue) = queues.get_mut(&normalize_server_name(server_name)) {
            queue.retain(|task| task.id != task_id);
        }
        Ok(())
    }

    async fn drop_memory_tasks(&self, server_name: &str) -> SchedulerResult<u64> {
        let mut queues = self.queues.write().await;
        let Some(queue) = queues.get_mut(&normalize_server_name(server_name)) else {
            return Ok(0);
        };
        let before = queue.len();
        queue.retain(|task| !task.is_memory_task);
        Ok((before - queue.len()) as u64)
    }

    async fn purge_processed(&self, older_than: DateTime<Utc>) -> SchedulerResult<u64> {
        let mut queues = self.queues.write().await;
        let mut removed = 0u64;
        for queue in queues.values_mut() {
            let before = queue.len();
            queue.retain(|task| task.created_at >= older_than);
            removed += (before - queue.len()) as u64;
        }
        Ok(removed)
    }

    async fn pending_count(&self, server_name: &str) -> SchedulerResult<i64> {
        let queues = self.queues.read().await;
        Ok(queues
            .get(&normalize_server_name(server_name))
            .map_or(0, |q| q.len() as i64))
    }
}

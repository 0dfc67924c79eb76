use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webfarm_core::{traits::ScheduledTaskRepository, SchedulerResult};
use webfarm_infrastructure::MetricsCollector;

/// 调度器性能计数器
///
/// - `running_tasks`: 调度循环维护的实时计数
/// - `tasks_in_queue`: 按需从任务表统计的已到期任务数
pub struct PerformanceCounters {
    running: AtomicI64,
    repository: Arc<dyn ScheduledTaskRepository>,
    metrics: Arc<MetricsCollector>,
}

/// 计数器快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub running_tasks: i64,
    pub tasks_in_queue: i64,
    pub captured_at: DateTime<Utc>,
}

impl PerformanceCounters {
    pub fn new(
        repository: Arc<dyn ScheduledTaskRepository>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            running: AtomicI64::new(0),
            repository,
            metrics,
        }
    }

    pub fn running_tasks(&self) -> i64 {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn tasks_in_queue(&self) -> SchedulerResult<i64> {
        self.repository.count_due_tasks(Utc::now()).await
    }

    /// 读取两个计数器并同步到指标
    pub async fn snapshot(&self) -> SchedulerResult<CountersSnapshot> {
        let tasks_in_queue = self.tasks_in_queue().await?;
        let running_tasks = self.running_tasks();
        self.metrics.update_tasks_in_queue(tasks_in_queue);
        self.metrics.update_running_tasks(running_tasks);
        Ok(CountersSnapshot {
            running_tasks,
            tasks_in_queue,
            captured_at: Utc::now(),
        })
    }

    /// 标记一个任务开始运行，返回的守卫在析构时递减计数
    pub fn enter(&self) -> RunningTaskGuard<'_> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.update_running_tasks(running);
        RunningTaskGuard { counters: self }
    }
}

/// 运行中任务守卫，处理器 panic 时同样会递减计数
pub struct RunningTaskGuard<'a> {
    counters: &'a PerformanceCounters,
}

impl Drop for RunningTaskGuard<'_> {
    fn drop(&mut self) {
        let running = self.counters.running.fetch_sub(1, Ordering::SeqCst) - 1;
        self.counters.metrics.update_running_tasks(running);
    }
}

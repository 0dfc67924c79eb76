use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use webfarm_core::{
    config::SchedulerConfig,
    models::{ScheduledTask, ScheduledTaskRunUpdate, TaskOutcome, TaskResult},
    traits::{ScheduledTaskContext, ScheduledTaskRepository},
    SchedulerError, SchedulerResult,
};
use webfarm_infrastructure::{MetricsCollector, StructuredLogger};

use crate::counters::PerformanceCounters;
use crate::interval_utils::IntervalScheduler;
use crate::registry::ScheduledTaskRegistry;

/// 调度器运行参数
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// 本节点名称，同时作为租约持有者
    pub server_name: String,
    pub lease_duration: Duration,
    pub max_tasks_per_pass: i64,
    pub poll_interval: std::time::Duration,
}

impl SchedulerSettings {
    pub fn from_config(config: &SchedulerConfig, server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            lease_duration: Duration::seconds(config.lease_seconds),
            max_tasks_per_pass: config.max_tasks_per_pass,
            poll_interval: std::time::Duration::from_secs(config.interval_seconds),
        }
    }
}

/// 任务执行的触发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunTrigger {
    /// 调度扫描发现的到期任务，获取租约时重新检查是否仍然到期
    Scheduled,
    /// 手动立即执行，不检查到期时间，也不推迟尚未到来的计划执行
    Manual,
}

/// 一次任务执行的记录
#[derive(Debug, Clone, Serialize)]
pub struct TaskRunRecord {
    pub task_id: i64,
    pub task_name: String,
    pub result: TaskResult,
    pub next_run_time: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

/// 一轮调度扫描的汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerPassReport {
    pub due: usize,
    pub executed: usize,
    /// 租约被其他执行者持有而跳过的任务
    pub skipped: usize,
    pub failed: usize,
    pub records: Vec<TaskRunRecord>,
}

/// 定时任务调度器
///
/// 每轮扫描按下一次执行时间顺序依次执行到期任务。执行前通过租约
/// 取得任务的独占权，保证同一任务在所有线程和节点上至多一个执行实例。
pub struct TaskScheduler {
    repository: Arc<dyn ScheduledTaskRepository>,
    registry: Arc<ScheduledTaskRegistry>,
    counters: Arc<PerformanceCounters>,
    metrics: Arc<MetricsCollector>,
    settings: SchedulerSettings,
}

impl TaskScheduler {
    pub fn new(
        repository: Arc<dyn ScheduledTaskRepository>,
        registry: Arc<ScheduledTaskRegistry>,
        counters: Arc<PerformanceCounters>,
        metrics: Arc<MetricsCollector>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            repository,
            registry,
            counters,
            metrics,
            settings,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn counters(&self) -> &Arc<PerformanceCounters> {
        &self.counters
    }

    /// 扫描并执行所有到期任务
    pub async fn run_due_tasks(&self) -> SchedulerResult<SchedulerPassReport> {
        let pass_started = Instant::now();
        let now = Utc::now();
        let due_tasks = self
            .repository
            .get_due_tasks(now, &self.settings.server_name, self.settings.max_tasks_per_pass)
            .await?;

        let mut report = SchedulerPassReport {
            due: due_tasks.len(),
            ..Default::default()
        };

        if due_tasks.is_empty() {
            debug!("没有到期的定时任务");
        } else {
            info!("发现 {} 个到期的定时任务", due_tasks.len());
        }

        for task in due_tasks {
            let task_id = task.id;
            match self.execute_task(task, RunTrigger::Scheduled).await {
                Ok(Some(record)) => {
                    report.executed += 1;
                    if !record.result.is_success() {
                        report.failed += 1;
                    }
                    report.records.push(record);
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    error!("执行定时任务 {} 失败: {}", task_id, e);
                    report.failed += 1;
                }
            }
        }

        self.metrics
            .record_scheduler_pass(pass_started.elapsed().as_secs_f64());
        if let Err(e) = self.counters.snapshot().await {
            warn!("更新性能计数器失败: {}", e);
        }

        if report.executed > 0 {
            info!(
                "本轮调度完成: 执行 {} 个, 失败 {} 个, 跳过 {} 个",
                report.executed, report.failed, report.skipped
            );
        }
        Ok(report)
    }

    /// 立即执行指定任务，不检查是否到期，仍然需要取得租约。
    /// 尚未到来的计划执行时间保持不变。
    pub async fn run_task_now(&self, task_id: i64) -> SchedulerResult<TaskRunRecord> {
        let task = self
            .repository
            .get_by_id(task_id)
            .await?
            .ok_or(SchedulerError::TaskNotFound { id: task_id })?;

        info!("手动执行定时任务: {} (ID: {})", task.name, task.id);
        self.execute_task(task, RunTrigger::Manual)
            .await?
            .ok_or(SchedulerError::TaskAlreadyRunning { id: task_id })
    }

    /// 周期性执行调度扫描，直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            "定时任务调度器启动: 服务器={}, 间隔={:?}",
            self.settings.server_name, self.settings.poll_interval
        );
        let mut interval = tokio::time::interval(self.settings.poll_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_due_tasks().await {
                        error!("定时任务调度失败: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("调度器循环收到关闭信号");
                    break;
                }
            }
        }
    }

    /// 取得租约后执行任务，租约被占用或任务已被其他执行者处理时返回 None
    async fn execute_task(
        &self,
        task: ScheduledTask,
        trigger: RunTrigger,
    ) -> SchedulerResult<Option<TaskRunRecord>> {
        let started_at = Utc::now();
        let lease_until = started_at + self.settings.lease_duration;
        let owner = self.settings.server_name.as_str();

        let acquired = match trigger {
            RunTrigger::Scheduled => {
                self.repository
                    .try_acquire_due(task.id, owner, started_at, lease_until)
                    .await?
            }
            RunTrigger::Manual => {
                self.repository
                    .try_acquire(task.id, owner, started_at, lease_until)
                    .await?
            }
        };
        if !acquired {
            debug!("任务 {} 正在由其他执行者运行或已不再到期，跳过", task.name);
            return Ok(None);
        }

        let timer = Instant::now();
        let outcome = {
            let _running = self.counters.enter();
            StructuredLogger::log_scheduled_task_start(task.id, &task.name, &task.task_type, owner);
            self.invoke_handler(&task, started_at).await
        };
        let duration = timer.elapsed();
        let finished_at = Utc::now();

        let next_run_time = self.next_run_time(&task, &outcome, trigger, finished_at);
        let update = ScheduledTaskRunUpdate {
            next_run_time,
            last_result: outcome.result.message().map(str::to_string),
            last_run_time: started_at,
            disable: outcome.result.is_fatal(),
        };

        if !self.repository.complete_run(task.id, owner, &update).await? {
            warn!("任务 {} 的执行租约已失效，结果未写回", task.name);
        }

        let status = outcome.result.status_label();
        self.metrics
            .record_scheduled_run(&task.task_type, status, duration.as_secs_f64());
        StructuredLogger::log_scheduled_task_complete(
            task.id,
            &task.name,
            status,
            duration.as_millis() as u64,
            outcome.result.message(),
            next_run_time,
        );

        Ok(Some(TaskRunRecord {
            task_id: task.id,
            task_name: task.name,
            result: outcome.result,
            next_run_time,
            duration_ms: duration.as_millis() as u64,
        }))
    }

    /// 调用处理器，`Err` 和 panic 都转换为可恢复错误
    async fn invoke_handler(&self, task: &ScheduledTask, started_at: DateTime<Utc>) -> TaskOutcome {
        let Some(handler) = self.registry.resolve(&task.task_type) else {
            let err = SchedulerError::TaskTypeNotRegistered {
                task_type: task.task_type.clone(),
            };
            warn!("定时任务 {} 无法执行: {}", task.name, err);
            return TaskOutcome::new(TaskResult::error(err.to_string()));
        };

        let context = ScheduledTaskContext {
            task: task.clone(),
            server_name: self.settings.server_name.clone(),
            started_at,
        };

        match AssertUnwindSafe(handler.execute(&context)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => TaskOutcome::new(TaskResult::error(e.to_string())),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("定时任务 {} 的处理器发生panic: {}", task.name, message);
                TaskOutcome::new(TaskResult::error(format!("任务处理器异常终止: {message}")))
            }
        }
    }

    fn next_run_time(
        &self,
        task: &ScheduledTask,
        outcome: &TaskOutcome,
        trigger: RunTrigger,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if outcome.result.is_fatal() {
            return None;
        }
        if let Some(at) = outcome.reschedule_at {
            return Some(at);
        }
        if trigger == RunTrigger::Manual {
            if let Some(upcoming) = task.next_run_time.filter(|t| *t > now) {
                return Some(upcoming);
            }
        }
        IntervalScheduler::new(task.interval.clone()).next_run_time(task.next_run_time, now)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知错误".to_string()
    }
}

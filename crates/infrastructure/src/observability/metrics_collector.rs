//! 调度器与Web农场同步的指标收集
//!
//! 指标通过 `metrics` 门面记录，由进程启动时安装的Prometheus导出器暴露。
//! 未安装导出器时所有记录都是空操作。

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use tracing::{debug, warn};

/// 指标收集器
pub struct MetricsCollector {
    // 定时任务
    scheduled_task_runs_total: Counter,
    scheduled_task_duration: Histogram,
    scheduled_task_failures_total: Counter,
    running_tasks: Gauge,
    tasks_in_queue: Gauge,
    scheduler_pass_duration: Histogram,

    // Web农场任务
    webfarm_tasks_created_total: Counter,
    webfarm_tasks_processed_total: Counter,
    webfarm_task_failures_total: Counter,
    webfarm_pending_tasks: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            scheduled_task_runs_total: counter!("webfarm_scheduled_task_runs_total"),
            scheduled_task_duration: histogram!("webfarm_scheduled_task_duration_seconds"),
            scheduled_task_failures_total: counter!("webfarm_scheduled_task_failures_total"),
            running_tasks: gauge!("webfarm_running_tasks"),
            tasks_in_queue: gauge!("webfarm_tasks_in_queue"),
            scheduler_pass_duration: histogram!("webfarm_scheduler_pass_duration_seconds"),
            webfarm_tasks_created_total: counter!("webfarm_sync_tasks_created_total"),
            webfarm_tasks_processed_total: counter!("webfarm_sync_tasks_processed_total"),
            webfarm_task_failures_total: counter!("webfarm_sync_task_failures_total"),
            webfarm_pending_tasks: gauge!("webfarm_sync_pending_tasks"),
        }
    }

    /// 记录一次定时任务执行
    pub fn record_scheduled_run(&self, task_type: &str, status: &str, duration_seconds: f64) {
        self.scheduled_task_runs_total.increment(1);
        self.scheduled_task_duration.record(duration_seconds);
        counter!(
            "webfarm_scheduled_task_runs_by_status_total",
            "task_type" => task_type.to_string(),
            "status" => status.to_string()
        )
        .increment(1);

        if status != "success" {
            self.scheduled_task_failures_total.increment(1);
            warn!(
                task_type = task_type,
                status = status,
                duration_seconds = duration_seconds,
                "定时任务执行未成功"
            );
        } else {
            debug!(
                task_type = task_type,
                duration_seconds = duration_seconds,
                "定时任务执行完成"
            );
        }
    }

    pub fn update_running_tasks(&self, running: i64) {
        self.running_tasks.set(running as f64);
    }

    pub fn update_tasks_in_queue(&self, queued: i64) {
        self.tasks_in_queue.set(queued as f64);
    }

    /// 记录一轮调度扫描的耗时
    pub fn record_scheduler_pass(&self, duration_seconds: f64) {
        self.scheduler_pass_duration.record(duration_seconds);
    }

    pub fn record_webfarm_task_created(&self, task_type: &str, targets: usize) {
        self.webfarm_tasks_created_total.increment(1);
        counter!(
            "webfarm_sync_tasks_created_by_type_total",
            "task_type" => task_type.to_string()
        )
        .increment(1);
        debug!(task_type = task_type, targets = targets, "Web农场任务已创建");
    }

    pub fn record_webfarm_task_processed(&self, task_type: &str) {
        self.webfarm_tasks_processed_total.increment(1);
        counter!(
            "webfarm_sync_tasks_processed_by_type_total",
            "task_type" => task_type.to_string()
        )
        .increment(1);
    }

    pub fn record_webfarm_task_failure(&self, task_type: &str, error_type: &str) {
        self.webfarm_task_failures_total.increment(1);
        warn!(
            task_type = task_type,
            error_type = error_type,
            "Web农场任务执行失败"
        );
    }

    pub fn update_webfarm_pending(&self, pending: i64) {
        self.webfarm_pending_tasks.set(pending as f64);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let metrics = MetricsCollector::new();
        metrics.record_scheduled_run("DeleteInactiveContacts", "success", 0.2);
        metrics.record_scheduled_run("DeleteInactiveContacts", "error", 0.1);
        metrics.update_running_tasks(2);
        metrics.update_tasks_in_queue(5);
        metrics.record_webfarm_task_created("CLEARCACHE", 3);
        metrics.record_webfarm_task_processed("CLEARCACHE");
        metrics.record_webfarm_task_failure("UPDATEAVATAR", "io");
        metrics.update_webfarm_pending(0);
    }
}

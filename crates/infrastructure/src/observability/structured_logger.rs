//! 结构化日志事件
//!
//! 每个事件带 `event` 字段，便于在JSON日志中按事件类型检索。

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

pub struct StructuredLogger;

impl StructuredLogger {
    /// 定时任务开始执行
    pub fn log_scheduled_task_start(task_id: i64, task_name: &str, task_type: &str, server: &str) {
        info!(
            event = "scheduled_task_start",
            task.id = task_id,
            task.name = task_name,
            task.type = task_type,
            server.name = server,
            "定时任务开始执行"
        );
    }

    /// 定时任务执行结束
    pub fn log_scheduled_task_complete(
        task_id: i64,
        task_name: &str,
        status: &str,
        duration_ms: u64,
        message: Option<&str>,
        next_run_time: Option<DateTime<Utc>>,
    ) {
        let next_run = next_run_time.map(|t| t.to_rfc3339());
        match status {
            "success" => info!(
                event = "scheduled_task_complete",
                task.id = task_id,
                task.name = task_name,
                task.status = status,
                task.duration_ms = duration_ms,
                task.next_run_time = next_run.as_deref(),
                "定时任务执行成功"
            ),
            "fatal" => error!(
                event = "scheduled_task_disabled",
                task.id = task_id,
                task.name = task_name,
                task.status = status,
                task.duration_ms = duration_ms,
                task.error = message.unwrap_or("未知错误"),
                "定时任务发生致命错误，已禁用"
            ),
            _ => warn!(
                event = "scheduled_task_failed",
                task.id = task_id,
                task.name = task_name,
                task.status = status,
                task.duration_ms = duration_ms,
                task.error = message.unwrap_or("未知错误"),
                task.next_run_time = next_run.as_deref(),
                "定时任务执行失败"
            ),
        }
    }

    /// Web农场任务已广播
    pub fn log_webfarm_task_created(task_id: &str, task_type: &str, creator: &str, targets: usize) {
        info!(
            event = "webfarm_task_created",
            webfarm_task.id = task_id,
            webfarm_task.type = task_type,
            webfarm_task.creator = creator,
            webfarm_task.targets = targets,
            "Web农场任务已创建"
        );
    }

    /// Web农场任务在本节点执行完成
    pub fn log_webfarm_task_executed(task_id: &str, task_type: &str, server: &str, success: bool) {
        if success {
            info!(
                event = "webfarm_task_executed",
                webfarm_task.id = task_id,
                webfarm_task.type = task_type,
                server.name = server,
                "Web农场任务已执行"
            );
        } else {
            warn!(
                event = "webfarm_task_skipped",
                webfarm_task.id = task_id,
                webfarm_task.type = task_type,
                server.name = server,
                "Web农场任务被跳过"
            );
        }
    }

    pub fn log_system_error(component: &str, operation: &str, error: &dyn std::error::Error) {
        error!(
            event = "system_error",
            error.component = component,
            error.operation = operation,
            error.message = %error,
            "系统错误"
        );
    }
}

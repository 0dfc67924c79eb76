use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};
use webfarm_core::{traits::ScheduledTaskRepository, SchedulerResult};

/// 恢复报告
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    /// 被重置为空闲状态的任务数
    pub reset_tasks: u64,
    pub recovery_duration_ms: u64,
}

/// 启动时的任务状态恢复
///
/// 进程在执行任务时崩溃会留下 `RUNNING` 状态的任务行。启动时把本节点持有的
/// 和租约已过期的任务重置为空闲，其他节点仍持有有效租约的任务保持不变。
pub struct SchedulerRecoveryService {
    repository: Arc<dyn ScheduledTaskRepository>,
    server_name: String,
}

impl SchedulerRecoveryService {
    pub fn new(repository: Arc<dyn ScheduledTaskRepository>, server_name: impl Into<String>) -> Self {
        Self {
            repository,
            server_name: server_name.into(),
        }
    }

    pub async fn recover_system_state(&self) -> SchedulerResult<RecoveryReport> {
        let started = Instant::now();
        info!("开始恢复定时任务状态: 服务器={}", self.server_name);

        let reset_tasks = self
            .repository
            .reset_corrupted(&self.server_name, Utc::now())
            .await?;

        if reset_tasks > 0 {
            warn!("重置了 {} 个处于损坏运行状态的定时任务", reset_tasks);
        }

        let report = RecoveryReport {
            reset_tasks,
            recovery_duration_ms: started.elapsed().as_millis() as u64,
        };
        info!("定时任务状态恢复完成，耗时 {}ms", report.recovery_duration_ms);
        Ok(report)
    }
}

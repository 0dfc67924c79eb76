use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use webfarm_core::{
    config::WebFarmConfig,
    models::WebFarmTask,
    traits::{normalize_server_name, WebFarmTransport},
    SchedulerError, SchedulerResult,
};
use webfarm_infrastructure::{MetricsCollector, StructuredLogger};

use crate::registry::WebFarmTaskRegistry;
use crate::settings::SynchronizationSettings;

/// Web农场服务运行参数
#[derive(Debug, Clone)]
pub struct WebFarmSettings {
    pub server_name: String,
    pub poll_interval: Duration,
    pub fetch_batch_size: usize,
    /// 配置中静态登记的服务器
    pub servers: Vec<String>,
}

impl WebFarmSettings {
    pub fn from_config(config: &WebFarmConfig, server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
            fetch_batch_size: config.fetch_batch_size,
            servers: config.servers.clone(),
        }
    }
}

/// 一批待处理任务的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub fetched: usize,
    pub executed: usize,
    /// 未注册或条件不满足而跳过的任务
    pub skipped: usize,
    pub failed: usize,
}

/// Web农场任务的创建与执行
pub struct WebFarmService {
    registry: Arc<WebFarmTaskRegistry>,
    transport: Arc<dyn WebFarmTransport>,
    sync: Arc<SynchronizationSettings>,
    metrics: Arc<MetricsCollector>,
    settings: WebFarmSettings,
}

impl WebFarmService {
    pub fn new(
        registry: Arc<WebFarmTaskRegistry>,
        transport: Arc<dyn WebFarmTransport>,
        sync: Arc<SynchronizationSettings>,
        metrics: Arc<MetricsCollector>,
        settings: WebFarmSettings,
    ) -> Self {
        Self {
            registry,
            transport,
            sync,
            metrics,
            settings,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.settings.server_name
    }

    pub fn registry(&self) -> &Arc<WebFarmTaskRegistry> {
        &self.registry
    }

    /// 创建任务并广播给其他服务器
    ///
    /// 未启用同步或注册的条件不满足时返回 `Ok(false)`，不做任何投递；
    /// 任务类型在本地未注册时返回错误。
    pub async fn create_task(&self, mut task: WebFarmTask) -> SchedulerResult<bool> {
        if !self.sync.is_enabled() {
            debug!("Web农场同步未启用，任务 {} 不广播", task.task_type);
            return Ok(false);
        }

        let registration = self.registry.resolve(&task.task_type).ok_or_else(|| {
            SchedulerError::TaskTypeNotRegistered {
                task_type: task.task_type.to_string(),
            }
        })?;

        if !registration.can_run(&task) {
            debug!("任务 {} 的执行条件不满足，不广播", task.task_type);
            return Ok(false);
        }

        task.creator = Some(self.settings.server_name.clone());
        task.is_memory_task = registration.is_memory_task;

        let targets = self.target_servers().await?;
        self.transport.publish(&task, &targets).await?;

        self.metrics
            .record_webfarm_task_created(task.task_type.as_str(), targets.len());
        StructuredLogger::log_webfarm_task_created(
            &task.id.to_string(),
            task.task_type.as_str(),
            &self.settings.server_name,
            targets.len(),
        );
        Ok(true)
    }

    /// 在本节点执行收到的任务
    ///
    /// 未注册的类型和条件不满足的任务返回 `Ok(false)`。
    pub async fn execute_task(&self, task: &WebFarmTask) -> SchedulerResult<bool> {
        let Some(registration) = self.registry.resolve(&task.task_type) else {
            debug!("任务类型 {} 在本节点未注册，忽略", task.task_type);
            return Ok(false);
        };

        if !registration.can_run(task) {
            debug!("任务 {} 的执行条件不满足，跳过", task.task_type);
            return Ok(false);
        }

        registration.handler.execute(task).await?;
        Ok(true)
    }

    /// 拉取并执行一批发给本节点的任务
    ///
    /// 单个任务失败只记录日志，不影响同批其他任务；所有拉取到的任务都会被确认。
    pub async fn process_pending(&self) -> SchedulerResult<ProcessReport> {
        let server = self.settings.server_name.as_str();
        let tasks = self
            .transport
            .fetch_pending(server, self.settings.fetch_batch_size)
            .await?;

        let mut report = ProcessReport {
            fetched: tasks.len(),
            ..Default::default()
        };

        for task in &tasks {
            let task_id = task.id.to_string();
            match self.execute_task(task).await {
                Ok(true) => {
                    report.executed += 1;
                    self.metrics
                        .record_webfarm_task_processed(task.task_type.as_str());
                    StructuredLogger::log_webfarm_task_executed(
                        &task_id,
                        task.task_type.as_str(),
                        server,
                        true,
                    );
                }
                Ok(false) => {
                    report.skipped += 1;
                    StructuredLogger::log_webfarm_task_executed(
                        &task_id,
                        task.task_type.as_str(),
                        server,
                        false,
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    let error_type = if e.is_argument_error() {
                        "invalid_arguments"
                    } else {
                        "execution"
                    };
                    self.metrics
                        .record_webfarm_task_failure(task.task_type.as_str(), error_type);
                    error!("执行Web农场任务 {} ({}) 失败: {}", task_id, task.task_type, e);
                }
            }

            if let Err(e) = self.transport.acknowledge(server, task.id).await {
                warn!("确认Web农场任务 {} 失败: {}", task_id, e);
            }
        }

        match self.transport.pending_count(server).await {
            Ok(pending) => self.metrics.update_webfarm_pending(pending),
            Err(e) => warn!("统计待处理Web农场任务失败: {}", e),
        }

        if report.fetched > 0 {
            info!(
                "处理了 {} 个Web农场任务: 执行 {}, 跳过 {}, 失败 {}",
                report.fetched, report.executed, report.skipped, report.failed
            );
        }
        Ok(report)
    }

    /// 登记本节点和静态配置的服务器，丢弃重启前遗留的仅内存任务
    pub async fn start(&self) -> SchedulerResult<()> {
        let server = self.settings.server_name.as_str();
        self.transport.register_server(server).await?;
        for other in &self.settings.servers {
            self.transport.register_server(other).await?;
        }

        let dropped = self.transport.drop_memory_tasks(server).await?;
        if dropped > 0 {
            info!("丢弃了 {} 个重启前遗留的仅内存任务", dropped);
        }
        info!("Web农场同步已启动: 服务器={}", server);
        Ok(())
    }

    /// 周期性处理待执行任务，直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> SchedulerResult<()> {
        self.start().await?;
        let mut interval = tokio::time::interval(self.settings.poll_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.process_pending().await {
                        error!("处理Web农场任务失败: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Web农场同步循环收到关闭信号");
                    break;
                }
            }
        }
        Ok(())
    }

    /// 除本节点外的所有已知服务器
    async fn target_servers(&self) -> SchedulerResult<Vec<String>> {
        let own = normalize_server_name(&self.settings.server_name);
        let servers: BTreeSet<String> = self
            .transport
            .list_servers()
            .await?
            .iter()
            .chain(self.settings.servers.iter())
            .map(|s| normalize_server_name(s))
            .collect();
        Ok(servers.into_iter().filter(|s| *s != own).collect())
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info, warn};
use webfarm_api::{create_app, AppState};
use webfarm_core::{
    config::AppConfig,
    traits::{ContactStore, ScheduledTaskRepository},
};
use webfarm_dispatcher::{
    tasks::{CleanupWebFarmTasksTask, DeleteInactiveContactsTask, DisableDebugTask},
    PerformanceCounters, ScheduledTaskRegistry, SchedulerRecoveryService, SchedulerSettings,
    TaskScheduler,
};
use webfarm_infrastructure::{
    ConfiguredLicenseService, ConfiguredOffPeakWindow, DatabaseManager, LocalFileStore,
    MemoryCacheStore, MetricsCollector, SqliteContactStore, SqliteScheduledTaskRepository,
    WebFarmTransportFactory,
};
use webfarm_sync::{
    register_builtin_tasks, BuiltinDependencies, DebugSettings, SynchronizationSettings,
    WebFarmService, WebFarmSettings, WebFarmTaskRegistry,
};

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 仅运行定时任务调度器
    Scheduler,
    /// 仅运行Web农场任务同步
    Sync,
    /// 仅运行API服务器
    Api,
    /// 运行所有组件
    All,
}

impl AppMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "scheduler" => Ok(Self::Scheduler),
            "sync" => Ok(Self::Sync),
            "api" => Ok(Self::Api),
            "all" => Ok(Self::All),
            _ => Err(anyhow::anyhow!("不支持的运行模式: {mode}")),
        }
    }

    /// 检查模式对应的组件在配置中是否启用
    pub fn ensure_enabled(self, config: &AppConfig) -> Result<Self> {
        match self {
            Self::Scheduler if !config.scheduler.enabled => {
                Err(anyhow::anyhow!("调度器模式被禁用，请检查配置"))
            }
            Self::Sync if !config.web_farm.enabled => {
                Err(anyhow::anyhow!("同步模式被禁用，请检查配置"))
            }
            Self::Api if !config.api.enabled => Err(anyhow::anyhow!("API模式被禁用，请检查配置")),
            mode => Ok(mode),
        }
    }
}

/// 主应用程序
///
/// 启动时一次性组装所有组件，各运行模式只决定启动哪些循环。
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    database: DatabaseManager,
    repository: Arc<dyn ScheduledTaskRepository>,
    scheduler: Arc<TaskScheduler>,
    counters: Arc<PerformanceCounters>,
    webfarm: Arc<WebFarmService>,
    metrics_handle: Option<PrometheusHandle>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(
        config: AppConfig,
        mode: AppMode,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);

        let database = DatabaseManager::connect(&config.database)
            .await
            .context("连接数据库失败")?;
        let pool = database.pool().clone();

        let repository: Arc<dyn ScheduledTaskRepository> =
            Arc::new(SqliteScheduledTaskRepository::new(pool.clone()));
        let contacts: Arc<dyn ContactStore> = Arc::new(SqliteContactStore::new(pool.clone()));
        let transport = WebFarmTransportFactory::create(&config.web_farm, Some(&pool))
            .context("创建Web农场传输失败")?;

        let server_name = config.web_farm.resolve_server_name();
        info!("本节点服务器名称: {}", server_name);

        let metrics = Arc::new(MetricsCollector::new());
        let counters = Arc::new(PerformanceCounters::new(
            Arc::clone(&repository),
            Arc::clone(&metrics),
        ));

        // Web农场同步
        let sync = Arc::new(SynchronizationSettings::from_config(&config.web_farm));
        let debug = Arc::new(DebugSettings::new(config.debug.clone()));
        let mut webfarm_registry = WebFarmTaskRegistry::new();
        register_builtin_tasks(
            &mut webfarm_registry,
            &BuiltinDependencies {
                files: Arc::new(LocalFileStore::new(config.storage.root_dir.clone())),
                cache: Arc::new(MemoryCacheStore::new()),
                debug: Arc::clone(&debug),
                sync: Arc::clone(&sync),
            },
        )
        .context("注册内置Web农场任务失败")?;
        let webfarm = Arc::new(WebFarmService::new(
            Arc::new(webfarm_registry),
            Arc::clone(&transport),
            sync,
            Arc::clone(&metrics),
            WebFarmSettings::from_config(&config.web_farm, server_name.clone()),
        ));

        // 定时任务
        let off_peak = ConfiguredOffPeakWindow::from_config(&config.off_peak)
            .context("解析非高峰时段失败")?;
        let mut registry = ScheduledTaskRegistry::new();
        registry.register(
            DeleteInactiveContactsTask::TASK_TYPE,
            Arc::new(DeleteInactiveContactsTask::new(
                contacts,
                Arc::new(ConfiguredLicenseService::from_config(&config.license)),
                Arc::new(off_peak),
                config.contacts.clone(),
            )),
        )?;
        registry.register(
            CleanupWebFarmTasksTask::TASK_TYPE,
            Arc::new(CleanupWebFarmTasksTask::new(
                Arc::clone(&transport),
                config.web_farm.task_retention_hours,
            )),
        )?;
        registry.register(
            DisableDebugTask::TASK_TYPE,
            Arc::new(DisableDebugTask::new(debug, Arc::clone(&webfarm))),
        )?;

        let scheduler = Arc::new(TaskScheduler::new(
            Arc::clone(&repository),
            Arc::new(registry),
            Arc::clone(&counters),
            metrics,
            SchedulerSettings::from_config(&config.scheduler, server_name),
        ));

        Ok(Self {
            config,
            mode,
            database,
            repository,
            scheduler,
            counters,
            webfarm,
            metrics_handle,
        })
    }

    /// 运行应用程序，直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        let run_scheduler = match self.mode {
            AppMode::Scheduler => true,
            AppMode::All => self.config.scheduler.enabled,
            _ => false,
        };
        let run_sync = match self.mode {
            AppMode::Sync => true,
            AppMode::All => self.config.web_farm.enabled,
            _ => false,
        };
        let run_api = match self.mode {
            AppMode::Api => true,
            AppMode::All => self.config.api.enabled,
            _ => false,
        };

        let mut handles = Vec::new();

        if run_scheduler {
            self.recover_scheduler_state().await;
            let scheduler = Arc::clone(&self.scheduler);
            let shutdown_rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                scheduler.run(shutdown_rx).await;
            }));
        }

        if run_sync {
            let webfarm = Arc::clone(&self.webfarm);
            let shutdown_rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                if let Err(e) = webfarm.run(shutdown_rx).await {
                    error!("Web农场同步运行失败: {}", e);
                }
            }));
        }

        if run_api {
            let listener = TcpListener::bind(&self.config.api.bind_address)
                .await
                .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address))?;
            let app = create_app(AppState {
                repository: Arc::clone(&self.repository),
                scheduler: Arc::clone(&self.scheduler),
                counters: Arc::clone(&self.counters),
                metrics_handle: self.metrics_handle.clone(),
            });
            let mut shutdown_rx = shutdown_rx.resubscribe();

            info!("API服务器启动在 http://{}", self.config.api.bind_address);
            handles.push(tokio::spawn(async move {
                let server = axum::serve(listener, app.into_make_service())
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_rx.recv().await;
                        info!("API服务器收到关闭信号");
                    });
                if let Err(e) = server.await {
                    error!("API服务器运行失败: {}", e);
                }
            }));
        }

        if handles.is_empty() {
            warn!("配置中没有启用任何组件");
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("组件任务异常退出: {}", e);
            }
        }

        self.database.close().await;
        info!("所有组件已停止");
        Ok(())
    }

    /// 重置上次异常退出时遗留的运行中任务
    async fn recover_scheduler_state(&self) {
        if !self.config.scheduler.reinit_on_start {
            return;
        }

        let recovery = SchedulerRecoveryService::new(
            Arc::clone(&self.repository),
            self.scheduler.settings().server_name.clone(),
        );
        match recovery.recover_system_state().await {
            Ok(report) => info!("调度器状态恢复完成: {:?}", report),
            Err(e) => error!("调度器状态恢复失败: {}", e),
        }
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webfarm_core::{
    config::AppConfig,
    models::{ScheduledTask, ScheduledTaskFilter, TaskInterval},
    traits::ScheduledTaskRepository,
};
use webfarm_dispatcher::IntervalScheduler;
use webfarm_infrastructure::{DatabaseManager, SqliteScheduledTaskRepository};
use webfarm_scheduler::{
    app::{AppMode, Application},
    shutdown::ShutdownManager,
};

/// Web农场定时任务调度与同步服务
#[derive(Parser, Debug)]
#[command(name = "webfarm-scheduler")]
#[command(version = "1.0.0")]
#[command(about = "Web农场定时任务调度与节点间任务同步系统")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件路径
    #[arg(short, long, global = true, default_value = "config/webfarm.toml")]
    config: String,

    /// 日志级别，覆盖配置文件
    #[arg(short, long, global = true, value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    /// 日志格式，覆盖配置文件
    #[arg(long, global = true, value_parser = ["json", "pretty"])]
    log_format: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 启动服务
    Run {
        /// 运行模式
        #[arg(short, long, default_value = "all", value_parser = ["scheduler", "sync", "api", "all"])]
        mode: String,
    },
    /// 生成默认配置文件
    InitConfig {
        /// 输出路径，省略时打印到标准输出
        #[arg(short, long)]
        output: Option<String>,
    },
    /// 列出定时任务
    ListTasks {
        /// 只显示启用的任务
        #[arg(long)]
        enabled_only: bool,
    },
    /// 添加定时任务
    AddTask {
        /// 任务代码名称
        #[arg(short, long)]
        name: String,
        /// 处理器类型，例如 DeleteInactiveContacts
        #[arg(short, long)]
        task_type: String,
        /// 编码后的调度间隔，例如 `hour;1;2024-01-01T00:00:00Z;;`
        #[arg(short, long)]
        interval: String,
        /// 任务数据
        #[arg(short, long)]
        data: Option<String>,
        /// 只在该服务器上执行
        #[arg(short, long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { output } = &cli.command {
        return init_config(output.as_deref());
    }

    let config = AppConfig::load(Some(&cli.config))
        .with_context(|| format!("加载配置文件失败: {}", cli.config))?;

    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    let log_format = cli
        .log_format
        .as_deref()
        .unwrap_or(&config.observability.log_format);
    init_logging(log_level, log_format)?;

    match cli.command {
        Commands::Run { mode } => run(config, &cli.config, &mode).await,
        Commands::ListTasks { enabled_only } => list_tasks(&config, enabled_only).await,
        Commands::AddTask {
            name,
            task_type,
            interval,
            data,
            server,
        } => add_task(&config, name, task_type, &interval, data, server).await,
        Commands::InitConfig { .. } => Ok(()),
    }
}

async fn run(config: AppConfig, config_path: &str, mode: &str) -> Result<()> {
    info!("启动Web农场调度系统");
    info!("配置文件: {config_path}");
    info!("运行模式: {mode}");

    let app_mode = AppMode::parse(mode)?.ensure_enabled(&config)?;
    let metrics_handle = install_metrics_recorder(&config);

    let app = Arc::new(Application::new(config, app_mode, metrics_handle).await?);
    let shutdown_manager = ShutdownManager::default();

    let app_handle = {
        let shutdown_rx = shutdown_manager.subscribe().await;
        let app = Arc::clone(&app);

        tokio::spawn(async move {
            if let Err(e) = app.run(shutdown_rx).await {
                error!("应用运行失败: {e:#}");
            }
        })
    };

    wait_for_shutdown_signal().await;
    info!("收到关闭信号，开始优雅关闭...");

    shutdown_manager.shutdown().await;

    if shutdown_manager.wait_for(app_handle).await {
        info!("应用已优雅关闭");
    }

    info!("Web农场调度系统已退出");
    Ok(())
}

fn init_config(output: Option<&str>) -> Result<()> {
    let content = AppConfig::default_toml()?;
    match output {
        Some(path) => {
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("创建目录失败: {}", parent.display()))?;
            }
            std::fs::write(path, content).with_context(|| format!("写入配置文件失败: {path}"))?;
            println!("默认配置已写入 {path}");
        }
        None => println!("{content}"),
    }
    Ok(())
}

async fn open_repository(config: &AppConfig) -> Result<(DatabaseManager, SqliteScheduledTaskRepository)> {
    let database = DatabaseManager::connect(&config.database)
        .await
        .context("连接数据库失败")?;
    let repository = SqliteScheduledTaskRepository::new(database.pool().clone());
    Ok((database, repository))
}

async fn list_tasks(config: &AppConfig, enabled_only: bool) -> Result<()> {
    let (database, repository) = open_repository(config).await?;
    let filter = ScheduledTaskFilter {
        enabled: enabled_only.then_some(true),
        ..Default::default()
    };
    let tasks = repository.list(&filter).await?;

    println!(
        "{:<6} {:<32} {:<28} {:<8} {:<12} {:<25}",
        "ID", "名称", "类型", "启用", "频率", "下次执行"
    );
    for task in &tasks {
        let next_run = task
            .next_run_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<32} {:<28} {:<8} {:<12} {:<25}",
            task.id,
            task.name,
            task.task_type,
            task.enabled,
            IntervalScheduler::new(task.interval.clone()).frequency_description(),
            next_run
        );
    }
    println!("共 {} 个任务", tasks.len());

    database.close().await;
    Ok(())
}

async fn add_task(
    config: &AppConfig,
    name: String,
    task_type: String,
    interval: &str,
    data: Option<String>,
    server: Option<String>,
) -> Result<()> {
    let interval = TaskInterval::decode(interval).context("解析调度间隔失败")?;
    let mut task = ScheduledTask::new(name, task_type, interval);
    task.data = data;
    task.server_name = server;

    let (database, repository) = open_repository(config).await?;
    let created = repository.create(&task).await?;
    println!(
        "已创建任务 {} (ID: {})，下次执行: {}",
        created.name,
        created.id,
        created
            .next_run_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string())
    );

    database.close().await;
    Ok(())
}

/// 安装Prometheus记录器，失败时只记录警告
fn install_metrics_recorder(config: &AppConfig) -> Option<PrometheusHandle> {
    if !config.observability.metrics_enabled {
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus指标记录器已安装");
            Some(handle)
        }
        Err(e) => {
            warn!("安装Prometheus指标记录器失败: {e}");
            None
        }
    }
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}

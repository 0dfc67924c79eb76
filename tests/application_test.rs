use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tempfile::TempDir;
use webfarm_core::{
    config::{AppConfig, TransportType},
    models::{IntervalPeriod, ScheduledTask, TaskInterval},
    traits::ScheduledTaskRepository,
};
use webfarm_infrastructure::{DatabaseManager, SqliteScheduledTaskRepository};
use webfarm_scheduler::{
    app::{AppMode, Application},
    shutdown::ShutdownManager,
};

fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("webfarm.db").display());
    config.storage.root_dir = dir.path().join("files").display().to_string();
    config.web_farm.server_name = "web-01".to_string();
    config.web_farm.transport = TransportType::Memory;
    config.scheduler.interval_seconds = 1;
    config.api.enabled = false;
    config
}

#[test]
fn test_app_mode_parse() {
    assert_eq!(AppMode::parse("scheduler").unwrap(), AppMode::Scheduler);
    assert_eq!(AppMode::parse("sync").unwrap(), AppMode::Sync);
    assert_eq!(AppMode::parse("all").unwrap(), AppMode::All);
    assert!(AppMode::parse("worker").is_err());
}

#[test]
fn test_disabled_mode_is_rejected() {
    let mut config = AppConfig::default();
    config.api.enabled = false;

    assert!(AppMode::Api.ensure_enabled(&config).is_err());
    assert!(AppMode::All.ensure_enabled(&config).is_ok());
    assert!(AppMode::Scheduler.ensure_enabled(&config).is_ok());
}

#[tokio::test]
async fn test_scheduler_mode_runs_due_task_and_stops() -> Result<()> {
    let dir = TempDir::new()?;
    let config = test_config(&dir);

    // 预先写入一个到期的关闭调试任务
    let database = DatabaseManager::connect(&config.database).await?;
    let repository = SqliteScheduledTaskRepository::new(database.pool().clone());
    let interval = TaskInterval::new(
        IntervalPeriod::Hour,
        1,
        Utc::now() - chrono::Duration::hours(2),
    );
    let mut task = ScheduledTask::new("disable_debug".to_string(), "DisableDebug".to_string(), interval);
    task.next_run_time = Some(Utc::now() - chrono::Duration::minutes(1));
    let created = repository.create(&task).await?;

    let app = Application::new(config, AppMode::Scheduler, None).await?;
    let shutdown = ShutdownManager::new(Duration::from_secs(5));
    let shutdown_rx = shutdown.subscribe().await;

    let handle = tokio::spawn(async move { app.run(shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.shutdown().await;

    assert!(shutdown.wait_for(handle).await);

    let stored = repository.get_by_id(created.id).await?.unwrap();
    assert_eq!(stored.execution_count, 1);
    assert!(stored.next_run_time.unwrap() > Utc::now());
    assert!(stored.last_result.is_some());

    database.close().await;
    Ok(())
}

#[tokio::test]
async fn test_all_mode_with_api_disabled_stops_on_shutdown() -> Result<()> {
    let dir = TempDir::new()?;
    let app = Application::new(test_config(&dir), AppMode::All, None).await?;
    let shutdown = ShutdownManager::default();
    let shutdown_rx = shutdown.subscribe().await;

    let handle = tokio::spawn(async move { app.run(shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.shutdown().await;

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await??;
    assert!(result.is_ok());
    Ok(())
}

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};
use webfarm_core::{config::DatabaseConfig, SchedulerResult};

/// SQLite 数据库管理器
///
/// 负责创建连接池并执行内联迁移。所有节点共享同一个数据库文件时，
/// 任务表上的条件更新提供行级互斥。
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// 根据配置创建连接池并运行迁移
    pub async fn connect(config: &DatabaseConfig) -> SchedulerResult<Self> {
        debug!("连接SQLite数据库: {}", config.url);

        let connect_options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(config.connection_timeout_seconds));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect_with(connect_options)
            .await?;

        run_migrations(&pool).await?;

        info!("数据库连接池已就绪");
        Ok(Self { pool })
    }

    /// 内存数据库，单连接，测试和嵌入式场景使用
    pub async fn in_memory() -> SchedulerResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> SchedulerResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> SchedulerResult<()> {
    debug!("Running SQLite database migrations");

    // 定时任务表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scheduled_tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            task_type TEXT NOT NULL,
            target TEXT,
            data TEXT,
            enabled INTEGER NOT NULL DEFAULT 1,
            next_run_time DATETIME,
            interval TEXT NOT NULL,
            last_result TEXT,
            last_run_time DATETIME,
            execution_count INTEGER NOT NULL DEFAULT 0,
            server_name TEXT,
            status TEXT NOT NULL DEFAULT 'IDLE',
            lease_owner TEXT,
            lease_expires_at DATETIME,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Web农场服务器表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS web_farm_servers (
            name TEXT PRIMARY KEY,
            registered_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_seen_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Web农场任务表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS web_farm_tasks (
            id TEXT PRIMARY KEY,
            seq INTEGER NOT NULL,
            task_type TEXT NOT NULL,
            target TEXT NOT NULL,
            parameters TEXT NOT NULL DEFAULT '[]',
            binary_data BLOB,
            is_memory_task INTEGER NOT NULL DEFAULT 0,
            creator TEXT,
            created_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 每个目标服务器一行，处理后标记
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS web_farm_task_targets (
            task_id TEXT NOT NULL,
            server_name TEXT NOT NULL,
            processed_at DATETIME,
            PRIMARY KEY (task_id, server_name),
            FOREIGN KEY (task_id) REFERENCES web_farm_tasks(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 联系人表
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT,
            last_activity_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建索引
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_due ON scheduled_tasks(enabled, next_run_time)",
        "CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_task_type ON scheduled_tasks(task_type)",
        "CREATE INDEX IF NOT EXISTS idx_web_farm_tasks_seq ON web_farm_tasks(seq)",
        "CREATE INDEX IF NOT EXISTS idx_web_farm_task_targets_pending ON web_farm_task_targets(server_name, processed_at)",
        "CREATE INDEX IF NOT EXISTS idx_contacts_last_activity ON contacts(last_activity_at)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    debug!("Successfully completed SQLite database migrations");
    Ok(())
}

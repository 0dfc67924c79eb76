use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};
use uuid::Uuid;
use webfarm_core::{
    models::{WebFarmTask, WebFarmTaskType},
    traits::{normalize_server_name, WebFarmTransport},
    SchedulerError, SchedulerResult,
};

/// 基于共享数据库的Web农场任务队列
///
/// 每个任务一行，每个目标服务器在 `web_farm_task_targets` 中一行，
/// 目标服务器处理后写入 `processed_at`。
pub struct SqliteWebFarmTransport {
    pool: SqlitePool,
}

impl SqliteWebFarmTransport {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> SchedulerResult<WebFarmTask> {
        let id: String = row.try_get("id")?;
        let task_type: String = row.try_get("task_type")?;
        let parameters: String = row.try_get("parameters")?;

        Ok(WebFarmTask {
            id: Uuid::parse_str(&id)
                .map_err(|e| SchedulerError::Serialization(format!("无效的任务ID {id}: {e}")))?,
            task_type: WebFarmTaskType::from_wire(&task_type),
            target: row.try_get("target")?,
            parameters: serde_json::from_str(&parameters)?,
            binary_data: row.try_get("binary_data")?,
            is_memory_task: row.try_get("is_memory_task")?,
            creator: row.try_get("creator")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl WebFarmTransport for SqliteWebFarmTransport {
    async fn register_server(&self, server_name: &str) -> SchedulerResult<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO web_farm_servers (name, registered_at, last_seen_at)
            VALUES (?1, ?2, ?2)
            ON CONFLICT(name) DO UPDATE SET last_seen_at = excluded.last_seen_at
            "#,
        )
        .bind(normalize_server_name(server_name))
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_servers(&self) -> SchedulerResult<Vec<String>> {
        let servers = sqlx::query_scalar("SELECT name FROM web_farm_servers ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(servers)
    }

    #[instrument(skip(self, task), fields(task.id = %task.id, task.type = %task.task_type))]
    async fn publish(&self, task: &WebFarmTask, targets: &[String]) -> SchedulerResult<()> {
        if targets.is_empty() {
            debug!("没有目标服务器，跳过投递");
            return Ok(());
        }

        let targets: BTreeSet<String> = targets.iter().map(|s| normalize_server_name(s)).collect();
        let id = task.id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO web_farm_tasks (
                id, seq, task_type, target, parameters, binary_data, is_memory_task, creator, created_at
            )
            VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM web_farm_tasks), ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(task.task_type.as_str())
        .bind(&task.target)
        .bind(serde_json::to_string(&task.parameters)?)
        .bind(&task.binary_data)
        .bind(task.is_memory_task)
        .bind(&task.creator)
        .bind(task.created_at)
        .execute(&mut *tx)
        .await?;

        for server in &targets {
            sqlx::query("INSERT INTO web_farm_task_targets (task_id, server_name) VALUES (?1, ?2)")
                .bind(&id)
                .bind(server)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("任务已投递到 {} 个服务器", targets.len());
        Ok(())
    }

    async fn fetch_pending(
        &self,
        server_name: &str,
        limit: usize,
    ) -> SchedulerResult<Vec<WebFarmTask>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.task_type, t.target, t.parameters, t.binary_data, t.is_memory_task,
                   t.creator, t.created_at
            FROM web_farm_tasks t
            JOIN web_farm_task_targets g ON g.task_id = t.id
            WHERE g.server_name = ?1 AND g.processed_at IS NULL
            ORDER BY t.seq ASC
            LIMIT ?2
            "#,
        )
        .bind(normalize_server_name(server_name))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_task).collect()
    }

    async fn acknowledge(&self, server_name: &str, task_id: Uuid) -> SchedulerResult<()> {
        sqlx::query(
            "UPDATE web_farm_task_targets SET processed_at = ?1 WHERE task_id = ?2 AND server_name = ?3",
        )
        .bind(Utc::now())
        .bind(task_id.to_string())
        .bind(normalize_server_name(server_name))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn drop_memory_tasks(&self, server_name: &str) -> SchedulerResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE web_farm_task_targets
            SET processed_at = ?1
            WHERE server_name = ?2
              AND processed_at IS NULL
              AND task_id IN (SELECT id FROM web_farm_tasks WHERE is_memory_task = 1)
            "#,
        )
        .bind(Utc::now())
        .bind(normalize_server_name(server_name))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn purge_processed(&self, older_than: DateTime<Utc>) -> SchedulerResult<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM web_farm_task_targets
             WHERE task_id IN (SELECT id FROM web_farm_tasks WHERE created_at < ?1)",
        )
        .bind(older_than)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM web_farm_tasks WHERE created_at < ?1")
            .bind(older_than)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn pending_count(&self, server_name: &str) -> SchedulerResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM web_farm_task_targets WHERE server_name = ?1 AND processed_at IS NULL",
        )
        .bind(normalize_server_name(server_name))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

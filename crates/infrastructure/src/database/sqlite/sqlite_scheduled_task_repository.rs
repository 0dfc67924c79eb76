use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, instrument};
use webfarm_core::{
    models::{ScheduledTask, ScheduledTaskFilter, ScheduledTaskRunUpdate, TaskInterval},
    traits::ScheduledTaskRepository,
    SchedulerError, SchedulerResult,
};

const SELECT_COLUMNS: &str = "SELECT id, name, display_name, task_type, target, data, enabled, \
     next_run_time, interval, last_result, last_run_time, execution_count, server_name, status, \
     lease_owner, lease_expires_at, created_at, updated_at FROM scheduled_tasks";

pub struct SqliteScheduledTaskRepository {
    pool: SqlitePool,
}

impl SqliteScheduledTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> SchedulerResult<ScheduledTask> {
        let interval: String = row.try_get("interval")?;

        Ok(ScheduledTask {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            display_name: row.try_get("display_name")?,
            task_type: row.try_get("task_type")?,
            target: row.try_get("target")?,
            data: row.try_get("data")?,
            enabled: row.try_get("enabled")?,
            next_run_time: row.try_get("next_run_time")?,
            interval: TaskInterval::decode(&interval)?,
            last_result: row.try_get("last_result")?,
            last_run_time: row.try_get("last_run_time")?,
            execution_count: row.try_get("execution_count")?,
            server_name: row.try_get("server_name")?,
            status: row.try_get("status")?,
            lease_owner: row.try_get("lease_owner")?,
            lease_expires_at: row.try_get("lease_expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn map_unique_violation(err: sqlx::Error, name: &str) -> SchedulerError {
        let is_unique = err
            .as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation());
        if is_unique {
            SchedulerError::TaskAlreadyExists {
                name: name.to_string(),
            }
        } else {
            SchedulerError::Database(err)
        }
    }
}

#[async_trait]
impl ScheduledTaskRepository for SqliteScheduledTaskRepository {
    #[instrument(skip(self, task), fields(task.name = %task.name))]
    async fn create(&self, task: &ScheduledTask) -> SchedulerResult<ScheduledTask> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO scheduled_tasks (
                name, display_name, task_type, target, data, enabled, next_run_time, interval,
                last_result, last_run_time, execution_count, server_name, status,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 'IDLE', ?13, ?13)
            "#,
        )
        .bind(&task.name)
        .bind(&task.display_name)
        .bind(&task.task_type)
        .bind(&task.target)
        .bind(&task.data)
        .bind(task.enabled)
        .bind(task.next_run_time)
        .bind(task.interval.encode())
        .bind(&task.last_result)
        .bind(task.last_run_time)
        .bind(task.execution_count)
        .bind(&task.server_name)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, &task.name))?;

        let id = result.last_insert_rowid();
        debug!("创建定时任务: {} (ID: {})", task.name, id);

        self.get_by_id(id)
            .await?
            .ok_or(SchedulerError::TaskNotFound { id })
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<ScheduledTask>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_task).transpose()
    }

    async fn get_by_name(&self, name: &str) -> SchedulerResult<Option<ScheduledTask>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE name = ?1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_task).transpose()
    }

    async fn update(&self, task: &ScheduledTask) -> SchedulerResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_tasks
            SET name = ?1, display_name = ?2, task_type = ?3, target = ?4, data = ?5,
                enabled = ?6, next_run_time = ?7, interval = ?8, server_name = ?9, updated_at = ?10
            WHERE id = ?11
            "#,
        )
        .bind(&task.name)
        .bind(&task.display_name)
        .bind(&task.task_type)
        .bind(&task.target)
        .bind(&task.data)
        .bind(task.enabled)
        .bind(task.next_run_time)
        .bind(task.interval.encode())
        .bind(&task.server_name)
        .bind(Utc::now())
        .bind(task.id)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, &task.name))?;

        if result.rows_affected() == 0 {
            return Err(SchedulerError::TaskNotFound { id: task.id });
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> SchedulerResult<()> {
        let result = sqlx::query("DELETE FROM scheduled_tasks WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SchedulerError::TaskNotFound { id });
        }
        Ok(())
    }

    async fn list(&self, filter: &ScheduledTaskFilter) -> SchedulerResult<Vec<ScheduledTask>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        builder.push(" WHERE 1 = 1");

        if let Some(enabled) = filter.enabled {
            builder.push(" AND enabled = ").push_bind(enabled);
        }
        if let Some(task_type) = &filter.task_type {
            builder.push(" AND task_type = ").push_bind(task_type.clone());
        }
        if let Some(pattern) = &filter.name_pattern {
            builder
                .push(" AND name LIKE ")
                .push_bind(format!("%{pattern}%"));
        }

        builder.push(" ORDER BY id ASC");
        builder
            .push(" LIMIT ")
            .push_bind(filter.limit.unwrap_or(-1))
            .push(" OFFSET ")
            .push_bind(filter.offset.unwrap_or(0));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn get_due_tasks(
        &self,
        now: DateTime<Utc>,
        server_name: &str,
        limit: i64,
    ) -> SchedulerResult<Vec<ScheduledTask>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS}
             WHERE enabled = 1
               AND next_run_time IS NOT NULL
               AND next_run_time <= ?1
               AND (status = 'IDLE' OR lease_expires_at IS NULL OR lease_expires_at <= ?1)
               AND (server_name IS NULL OR server_name = ?2 COLLATE NOCASE)
             ORDER BY next_run_time ASC
             LIMIT ?3"
        ))
        .bind(now)
        .bind(server_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_task).collect()
    }

    async fn count_due_tasks(&self, now: DateTime<Utc>) -> SchedulerResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scheduled_tasks
             WHERE enabled = 1 AND next_run_time IS NOT NULL AND next_run_time <= ?1",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn try_acquire_due(
        &self,
        id: i64,
        owner: &str,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> SchedulerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_tasks
            SET status = 'RUNNING', lease_owner = ?1, lease_expires_at = ?2, updated_at = ?3
            WHERE id = ?4
              AND enabled = 1
              AND next_run_time IS NOT NULL
              AND next_run_time <= ?3
              AND (status = 'IDLE' OR lease_expires_at IS NULL OR lease_expires_at <= ?3)
            "#,
        )
        .bind(owner)
        .bind(lease_until)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        let acquired = result.rows_affected() == 1;
        debug!("获取到期任务 {} 的执行租约: owner={}, acquired={}", id, owner, acquired);
        Ok(acquired)
    }

    async fn try_acquire(
        &self,
        id: i64,
        owner: &str,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> SchedulerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_tasks
            SET status = 'RUNNING', lease_owner = ?1, lease_expires_at = ?2, updated_at = ?3
            WHERE id = ?4
              AND (status = 'IDLE' OR lease_expires_at IS NULL OR lease_expires_at <= ?3)
            "#,
        )
        .bind(owner)
        .bind(lease_until)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        let acquired = result.rows_affected() == 1;
        debug!("获取任务 {} 的执行租约: owner={}, acquired={}", id, owner, acquired);
        Ok(acquired)
    }

    async fn complete_run(
        &self,
        id: i64,
        owner: &str,
        update: &ScheduledTaskRunUpdate,
    ) -> SchedulerResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_tasks
            SET status = 'IDLE',
                lease_owner = NULL,
                lease_expires_at = NULL,
                next_run_time = ?1,
                last_result = ?2,
                last_run_time = ?3,
                enabled = CASE WHEN ?4 THEN 0 ELSE enabled END,
                execution_count = execution_count + 1,
                updated_at = ?3
            WHERE id = ?5 AND lease_owner = ?6
            "#,
        )
        .bind(update.next_run_time)
        .bind(&update.last_result)
        .bind(update.last_run_time)
        .bind(update.disable)
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn reset_corrupted(&self, owner: &str, now: DateTime<Utc>) -> SchedulerResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE scheduled_tasks
            SET status = 'IDLE', lease_owner = NULL, lease_expires_at = NULL, updated_at = ?2
            WHERE status = 'RUNNING'
              AND (lease_owner IS NULL OR lease_owner = ?1
                   OR lease_expires_at IS NULL OR lease_expires_at <= ?2)
            "#,
        )
        .bind(owner)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use webfarm_core::{traits::ContactStore, SchedulerResult};

pub struct SqliteContactStore {
    pool: SqlitePool,
}

impl SqliteContactStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 登记一个联系人，返回其ID
    pub async fn insert(
        &self,
        email: &str,
        last_activity_at: DateTime<Utc>,
    ) -> SchedulerResult<i64> {
        let result = sqlx::query("INSERT INTO contacts (email, last_activity_at) VALUES (?1, ?2)")
            .bind(email)
            .bind(last_activity_at)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl ContactStore for SqliteContactStore {
    async fn count_inactive(&self, inactive_since: DateTime<Utc>) -> SchedulerResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE last_activity_at < ?1")
                .bind(inactive_since)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }

    async fn delete_inactive(
        &self,
        inactive_since: DateTime<Utc>,
        batch_size: u64,
    ) -> SchedulerResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM contacts
            WHERE id IN (
                SELECT id FROM contacts
                WHERE last_activity_at < ?1
                ORDER BY last_activity_at ASC
                LIMIT ?2
            )
            "#,
        )
        .bind(inactive_since)
        .bind(batch_size as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

//! Notification sink writing to the `notifications` table.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::ports::NotificationSink;

#[derive(Clone)]
pub struct PostgresNotificationSink {
    pool: PgPool,
}

impl PostgresNotificationSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for PostgresNotificationSink {
    async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        kind: &str,
    ) -> anyhow::Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, message, type, is_read, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(kind)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id = %user_id, kind, "Notification stored");
        Ok(())
    }
}

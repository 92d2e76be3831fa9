// Audit trail written to the system_logs table; feeds the activity and health dashboards.

use crate::models::system_log::NewSystemLog;
use sqlx::PgPool;
use uuid::Uuid;

pub struct SystemLogService;

impl SystemLogService {
    pub async fn record(pool: &PgPool, entry: &NewSystemLog) -> Result<Uuid, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO system_logs (
                id, level, category, message, user_id,
                ip, user_agent, endpoint, response_time_ms, error_code
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(entry.level)
        .bind(entry.category)
        .bind(&entry.message)
        .bind(entry.user_id)
        .bind(&entry.metadata.ip)
        .bind(&entry.metadata.user_agent)
        .bind(&entry.metadata.endpoint)
        .bind(entry.metadata.response_time_ms)
        .bind(&entry.metadata.error_code)
        .execute(pool)
        .await?;

        tracing::debug!(
            log_id = %id,
            level = %entry.level,
            category = %entry.category,
            "recorded system log"
        );
        Ok(id)
    }

    /// Writes the entry in the background; a failed write is only traced.
    pub fn record_detached(pool: &PgPool, entry: NewSystemLog) {
        let pool = pool.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::record(&pool, &entry).await {
                tracing::warn!(
                    category = %entry.category,
                    message = %entry.message,
                    "failed to record system log: {}",
                    e
                );
            }
        });
    }
}

//! Print logs repository

use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::{error::AppResult, models::print_log::PrintLog};

#[derive(Clone)]
pub struct PrintLogsRepository {
    pool: Pool<Sqlite>,
}

impl PrintLogsRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Record a successful print. Entries are never updated afterwards.
    pub async fn create(&self, badge_id: i64) -> AppResult<PrintLog> {
        let row = sqlx::query_as::<_, PrintLog>(
            "INSERT INTO print_logs (badge_id, printed_at) VALUES (?, ?) RETURNING *",
        )
        .bind(badge_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM print_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_for_badge(&self, badge_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM print_logs WHERE badge_id = ?")
            .bind(badge_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

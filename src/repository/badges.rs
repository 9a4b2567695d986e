//! Badges repository

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use crate::{
    error::{AppError, AppResult},
    models::badge::{BadgeRow, CreateBadge, UpdateBadge},
};

#[derive(Clone)]
pub struct BadgesRepository {
    pool: Pool<Sqlite>,
}

impl BadgesRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// All badges, oldest first
    pub async fn list(&self) -> AppResult<Vec<BadgeRow>> {
        let rows = sqlx::query_as::<_, BadgeRow>("SELECT * FROM badges ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Substring search over names and id
    pub async fn search(&self, needle: &str) -> AppResult<Vec<BadgeRow>> {
        let pattern = format!("%{}%", escape_like(needle));
        let rows = sqlx::query_as::<_, BadgeRow>(
            r#"
            SELECT * FROM badges
            WHERE last_name LIKE ?1 ESCAPE '\'
               OR first_name LIKE ?1 ESCAPE '\'
               OR CAST(id AS TEXT) LIKE ?1 ESCAPE '\'
            ORDER BY id ASC
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<BadgeRow>> {
        let row = sqlx::query_as::<_, BadgeRow>("SELECT * FROM badges WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<BadgeRow> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Badge {} not found", id)))
    }

    /// Exact, case-insensitive lookup by (last name, first name)
    pub async fn find_by_name(&self, last_name: &str, first_name: &str) -> AppResult<Option<BadgeRow>> {
        let row = sqlx::query_as::<_, BadgeRow>(
            r#"
            SELECT * FROM badges
            WHERE LOWER(last_name) = LOWER(?) AND LOWER(first_name) = LOWER(?)
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(last_name)
        .bind(first_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create(&self, data: &CreateBadge) -> AppResult<BadgeRow> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, BadgeRow>(
            r#"
            INSERT INTO badges (last_name, first_name, validated, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&data.last_name)
        .bind(&data.first_name)
        .bind(data.validated)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update the provided fields and bump `updated_at`
    pub async fn update(&self, id: i64, data: &UpdateBadge) -> AppResult<BadgeRow> {
        let mut sets = vec!["updated_at = ?"];

        macro_rules! add_field {
            ($field:expr, $set:expr) => {
                if $field.is_some() {
                    sets.push($set);
                }
            };
        }

        add_field!(data.last_name, "last_name = ?");
        add_field!(data.first_name, "first_name = ?");
        add_field!(data.validated, "validated = ?");

        let query = format!("UPDATE badges SET {} WHERE id = ? RETURNING *", sets.join(", "));

        let mut builder = sqlx::query_as::<_, BadgeRow>(&query).bind(Utc::now());

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.last_name);
        bind_field!(data.first_name);
        bind_field!(data.validated);

        builder
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Badge {} not found", id)))
    }

    pub async fn set_validated(&self, id: i64, validated: bool) -> AppResult<BadgeRow> {
        sqlx::query_as::<_, BadgeRow>(
            "UPDATE badges SET validated = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(validated)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Badge {} not found", id)))
    }

    /// Delete a badge together with its print history
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM print_logs WHERE badge_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM badges WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Badge {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM badges")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_validated(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM badges WHERE validated = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_created_since(&self, since: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM badges WHERE created_at >= ?")
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Escape LIKE wildcards so user input only matches literally
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

//! Repository layer for database operations

pub mod badges;
pub mod print_logs;

use sqlx::{Pool, Sqlite};

use crate::error::AppResult;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Sqlite>,
    pub badges: badges::BadgesRepository,
    pub print_logs: print_logs::PrintLogsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            badges: badges::BadgesRepository::new(pool.clone()),
            print_logs: print_logs::PrintLogsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the store, used by the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

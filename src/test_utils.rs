//! Shared test utilities.
//!
//! Helpers for setting up an in-memory store and seeding badges with
//! sensible defaults.

use sqlx::sqlite::SqlitePoolOptions;

use crate::{
    models::badge::{BadgeRow, CreateBadge},
    repository::Repository,
};

/// In-memory SQLite store with migrations applied.
///
/// A single connection is kept alive for the whole test, otherwise each
/// pooled connection would see its own empty database.
pub async fn setup_test_repository() -> Repository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    Repository::new(pool)
}

/// Insert a local badge
pub async fn create_test_badge(
    repo: &Repository,
    last_name: &str,
    first_name: &str,
    validated: bool,
) -> BadgeRow {
    repo.badges
        .create(&CreateBadge::new(last_name, first_name, validated))
        .await
        .expect("create badge")
}

//! Print log model

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// One successful print of a local badge
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PrintLog {
    pub id: i64,
    pub badge_id: i64,
    pub printed_at: DateTime<Utc>,
}

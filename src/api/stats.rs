//! Statistics endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, AppState};

/// Statistics response
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Local badges
    pub total_badges: i64,
    pub validated_badges: i64,
    pub non_validated_badges: i64,
    /// Successful prints still on record
    pub total_prints: i64,
    /// Local badges created in the last 24 hours
    pub recent_badges_24h: i64,
}

/// Get badge and print statistics
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Statistics", body = StatsResponse)
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let stats = state.services.stats.get_stats().await?;
    Ok(Json(stats))
}

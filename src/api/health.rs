//! Liveness and readiness probes

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, AppState};

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// What the badge desk depends on, as seen at readiness time
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    /// Badge store answered a ping
    pub database: String,
    /// `truetype` or `builtin`
    pub label_font: String,
    /// Printer model labels are sent to
    pub printer_model: String,
}

/// The process is up
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Process is up", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// The badge store answers and labels can be composed.
///
/// A missing TrueType font does not make the service unready.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready to serve badges", body = ReadinessResponse),
        (status = 500, description = "Badge store unreachable", body = crate::error::ErrorResponse)
    )
)]
pub async fn readiness_check(State(state): State<AppState>) -> AppResult<Json<ReadinessResponse>> {
    state.services.ping().await?;

    let label_font = if state.services.printing.has_truetype_font() {
        "truetype"
    } else {
        "builtin"
    };

    Ok(Json(ReadinessResponse {
        status: "ready".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        database: "ok".into(),
        label_font: label_font.into(),
        printer_model: state.config.printer.model.clone(),
    }))
}

//! Printing endpoints

use axum::{extract::State, http::StatusCode, response::Response, Json};

use crate::{
    error::AppResult,
    models::badge::BadgePayload,
    services::printing::{PrintOutcome, PrinterDetection},
    AppState,
};

use super::file_response;

/// Compose and print a badge label.
///
/// Without an `id` a validated badge is created first.
#[utoipa::path(
    post,
    path = "/print-label",
    tag = "printing",
    request_body = BadgePayload,
    responses(
        (status = 200, description = "Label printed", body = PrintOutcome),
        (status = 400, description = "Missing name", body = crate::error::ErrorResponse),
        (status = 503, description = "Printer unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn print_label(
    State(state): State<AppState>,
    Json(payload): Json<BadgePayload>,
) -> AppResult<Json<PrintOutcome>> {
    let outcome = state.services.printing.print_label(payload).await?;
    Ok(Json(outcome))
}

/// Render the label as PNG without printing
#[utoipa::path(
    post,
    path = "/api/label-preview",
    tag = "printing",
    request_body = BadgePayload,
    responses(
        (status = 200, description = "Label image (image/png)"),
        (status = 400, description = "Missing name", body = crate::error::ErrorResponse)
    )
)]
pub async fn label_preview(
    State(state): State<AppState>,
    Json(payload): Json<BadgePayload>,
) -> AppResult<Response> {
    let file_name = format!(
        "badge_{}_{}.png",
        payload.first_name().unwrap_or_default(),
        payload.last_name().unwrap_or_default()
    );
    let png = state.services.printing.preview(payload).await?;
    Ok(file_response("image/png", "inline", &file_name, png))
}

/// Detect Brother printers on the USB bus
#[utoipa::path(
    get,
    path = "/api/printer/detect",
    tag = "printing",
    responses(
        (status = 200, description = "Printers found", body = PrinterDetection),
        (status = 404, description = "No printer found", body = PrinterDetection)
    )
)]
pub async fn detect_printers(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<PrinterDetection>)> {
    let detection = state.services.printing.detect_printers().await?;
    let status = if detection.printers.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    Ok((status, Json(detection)))
}

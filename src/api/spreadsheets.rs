//! Spreadsheet import/export endpoints

use axum::{extract::State, response::Response, Json};
use axum_extra::extract::Multipart;

use crate::{
    error::{AppError, AppResult},
    models::ImportReport,
    services::spreadsheet::XLSX_CONTENT_TYPE,
    AppState,
};

use super::file_response;

/// Multipart form of `/api/import-excel`
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ImportUpload {
    /// `.xlsx` or `.xls` workbook
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Import badges from an uploaded workbook (multipart field `file`)
#[utoipa::path(
    post,
    path = "/api/import-excel",
    tag = "spreadsheets",
    request_body(content = ImportUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Import report", body = ImportReport),
        (status = 400, description = "Missing or invalid file", body = crate::error::ErrorResponse)
    )
)]
pub async fn import_excel(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<ImportReport>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Could not read upload: {}", e)))?;

        let report = state.services.spreadsheets.import(&file_name, bytes.to_vec()).await?;
        return Ok(Json(report));
    }

    Err(AppError::Validation("No file provided".to_string()))
}

/// Export local badges as a workbook
#[utoipa::path(
    get,
    path = "/api/export-excel",
    tag = "spreadsheets",
    responses(
        (status = 200, description = "Workbook")
    )
)]
pub async fn export_excel(State(state): State<AppState>) -> AppResult<Response> {
    let file = state.services.spreadsheets.export().await?;
    Ok(file_response(XLSX_CONTENT_TYPE, "attachment", &file.file_name, file.bytes))
}

/// Download the import template
#[utoipa::path(
    get,
    path = "/api/import-excel-template",
    tag = "spreadsheets",
    responses(
        (status = 200, description = "Template workbook")
    )
)]
pub async fn download_template(State(state): State<AppState>) -> AppResult<Response> {
    let file = state.services.spreadsheets.template()?;
    Ok(file_response(XLSX_CONTENT_TYPE, "attachment", &file.file_name, file.bytes))
}

//! Badge endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        badge::{BadgePayload, BadgeQuery, ValidateBadge},
        Badge, BadgeFilter, BulkImportReport,
    },
    AppState,
};

use super::MessageResponse;

/// Search query
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Substring of a name or id
    pub q: Option<String>,
}

/// Bulk import request
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkImportRequest {
    /// Objects carrying `nom`/`prenom` (or `last_name`/`first_name`)
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub users: Vec<Value>,
}

/// Response of `/user_data`
#[derive(Serialize, ToSchema)]
pub struct UserDataResponse {
    pub message: String,
    pub id: i64,
}

/// List badges from the local store and both external sources
#[utoipa::path(
    get,
    path = "/api/getbadges",
    tag = "badges",
    params(BadgeQuery),
    responses(
        (status = 200, description = "Local, source A then source B badges", body = Vec<Badge>)
    )
)]
pub async fn list_badges(
    State(state): State<AppState>,
    Query(query): Query<BadgeQuery>,
) -> AppResult<Json<Vec<Badge>>> {
    let filter = BadgeFilter::from(query);
    let badges = state.services.badges.list_badges(&filter).await?;
    Ok(Json(badges))
}

/// Get a badge by ID, looking in source A when it is not local
#[utoipa::path(
    get,
    path = "/api/getbadges/{id}",
    tag = "badges",
    params(("id" = String, Path, description = "Badge ID")),
    responses(
        (status = 200, description = "Badge details", body = Badge),
        (status = 404, description = "Badge not found locally nor in source A", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_badge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Badge>> {
    let badge = state.services.badges.get_badge(&id).await?;
    Ok(Json(badge))
}

/// Create badge
#[utoipa::path(
    post,
    path = "/api/badges",
    tag = "badges",
    request_body = BadgePayload,
    responses(
        (status = 201, description = "Badge created", body = Badge),
        (status = 400, description = "Missing name", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_badge(
    State(state): State<AppState>,
    Json(payload): Json<BadgePayload>,
) -> AppResult<(StatusCode, Json<Badge>)> {
    let badge = state.services.badges.create(payload).await?;
    Ok((StatusCode::CREATED, Json(badge)))
}

/// Update badge names and/or validation flag
#[utoipa::path(
    put,
    path = "/api/badges/{id}",
    tag = "badges",
    params(("id" = i64, Path, description = "Badge ID")),
    request_body = BadgePayload,
    responses(
        (status = 200, description = "Badge updated", body = Badge),
        (status = 404, description = "Badge not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<BadgePayload>,
) -> AppResult<Json<Badge>> {
    let badge = state.services.badges.update(id, payload).await?;
    Ok(Json(badge))
}

/// Delete badge and its print history
#[utoipa::path(
    delete,
    path = "/api/badges/{id}",
    tag = "badges",
    params(("id" = i64, Path, description = "Badge ID")),
    responses(
        (status = 200, description = "Badge deleted", body = MessageResponse),
        (status = 404, description = "Badge not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    state.services.badges.delete(id).await?;
    Ok(Json(MessageResponse::new("Badge deleted successfully")))
}

/// Set the validation flag (1 when the body is omitted)
#[utoipa::path(
    post,
    path = "/api/validate/{id}",
    tag = "badges",
    params(("id" = i64, Path, description = "Badge ID")),
    request_body(content = ValidateBadge, description = "Optional, defaults to valide = 1"),
    responses(
        (status = 200, description = "Badge validation updated", body = Badge),
        (status = 404, description = "Badge not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn validate_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<ValidateBadge>>,
) -> AppResult<Json<Badge>> {
    let validated = body.and_then(|Json(body)| body.valide);
    let badge = state.services.badges.validate(id, validated).await?;
    Ok(Json(badge))
}

/// Search local badges
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "badges",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching local badges", body = Vec<Badge>),
        (status = 400, description = "Missing q", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_badges(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Badge>>> {
    let badges = state.services.badges.search(query.q.as_deref()).await?;
    Ok(Json(badges))
}

/// Register a validated badge from the front desk
#[utoipa::path(
    post,
    path = "/user_data",
    tag = "badges",
    request_body = BadgePayload,
    responses(
        (status = 201, description = "Badge created", body = UserDataResponse),
        (status = 400, description = "Missing name", body = crate::error::ErrorResponse)
    )
)]
pub async fn user_data(
    State(state): State<AppState>,
    Json(payload): Json<BadgePayload>,
) -> AppResult<(StatusCode, Json<UserDataResponse>)> {
    let badge = state.services.badges.add_user_data(payload).await?;
    let id = badge.id.and_then(|id| id.as_local()).unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        Json(UserDataResponse {
            message: "User data added successfully".to_string(),
            id,
        }),
    ))
}

/// Insert badges from a JSON list
#[utoipa::path(
    post,
    path = "/api/bulk-import",
    tag = "badges",
    request_body = BulkImportRequest,
    responses(
        (status = 201, description = "Import report", body = BulkImportReport),
        (status = 400, description = "Empty users list", body = crate::error::ErrorResponse)
    )
)]
pub async fn bulk_import(
    State(state): State<AppState>,
    Json(request): Json<BulkImportRequest>,
) -> AppResult<(StatusCode, Json<BulkImportReport>)> {
    let report = state.services.badges.bulk_import(&request.users).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

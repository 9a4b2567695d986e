//! HTTP API handlers for the badge server

pub mod badges;
pub mod health;
pub mod info;
pub mod openapi;
pub mod printing;
pub mod spreadsheets;
pub mod stats;

use axum::{
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{config::CorsConfig, AppState};

/// Plain confirmation message
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Binary body with a content type and a download file name
pub(crate) fn file_response(
    content_type: &'static str,
    disposition: &str,
    file_name: &str,
    bytes: Vec<u8>,
) -> Response {
    let disposition = format!("{}; filename=\"{}\"", disposition, file_name.replace('"', ""));
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    match config.origin_list() {
        None => cors.allow_origin(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            cors.allow_origin(AllowOrigin::list(origins))
        }
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    let routes = Router::new()
        // Service info and health
        .route("/", get(info::index))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/api/config", get(info::get_config))
        // Badges
        .route("/api/getbadges", get(badges::list_badges))
        .route("/api/getbadges/:id", get(badges::get_badge))
        .route("/api/badges", post(badges::create_badge))
        .route("/api/badges/:id", put(badges::update_badge).delete(badges::delete_badge))
        .route("/api/validate/:id", post(badges::validate_badge))
        .route("/api/search", get(badges::search_badges))
        .route("/user_data", post(badges::user_data))
        .route("/api/bulk-import", post(badges::bulk_import))
        // Statistics
        .route("/api/stats", get(stats::get_stats))
        // Printing
        .route("/print-label", post(printing::print_label))
        .route("/api/label-preview", post(printing::label_preview))
        .route("/api/printer/detect", get(printing::detect_printers))
        // Spreadsheets
        .route("/api/import-excel", post(spreadsheets::import_excel))
        .route("/api/export-excel", get(spreadsheets::export_excel))
        .route("/api/import-excel-template", get(spreadsheets::download_template))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        config::AppConfig,
        services::Services,
        repository::Repository,
        test_utils::{create_test_badge, setup_test_repository},
    };

    /// Router over an in-memory store. External sources point at a closed port.
    async fn test_app() -> (Router, Repository) {
        let repository = setup_test_repository().await;

        let mut config = AppConfig::default();
        config.external.badges_url = "http://127.0.0.1:9/badges".to_string();
        config.external.principaux_url = "http://127.0.0.1:9/principaux".to_string();
        config.external.timeout_secs = 1;
        config.printer.command = "/nonexistent/brother_ql".to_string();
        config.printer.usb_devices_path = "/nonexistent/usb".to_string();

        let services = Services::new(repository.clone(), &config).unwrap();
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        };
        (create_router(state), repository)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app().await;
        let (status, body) = send_json(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send_json(&app, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert_eq!(body["database"], "ok");
        assert!(body["label_font"] == "truetype" || body["label_font"] == "builtin");
        assert_eq!(body["printer_model"], AppConfig::default().printer.model);
    }

    #[tokio::test]
    async fn test_listing_survives_unreachable_sources() {
        let (app, repo) = test_app().await;
        create_test_badge(&repo, "Amrani", "Ali", true).await;
        create_test_badge(&repo, "Alioua", "Sara", false).await;

        let (status, body) = send_json(&app, "GET", "/api/getbadges?valide=1", None).await;
        assert_eq!(status, StatusCode::OK);
        let badges = body.as_array().unwrap();
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0]["prenom"], "Ali");
        assert_eq!(badges[0]["source"], "local");

        let (status, body) = send_json(&app, "GET", "/api/getbadges?search=ALI&source=local", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_listing_query_is_lenient() {
        let (app, repo) = test_app().await;
        create_test_badge(&repo, "Amrani", "Ali", true).await;
        create_test_badge(&repo, "Alioua", "Sara", false).await;

        let (status, body) = send_json(&app, "GET", "/api/getbadges?source=elsewhere", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) = send_json(&app, "GET", "/api/getbadges?valide=maybe&source=local", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_badge_with_unreachable_source_a_is_404() {
        let (app, _) = test_app().await;

        let (status, body) = send_json(&app, "GET", "/api/getbadges/424242", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NoSuchBadge");

        let (status, _) = send_json(&app, "GET", "/api/getbadges/..%2F..%2Fadmin%2Fwipe%3Fall=1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_with_blank_names_is_rejected() {
        let (app, repo) = test_app().await;
        let row = create_test_badge(&repo, "Tazi", "Omar", false).await;

        let (status, body) = send_json(
            &app,
            "PUT",
            &format!("/api/badges/{}", row.id),
            Some(json!({ "nom": "", "prenom": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 4);
    }

    #[tokio::test]
    async fn test_badge_crud() {
        let (app, _) = test_app().await;

        let (status, created) =
            send_json(&app, "POST", "/api/badges", Some(json!({ "nom": "Tazi", "prenom": "Omar" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["valide"], 0);
        let id = created["id"].as_i64().unwrap();

        let (status, updated) = send_json(
            &app,
            "PUT",
            &format!("/api/badges/{}", id),
            Some(json!({ "prenom": "Omari" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["prenom"], "Omari");
        assert_eq!(updated["nom"], "Tazi");

        let (status, validated) = send_json(&app, "POST", &format!("/api/validate/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(validated["valide"], 1);

        let (status, fetched) = send_json(&app, "GET", &format!("/api/getbadges/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["prenom"], "Omari");

        let (status, body) = send_json(&app, "DELETE", &format!("/api/badges/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Badge deleted successfully");

        let (status, body) = send_json(&app, "DELETE", &format!("/api/badges/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NoSuchBadge");
    }

    #[tokio::test]
    async fn test_create_requires_names() {
        let (app, _) = test_app().await;
        let (status, body) = send_json(&app, "POST", "/api/badges", Some(json!({ "nom": "Tazi" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 4);
    }

    #[tokio::test]
    async fn test_search_requires_q() {
        let (app, repo) = test_app().await;
        create_test_badge(&repo, "Tazi", "Omar", false).await;

        let (status, _) = send_json(&app, "GET", "/api/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(&app, "GET", "/api/search?q=oma", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_data_and_stats() {
        let (app, _) = test_app().await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/user_data",
            Some(json!({ "last_name": "Amrani", "first_name": "Ali" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User data added successfully");

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/bulk-import",
            Some(json!({ "users": [{ "nom": "Tazi", "prenom": "Omar" }, { "nom": "" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["imported"], 1);

        let (status, stats) = send_json(&app, "GET", "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_badges"], 2);
        assert_eq!(stats["validated_badges"], 1);
        assert_eq!(stats["non_validated_badges"], 1);
        assert_eq!(stats["total_prints"], 0);
    }

    #[tokio::test]
    async fn test_print_without_driver_is_unavailable() {
        let (app, repo) = test_app().await;

        let (status, body) = send_json(
            &app,
            "POST",
            "/print-label",
            Some(json!({ "nom": "Tazi", "prenom": "Omar" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["message"].as_str().unwrap().contains("Troubleshooting"));
        // badge created before the print attempt
        assert_eq!(repo.badges.count().await.unwrap(), 1);
        assert_eq!(repo.print_logs.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_label_preview_returns_png() {
        let (app, _) = test_app().await;
        let (status, bytes) = send(
            &app,
            "POST",
            "/api/label-preview",
            Some(json!({ "last_name": "Tazi", "first_name": "Omar" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_detect_without_printers() {
        let (app, _) = test_app().await;
        let (status, body) = send_json(&app, "GET", "/api/printer/detect", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "warning");
        assert_eq!(body["current_config"], "usb://0x04f9:0x209c");
    }

    #[tokio::test]
    async fn test_export_and_template_downloads() {
        let (app, repo) = test_app().await;
        create_test_badge(&repo, "Tazi", "Omar", true).await;

        for uri in ["/api/export-excel", "/api/import-excel-template"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                crate::services::spreadsheet::XLSX_CONTENT_TYPE
            );
            let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
            assert!(disposition.starts_with("attachment; filename=\"badges_"));
        }
    }

    #[tokio::test]
    async fn test_import_excel_multipart() {
        let (app, repo) = test_app().await;
        let workbook = crate::services::spreadsheet::template_workbook().unwrap();

        let boundary = "badge-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"badges.xlsx\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                b = boundary
            )
            .as_bytes(),
        );
        body.extend_from_slice(&workbook);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/import-excel")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let report: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report["status"], "success");
        assert_eq!(report["imported"], 3);
        assert_eq!(repo.badges.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_import_excel_without_file() {
        let (app, _) = test_app().await;
        let boundary = "badge-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/import-excel")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let (app, _) = test_app().await;
        let (status, body) = send_json(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["endpoints"]["GET /api/getbadges"].is_string());

        let (status, body) = send_json(&app, "GET", "/api/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["printer"]["identifier"], "usb://0x04f9:0x209c");
        assert_eq!(body["label"]["size"], "29x90");
    }
}

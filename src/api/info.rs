//! Service information endpoints

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

const ENDPOINTS: &[(&str, &str)] = &[
    ("GET /api/getbadges", "Get all badges (local + external)"),
    ("GET /api/getbadges/<id>", "Get badge by ID"),
    ("POST /api/badges", "Create new badge"),
    ("PUT /api/badges/<id>", "Update badge"),
    ("DELETE /api/badges/<id>", "Delete badge"),
    ("POST /api/validate/<id>", "Validate badge"),
    ("GET /api/search", "Search badges"),
    ("POST /user_data", "Add user data"),
    ("POST /api/bulk-import", "Bulk import"),
    ("POST /print-label", "Print badge to Brother QL printer"),
    ("POST /api/label-preview", "Render badge label as PNG"),
    ("GET /api/printer/detect", "Detect connected printers"),
    ("GET /api/stats", "Get statistics"),
    ("POST /api/import-excel", "Import badges from Excel file"),
    ("GET /api/export-excel", "Export badges to Excel file"),
    ("GET /api/import-excel-template", "Download Excel import template"),
    ("GET /api/config", "Get current configuration"),
];

#[derive(Serialize, ToSchema)]
pub struct PrinterInfo {
    pub model: String,
    pub identifier: String,
    pub backend: String,
    pub label_size: String,
}

#[derive(Serialize, ToSchema)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub platform: String,
    pub printer: PrinterInfo,
    /// Route to description
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Serialize, ToSchema)]
pub struct PrinterSettings {
    pub model: String,
    pub backend: String,
    pub identifier: String,
    pub vendor_id: String,
    pub product_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct LabelSettings {
    pub size: String,
    pub rotate: String,
    pub cut: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Configuration as exposed to the front-end
#[derive(Serialize, ToSchema)]
pub struct ConfigView {
    pub database: String,
    pub external_api: String,
    pub external_principaux: String,
    pub printer: PrinterSettings,
    pub label: LabelSettings,
    pub server: ServerSettings,
}

/// Service information
#[utoipa::path(
    get,
    path = "/",
    tag = "info",
    responses(
        (status = 200, description = "Service name, version and endpoints", body = ServiceInfo)
    )
)]
pub async fn index(State(state): State<AppState>) -> Json<ServiceInfo> {
    let printer = &state.config.printer;

    Json(ServiceInfo {
        name: "Badge Management API with Brother QL Printer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        platform: if cfg!(windows) { "Windows" } else { "Linux/Unix" }.to_string(),
        printer: PrinterInfo {
            model: printer.model.clone(),
            identifier: printer.identifier(),
            backend: printer.backend.clone(),
            label_size: state.config.label.size.clone(),
        },
        endpoints: ENDPOINTS
            .iter()
            .map(|(route, description)| (route.to_string(), description.to_string()))
            .collect(),
    })
}

/// Current configuration
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "info",
    responses(
        (status = 200, description = "Current configuration", body = ConfigView)
    )
)]
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigView> {
    let config = &state.config;

    Json(ConfigView {
        database: config.database.url.clone(),
        external_api: config.external.badges_url.clone(),
        external_principaux: config.external.principaux_url.clone(),
        printer: PrinterSettings {
            model: config.printer.model.clone(),
            backend: config.printer.backend.clone(),
            identifier: config.printer.identifier(),
            vendor_id: config.printer.usb_vendor_id.clone(),
            product_id: config.printer.usb_product_id.clone(),
        },
        label: LabelSettings {
            size: config.label.size.clone(),
            rotate: config.label.rotate.clone(),
            cut: config.label.cut,
        },
        server: ServerSettings {
            host: config.server.host.clone(),
            port: config.server.port,
        },
    })
}

//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{badges, health, info, printing, spreadsheets, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Badge Server API",
        version = "3.0.0",
        description = "Badge management REST API with Brother QL label printing",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Info
        info::index,
        info::get_config,
        // Health
        health::health_check,
        health::readiness_check,
        // Badges
        badges::list_badges,
        badges::get_badge,
        badges::create_badge,
        badges::update_badge,
        badges::delete_badge,
        badges::validate_badge,
        badges::search_badges,
        badges::user_data,
        badges::bulk_import,
        // Stats
        stats::get_stats,
        // Printing
        printing::print_label,
        printing::label_preview,
        printing::detect_printers,
        // Spreadsheets
        spreadsheets::import_excel,
        spreadsheets::export_excel,
        spreadsheets::download_template,
    ),
    components(
        schemas(
            // Badges
            crate::models::Badge,
            crate::models::BadgeId,
            crate::models::BadgeSource,
            crate::models::SourceScope,
            crate::models::badge::BadgePayload,
            crate::models::badge::ValidateBadge,
            crate::models::BulkImportReport,
            crate::models::ImportReport,
            badges::BulkImportRequest,
            badges::UserDataResponse,
            crate::api::MessageResponse,
            spreadsheets::ImportUpload,
            // Stats
            stats::StatsResponse,
            // Printing
            crate::services::printing::PrintOutcome,
            crate::services::printing::PrinterDetection,
            // Info
            info::ServiceInfo,
            info::PrinterInfo,
            info::ConfigView,
            info::PrinterSettings,
            info::LabelSettings,
            info::ServerSettings,
            // Health
            health::HealthResponse,
            health::ReadinessResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "info", description = "Service information"),
        (name = "health", description = "Health check endpoints"),
        (name = "badges", description = "Badge management"),
        (name = "stats", description = "Statistics"),
        (name = "printing", description = "Label printing"),
        (name = "spreadsheets", description = "Excel import and export")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

//! Import report models for spreadsheet and JSON bulk imports.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of a spreadsheet import
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ImportReport {
    pub status: String,
    /// New badges inserted
    pub imported: usize,
    /// Rows that were blank or matched an existing badge
    pub skipped: usize,
    pub total_processed: usize,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
}

impl ImportReport {
    pub fn finish(imported: usize, skipped: usize, errors: Vec<String>) -> Self {
        let error_count = (!errors.is_empty()).then_some(errors.len());
        Self {
            status: "success".to_string(),
            imported,
            skipped,
            total_processed: imported + skipped,
            message: format!(
                "Import completed: {} new badges imported, {} skipped (already exist or empty)",
                imported, skipped
            ),
            errors,
            error_count,
        }
    }
}

/// Outcome of a JSON bulk import
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct BulkImportReport {
    pub message: String,
    pub imported: usize,
    pub errors: Vec<String>,
}

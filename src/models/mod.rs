//! Data models for the badge server

pub mod badge;
pub mod import_report;
pub mod print_log;

// Re-export commonly used types
pub use badge::{Badge, BadgeFilter, BadgeId, BadgeSource, SourceScope};
pub use import_report::{BulkImportReport, ImportReport};
pub use print_log::PrintLog;

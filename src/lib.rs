//! Badge Server
//!
//! REST service managing event badges: a local store merged with two
//! external registries, spreadsheet import/export and label printing on
//! Brother QL printers.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod label;
pub mod models;
pub mod repository;
pub mod services;

#[cfg(test)]
pub mod test_utils;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

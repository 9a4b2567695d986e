//! Business logic services

pub mod badges;
pub mod external;
pub mod printing;
pub mod spreadsheet;
pub mod stats;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    error::AppResult,
    label::FontResolver,
    repository::Repository,
};

use external::{HttpBadgeSource, ListingShape};
use printing::BrotherQlCommand;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub badges: badges::BadgeService,
    pub printing: printing::PrintService,
    pub spreadsheets: spreadsheet::SpreadsheetService,
    pub stats: stats::StatsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let external = HttpBadgeSource::new(
            config.external.badges_url.clone(),
            ListingShape::Array,
            config.external.timeout_secs,
        )?;
        let principaux = HttpBadgeSource::new(
            config.external.principaux_url.clone(),
            ListingShape::DataEnvelope,
            config.external.timeout_secs,
        )?;

        let fonts = FontResolver::new(config.label.font_path.as_deref());
        let transport = BrotherQlCommand::new(config.printer.command.clone());

        Ok(Self {
            badges: badges::BadgeService::new(repository.clone(), Arc::new(external), Arc::new(principaux)),
            printing: printing::PrintService::new(
                repository.clone(),
                Arc::new(transport),
                fonts,
                &config.printer,
                &config.label,
            ),
            spreadsheets: spreadsheet::SpreadsheetService::new(repository.clone()),
            stats: stats::StatsService::new(repository.clone()),
            repository,
        })
    }

    /// Check that the store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}

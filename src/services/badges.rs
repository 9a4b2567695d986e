//! Badge service: local CRUD and the merged listing across sources

use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{
        badge::{BadgePayload, CreateBadge, ExternalBadgeRecord},
        Badge, BadgeFilter, BadgeSource, BulkImportReport,
    },
    repository::Repository,
    services::external::ExternalBadgeSource,
};

#[derive(Clone)]
pub struct BadgeService {
    repository: Repository,
    /// Source A
    external: Arc<dyn ExternalBadgeSource>,
    /// Source B
    principaux: Arc<dyn ExternalBadgeSource>,
}

impl BadgeService {
    pub fn new(
        repository: Repository,
        external: Arc<dyn ExternalBadgeSource>,
        principaux: Arc<dyn ExternalBadgeSource>,
    ) -> Self {
        Self {
            repository,
            external,
            principaux,
        }
    }

    /// Local badges, then source A, then source B, each filtered.
    ///
    /// A local store failure fails the listing. An external source that
    /// cannot be reached contributes nothing.
    pub async fn list_badges(&self, filter: &BadgeFilter) -> AppResult<Vec<Badge>> {
        let (local, external, principaux) = tokio::join!(
            self.local_badges(filter),
            self.external_badges(self.external.as_ref(), BadgeSource::External, filter),
            self.external_badges(self.principaux.as_ref(), BadgeSource::ExternalPrincipaux, filter),
        );

        let mut badges = local?;
        badges.extend(external);
        badges.extend(principaux);
        Ok(badges)
    }

    async fn local_badges(&self, filter: &BadgeFilter) -> AppResult<Vec<Badge>> {
        if !filter.scope.includes(BadgeSource::Local) {
            return Ok(Vec::new());
        }

        let rows = self.repository.badges.list().await?;
        Ok(rows
            .into_iter()
            .map(Badge::from)
            .filter(|badge| filter.accepts(badge))
            .collect())
    }

    async fn external_badges(
        &self,
        source: &dyn ExternalBadgeSource,
        tag: BadgeSource,
        filter: &BadgeFilter,
    ) -> Vec<Badge> {
        if !filter.scope.includes(tag) {
            return Vec::new();
        }

        match source.fetch_all().await {
            Ok(records) => records
                .into_iter()
                .map(|record| record.into_badge(tag))
                .filter(|badge| filter.accepts(badge))
                .collect(),
            Err(e) => {
                tracing::warn!("Skipping {} badges: {}", tag, e);
                Vec::new()
            }
        }
    }

    /// Local badge by id, falling back to source A.
    ///
    /// Source A being unreachable is reported as not found.
    pub async fn get_badge(&self, id: &str) -> AppResult<Badge> {
        if let Ok(local_id) = id.trim().parse::<i64>() {
            if let Some(row) = self.repository.badges.find_by_id(local_id).await? {
                return Ok(row.into());
            }
        }

        match self.external.fetch_one(id).await {
            Ok(Some(record)) => return Ok(record.into_badge(BadgeSource::External)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Lookup of badge {} in {} failed: {}", id, BadgeSource::External, e),
        }
        Err(AppError::NotFound(format!("Badge {} not found", id)))
    }

    pub async fn create(&self, payload: BadgePayload) -> AppResult<Badge> {
        let data = payload.into_create(false)?;
        let row = self.repository.badges.create(&data).await?;
        Ok(row.into())
    }

    /// Create an already validated badge, as the registration desk does
    pub async fn add_user_data(&self, payload: BadgePayload) -> AppResult<Badge> {
        let data = payload.into_create(true)?;
        let row = self.repository.badges.create(&data).await?;
        Ok(row.into())
    }

    pub async fn update(&self, id: i64, payload: BadgePayload) -> AppResult<Badge> {
        let data = payload.into_update()?;
        let row = self.repository.badges.update(id, &data).await?;
        Ok(row.into())
    }

    /// Set the validation flag, `true` when not given
    pub async fn validate(&self, id: i64, validated: Option<bool>) -> AppResult<Badge> {
        let row = self
            .repository
            .badges
            .set_validated(id, validated.unwrap_or(true))
            .await?;
        Ok(row.into())
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.repository.badges.delete(id).await
    }

    /// Local substring search over names and id
    pub async fn search(&self, query: Option<&str>) -> AppResult<Vec<Badge>> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::Validation("Query parameter q is required".to_string()))?;

        let rows = self.repository.badges.search(query).await?;
        Ok(rows.into_iter().map(Badge::from).collect())
    }

    /// Insert every user carrying both names. Users without names are
    /// ignored, store failures are reported per user.
    pub async fn bulk_import(&self, users: &[Value]) -> AppResult<BulkImportReport> {
        if users.is_empty() {
            return Err(AppError::Validation("users array is required".to_string()));
        }

        let mut imported = 0;
        let mut errors = Vec::new();

        for user in users {
            let Some(record) = ExternalBadgeRecord::from_json(user) else {
                continue;
            };
            let (Some(last_name), Some(first_name)) = (record.last_name, record.first_name) else {
                continue;
            };
            if last_name.is_empty() || first_name.is_empty() {
                continue;
            }

            match self
                .repository
                .badges
                .create(&CreateBadge::new(last_name.as_str(), first_name.as_str(), false))
                .await
            {
                Ok(_) => imported += 1,
                Err(e) => errors.push(format!("Error importing {} {}: {}", first_name, last_name, e)),
            }
        }

        tracing::info!("Bulk import: {} badges imported, {} errors", imported, errors.len());

        Ok(BulkImportReport {
            message: format!("{} badges imported successfully", imported),
            imported,
            errors,
        })
    }
}

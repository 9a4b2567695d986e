//! Statistics service

use chrono::{Duration, Utc};

use crate::{api::stats::StatsResponse, error::AppResult, repository::Repository};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Counts over local badges and print logs
    pub async fn get_stats(&self) -> AppResult<StatsResponse> {
        let since = Utc::now() - Duration::hours(24);

        let (total, validated, prints, recent) = tokio::try_join!(
            self.repository.badges.count(),
            self.repository.badges.count_validated(),
            self.repository.print_logs.count(),
            self.repository.badges.count_created_since(since),
        )?;

        Ok(StatsResponse {
            total_badges: total,
            validated_badges: validated,
            non_validated_badges: total - validated,
            total_prints: prints,
            recent_badges_24h: recent,
        })
    }
}

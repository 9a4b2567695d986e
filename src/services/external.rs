//! External badge registries
//!
//! Both registries are plain HTTP endpoints returning loosely shaped JSON.
//! Records are decoded into [`ExternalBadgeRecord`] here, at the boundary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::badge::ExternalBadgeRecord,
};

/// A remote source of badge records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExternalBadgeSource: Send + Sync {
    /// Every record the source exposes
    async fn fetch_all(&self) -> AppResult<Vec<ExternalBadgeRecord>>;

    /// One record by id, `None` when the source does not know it
    async fn fetch_one(&self, id: &str) -> AppResult<Option<ExternalBadgeRecord>>;
}

/// Body layout of a registry listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingShape {
    /// A bare JSON array
    Array,
    /// An object with the records under `data`
    DataEnvelope,
}

/// Registry reached over HTTP with a per-request timeout
#[derive(Clone)]
pub struct HttpBadgeSource {
    client: reqwest::Client,
    url: Url,
    shape: ListingShape,
}

impl HttpBadgeSource {
    pub fn new(url: impl AsRef<str>, shape: ListingShape, timeout_secs: u64) -> AppResult<Self> {
        let url = Url::parse(url.as_ref())
            .map_err(|e| AppError::Internal(format!("Invalid registry URL {}: {}", url.as_ref(), e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, url, shape })
    }

    /// URL of one record, the id sent as a single escaped path segment.
    /// Ids that cannot name a segment yield `None`.
    fn record_url(&self, id: &str) -> Option<Url> {
        if matches!(id, "" | "." | "..") {
            return None;
        }
        let mut url = self.url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push(id);
        Some(url)
    }

    fn records(&self, body: Value) -> AppResult<Vec<ExternalBadgeRecord>> {
        let items = match (self.shape, body) {
            (ListingShape::Array, Value::Array(items)) => items,
            (ListingShape::DataEnvelope, Value::Object(mut object)) => match object.remove("data") {
                Some(Value::Array(items)) => items,
                _ => return Err(AppError::Upstream(format!("{}: missing data array", self.url))),
            },
            _ => return Err(AppError::Upstream(format!("{}: unexpected body", self.url))),
        };

        Ok(items.iter().filter_map(ExternalBadgeRecord::from_json).collect())
    }
}

#[async_trait]
impl ExternalBadgeSource for HttpBadgeSource {
    async fn fetch_all(&self) -> AppResult<Vec<ExternalBadgeRecord>> {
        let response = self.client.get(self.url.clone()).send().await?;

        if response.status() != StatusCode::OK {
            return Err(AppError::Upstream(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        self.records(body)
    }

    async fn fetch_one(&self, id: &str) -> AppResult<Option<ExternalBadgeRecord>> {
        let Some(url) = self.record_url(id) else {
            return Ok(None);
        };
        let response = self.client.get(url.clone()).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body: Value = response.json().await?;
                Ok(ExternalBadgeRecord::from_json(&body))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(AppError::Upstream(format!("{} returned {}", url, status))),
        }
    }
}

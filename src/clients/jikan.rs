use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::clients::queue::RequestQueue;
use crate::clients::retry::{AttemptError, RetryPolicy, send_with_retry};
use crate::config::JikanConfig;
use crate::domain::{AnimeId, Season};
use crate::models::anime::{Envelope, Page, RemoteEpisode, RemoteTitle};

#[derive(Debug, Error)]
pub enum JikanError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jikan API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Invalid Jikan response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Anime not found: {0}")]
    NotFound(AnimeId),

    #[error("Still rate limited after {waits} waits")]
    Throttled { waits: u32 },
}

impl JikanError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::NotFound(_) | Self::Status { status: 404, .. }
        )
    }
}

/// The remote collection endpoints the pipeline reads.
///
/// [`JikanClient`] is the HTTP implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait JikanApi: Send + Sync {
    async fn season_page(
        &self,
        year: i32,
        season: Season,
        page: u32,
    ) -> Result<Page<RemoteTitle>, JikanError>;

    async fn upcoming_page(&self, page: u32) -> Result<Page<RemoteTitle>, JikanError>;

    async fn anime(&self, id: AnimeId) -> Result<RemoteTitle, JikanError>;

    async fn episodes_page(
        &self,
        id: AnimeId,
        page: u32,
    ) -> Result<Page<RemoteEpisode>, JikanError>;
}

#[derive(Clone)]
pub struct JikanClient {
    client: Client,
    base_url: String,
    queue: Arc<RequestQueue>,
    policy: RetryPolicy,
}

impl JikanClient {
    pub fn new(config: &JikanConfig, queue: Arc<RequestQueue>) -> Result<Self, JikanError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            queue,
            policy: RetryPolicy::from(config),
        })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, JikanError>
    where
        T: DeserializeOwned + Send,
    {
        let url = format!("{}{}", self.base_url, path);
        send_with_retry(&self.queue, &self.policy, || self.attempt(&url)).await
    }

    async fn attempt<T>(&self, url: &str) -> Result<T, AttemptError>
    where
        T: DeserializeOwned,
    {
        metrics::counter!("jikan_requests_total").increment(1);
        debug!(url, "Jikan request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(JikanError::from)?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::Throttled {
                retry_after: retry_after(response.headers()),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JikanError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(JikanError::from)?;
        serde_json::from_slice(&bytes).map_err(|e| AttemptError::Failed(e.into()))
    }
}

/// `Retry-After` as delta-seconds. HTTP-date values are not used by Jikan.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl JikanApi for JikanClient {
    async fn season_page(
        &self,
        year: i32,
        season: Season,
        page: u32,
    ) -> Result<Page<RemoteTitle>, JikanError> {
        self.get_json(&format!("/seasons/{year}/{season}?page={page}"))
            .await
    }

    async fn upcoming_page(&self, page: u32) -> Result<Page<RemoteTitle>, JikanError> {
        self.get_json(&format!("/seasons/upcoming?page={page}"))
            .await
    }

    async fn anime(&self, id: AnimeId) -> Result<RemoteTitle, JikanError> {
        match self
            .get_json::<Envelope<RemoteTitle>>(&format!("/anime/{id}"))
            .await
        {
            Ok(envelope) => Ok(envelope.data),
            Err(JikanError::Status { status: 404, .. }) => Err(JikanError::NotFound(id)),
            Err(e) => Err(e),
        }
    }

    async fn episodes_page(
        &self,
        id: AnimeId,
        page: u32,
    ) -> Result<Page<RemoteEpisode>, JikanError> {
        self.get_json(&format!("/anime/{id}/episodes?page={page}"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_parses_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));
    }

    #[test]
    fn retry_after_ignores_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn not_found_is_final() {
        assert!(!JikanError::NotFound(AnimeId::new(1)).is_retryable());
        assert!(
            !JikanError::Status {
                status: 404,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            JikanError::Status {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
    }
}

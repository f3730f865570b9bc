use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use url::Url;

use crate::auth::Token;
use crate::error::{QueueLensError, Result};
use crate::http;
use crate::queue::{Classifier, QueueCounts};

use super::types::JobRecord;

pub const DEFAULT_BASE_URL: &str = "https://circleci.com";
pub const DEFAULT_LIMIT: usize = 100;

/// CircleCI v1.1 API client for the `recent-builds` endpoint.
pub struct CircleCiClient {
    client: Client,
    recent_builds_url: Url,
    token: Option<Token>,
    limit: usize,
}

impl CircleCiClient {
    /// Creates a client for the given CircleCI instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or `base_url`
    /// is not a valid URL.
    pub fn new(base_url: &str, token: Option<Token>, limit: usize) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(concat!("queuelens/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| QueueLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let recent_builds_url = http::api_url(base_url, "api/v1.1/recent-builds", "CircleCI")?;

        Ok(Self {
            client,
            recent_builds_url,
            token,
            limit,
        })
    }

    /// Fetches the raw `recent-builds` response body.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success HTTP status.
    pub async fn fetch_recent_builds(&self) -> Result<Vec<u8>> {
        let mut request = self
            .client
            .get(self.recent_builds_url.clone())
            .query(&[("limit", self.limit.to_string())]);

        if let Some(token) = &self.token {
            request = request.query(&[("circle-token", token.as_str())]);
        }

        debug!("GET {} (limit={})", self.recent_builds_url, self.limit);
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(QueueLensError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Fetches recent builds and folds every page into fresh counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or any page cannot be decoded;
    /// no partial counts are returned in that case.
    pub async fn fetch_queue_counts(&self, classifier: &Classifier) -> Result<QueueCounts> {
        let body = self.fetch_recent_builds().await?;
        debug!("Received {} bytes from CircleCI", body.len());
        QueueCounts::from_pages(decode_pages(&body), classifier)
    }
}

/// Decodes a body made of one or more consecutive JSON arrays of jobs.
///
/// The iterator ends cleanly at end of input; a malformed or truncated page
/// yields an error.
pub fn decode_pages(body: &[u8]) -> impl Iterator<Item = Result<Vec<JobRecord>>> + '_ {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<Vec<JobRecord>>()
        .map(|page| page.map_err(QueueLensError::from))
}

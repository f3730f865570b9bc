use log::debug;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::auth::Token;
use crate::error::{QueueLensError, Result};
use crate::http;
use crate::metrics::{MetricBatch, MetricPoint};

pub const DEFAULT_BASE_URL: &str = "https://api.datadoghq.com";

/// Request body for `POST /api/v1/series`.
#[derive(Debug, Serialize)]
struct SeriesPayload<'a> {
    series: Vec<&'a MetricPoint>,
}

/// Datadog metrics API client.
pub struct DatadogClient {
    client: Client,
    series_url: Url,
    api_key: Token,
}

impl DatadogClient {
    /// Creates a client posting to `{base_url}/api/v1/series`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or `base_url`
    /// is not a valid URL.
    pub fn new(base_url: &str, api_key: Token) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("queuelens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QueueLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        let series_url = http::api_url(base_url, "api/v1/series", "Datadog")?;

        Ok(Self {
            client,
            series_url,
            api_key,
        })
    }

    /// Submits both series of a batch in a single request.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or when Datadog rejects the batch.
    pub async fn post_metrics(&self, batch: &MetricBatch) -> Result<()> {
        if batch.is_empty() {
            debug!("No series to submit");
            return Ok(());
        }

        let payload = SeriesPayload {
            series: batch.series().collect(),
        };

        debug!("POST {} with {} series", self.series_url, batch.len());

        let response = self
            .client
            .post(self.series_url.clone())
            .header("DD-API-KEY", self.api_key.as_str())
            .json(&payload)
            .send()
            .await?;

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

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;

    fn create_batch() -> MetricBatch {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let tags = vec![
            "vcs_type:github".to_string(),
            "username:u".to_string(),
            "reponame:r".to_string(),
            "branch:master".to_string(),
        ];
        MetricBatch {
            collected_at: ts,
            running: vec![MetricPoint::new(
                "circleci.queue.running",
                ts,
                2.0,
                tags.clone(),
            )],
            not_running: vec![MetricPoint::new(
                "circleci.queue.not_running",
                ts,
                0.0,
                tags,
            )],
        }
    }

    #[test]
    fn test_series_url() {
        let client = DatadogClient::new(DEFAULT_BASE_URL, Token::from("key")).unwrap();
        assert_eq!(
            client.series_url.as_str(),
            "https://api.datadoghq.com/api/v1/series"
        );
    }

    #[test]
    fn test_series_url_keeps_proxy_prefix() {
        let client = DatadogClient::new("https://proxy.example/dd", Token::from("key")).unwrap();
        assert_eq!(
            client.series_url.as_str(),
            "https://proxy.example/dd/api/v1/series"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = DatadogClient::new("::::", Token::from("key"));
        assert!(matches!(result, Err(QueueLensError::Config(_))));
    }

    #[tokio::test]
    async fn test_post_metrics_sends_series_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/series")
            .match_header("dd-api-key", "dd-secret")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "series": [
                    {
                        "metric": "circleci.queue.running",
                        "points": [[1_704_164_645.0, 2.0]],
                        "tags": ["vcs_type:github", "username:u", "reponame:r", "branch:master"]
                    },
                    {
                        "metric": "circleci.queue.not_running",
                        "points": [[1_704_164_645.0, 0.0]],
                        "tags": ["vcs_type:github", "username:u", "reponame:r", "branch:master"]
                    }
                ]
            })))
            .with_status(202)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let client = DatadogClient::new(&server.url(), Token::from("dd-secret")).unwrap();
        client.post_metrics(&create_batch()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_metrics_skips_empty_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/series")
            .expect(0)
            .create_async()
            .await;

        let client = DatadogClient::new(&server.url(), Token::from("dd-secret")).unwrap();
        client.post_metrics(&MetricBatch::default()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_metrics_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/series")
            .with_status(403)
            .with_body(r#"{"errors":["Forbidden"]}"#)
            .create_async()
            .await;

        let client = DatadogClient::new(&server.url(), Token::from("bad")).unwrap();
        let result = client.post_metrics(&create_batch()).await;

        match result {
            Err(QueueLensError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert!(message.contains("Forbidden"));
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }
}

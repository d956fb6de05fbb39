//! HTTP client for manifests, shard payloads and search queries

use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::retry::RetryPolicy;
use crate::config::HttpConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("HTTP {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Malformed response from {url}: {reason}")]
    MalformedBody { url: String, reason: String },
}

impl FetchError {
    /// Transport failures, throttling and server errors may succeed on another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RequestFailed(_) | FetchError::Timeout => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::InvalidUrl(_)
            | FetchError::TooManyRedirects
            | FetchError::MalformedBody { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Shared HTTP client; every call goes through the retry policy
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
    retries: AtomicU64,
}

impl HttpClient {
    pub fn new(config: &HttpConfig, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            retry,
            retries: AtomicU64::new(0),
        })
    }

    /// Number of repeated attempts made so far
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Download a resource body
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        self.with_retry(url, || async move {
            let response = self.send(url, self.client.get(url)).await?;
            response
                .bytes()
                .await
                .map_err(|e| FetchError::RequestFailed(format!("Failed to read body: {}", e)))
        })
        .await
    }

    /// Download a resource body as UTF-8 text
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let bytes = self.get_bytes(url).await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| FetchError::MalformedBody {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// POST a JSON body with extra headers and return the response text
    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(String, String)],
    ) -> Result<String> {
        self.with_retry(url, || async move {
            let mut request = self.client.post(url).json(body);
            for (name, value) in headers {
                request = request.header(name, value);
            }

            let response = self.send(url, request).await?;
            response
                .text()
                .await
                .map_err(|e| FetchError::RequestFailed(format!("Failed to read body: {}", e)))
        })
        .await
    }

    async fn with_retry<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(url, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempt) => {
                    let backoff = self.retry.backoff(attempt);
                    warn!(
                        url,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!(url, attempt, error = %e, "Request failed after retries");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Send once and turn non-success statuses into [`FetchError::Status`]
    async fn send(&self, url: &str, request: RequestBuilder) -> Result<reqwest::Response> {
        debug!(url, "Sending request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_redirect() {
                FetchError::TooManyRedirects
            } else if e.is_builder() {
                FetchError::InvalidUrl(url.to_string())
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(max_attempts: u32) -> HttpClient {
        let retry = RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            multiplier: 2,
            max_backoff: Duration::from_millis(5),
        };
        HttpClient::new(&HttpConfig::default(), retry).unwrap()
    }

    #[test]
    fn test_retryable_classification() {
        let status = |status| FetchError::Status {
            url: "u".into(),
            status,
            body: String::new(),
        };
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(FetchError::Timeout.is_retryable());
        assert!(!FetchError::InvalidUrl("x".into()).is_retryable());
    }

    #[tokio::test]
    async fn test_non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such shard"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(3)
            .get_bytes(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();

        match err {
            FetchError::Status { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such shard");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_post_json_returns_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("x-token", "t"))
            .and(body_json(serde_json::json!({ "from": 0 })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"total":0}"#))
            .expect(1)
            .mount(&server)
            .await;

        let body = client(1)
            .post_json(
                &format!("{}/search", server.uri()),
                &serde_json::json!({ "from": 0 }),
                &[("x-token".to_string(), "t".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(body, r#"{"total":0}"#);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = client(3);
        let body = client.get_text(&format!("{}/flaky", server.uri())).await.unwrap();

        assert_eq!(body, "ok");
        assert_eq!(client.retries(), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_policy_does_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(1);
        assert!(client.get_bytes(&server.uri()).await.is_err());
        assert_eq!(client.retries(), 0);
    }
}

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type FetchResult<T> = Result<T, FetchError>;

/// Browser-like agent; some ESPN hosts refuse requests without one.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A single GET against a JSON API. No retries, no state.
///
/// The returned future owns everything it needs so the cache can share it
/// between concurrent callers.
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> BoxFuture<'static, FetchResult<Value>>;
}

impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    fn fetch(&self, url: &str) -> BoxFuture<'static, FetchResult<Value>> {
        (**self).fetch(url)
    }
}

/// HTTP client for ESPN's public endpoints.
#[derive(Debug, Clone)]
pub struct EspnClient {
    client: Client,
    timeout: Duration,
}

impl Default for EspnClient {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }
}

#[derive(Debug, Clone)]
pub enum FetchError {
    /// Connection, DNS or timeout failure.
    Network {
        url: String,
        message: String,
        timed_out: bool,
    },
    /// Upstream answered with a non-2xx status. `body` is kept when it was JSON.
    HttpStatus {
        url: String,
        status: u16,
        body: Option<Arc<Value>>,
    },
    /// 2xx response whose body was not valid JSON.
    Decode { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::Decode { url, .. } => url,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether waiting for the next tick could plausibly fix this.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Decode { .. } => true,
            FetchError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network { url, message, timed_out: true } => {
                write!(f, "Timed out fetching {url}: {message}")
            }
            FetchError::Network { url, message, .. } => {
                write!(f, "Network error for {url}: {message}")
            }
            FetchError::HttpStatus { url, status, .. } => {
                write!(f, "HTTP {status} on {url}")
            }
            FetchError::Decode { url, message } => write!(f, "Parse error for {url}: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl EspnClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .user_agent(BROWSER_USER_AGENT)
                .build()
                .unwrap_or_default(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json(&self, url: &str) -> FetchResult<Value> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| network_error(url, &e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| network_error(url, &e))?;

        if !status.is_success() {
            let body = serde_json::from_slice::<Value>(&bytes).ok().map(Arc::new);
            return Err(FetchError::HttpStatus {
                url: url.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
            url: url.to_owned(),
            message: e.to_string(),
        })
    }
}

impl Fetch for EspnClient {
    fn fetch(&self, url: &str) -> BoxFuture<'static, FetchResult<Value>> {
        let this = self.clone();
        let url = url.to_owned();
        async move { this.get_json(&url).await }.boxed()
    }
}

fn network_error(url: &str, e: &reqwest::Error) -> FetchError {
    FetchError::Network {
        url: url.to_owned(),
        message: e.to_string(),
        timed_out: e.is_timeout(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn returns_parsed_json_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scoreboard")
            .match_header("user-agent", BROWSER_USER_AGENT)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"events":[{"id":"42"}]}"#)
            .create_async()
            .await;

        let client = EspnClient::new();
        let value = client
            .get_json(&format!("{}/scoreboard", server.url()))
            .await
            .expect("request should succeed");

        assert_eq!(value, json!({"events": [{"id": "42"}]}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_keeps_json_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/boxscore")
            .with_status(503)
            .with_body(r#"{"message":"down for maintenance"}"#)
            .create_async()
            .await;

        let err = EspnClient::new()
            .get_json(&format!("{}/boxscore", server.url()))
            .await
            .unwrap_err();

        match err {
            FetchError::HttpStatus { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body.as_deref(), Some(&json!({"message": "down for maintenance"})));
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_is_dropped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("<html>not found</html>")
            .create_async()
            .await;

        let err = EspnClient::new()
            .get_json(&format!("{}/missing", server.url()))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert!(matches!(err, FetchError::HttpStatus { body: None, .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/news")
            .with_status(200)
            .with_body("{\"headlines\": [")
            .create_async()
            .await;

        let err = EspnClient::new()
            .get_json(&format!("{}/news", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = EspnClient::with_timeout(Duration::from_secs(2));
        let err = client.get_json("http://127.0.0.1:9/scoreboard").await.unwrap_err();

        assert!(matches!(err, FetchError::Network { .. }));
        assert_eq!(err.url(), "http://127.0.0.1:9/scoreboard");
    }

    #[test]
    fn retryable_statuses() {
        let status = |status| FetchError::HttpStatus { url: "u".into(), status, body: None };
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(404).is_retryable());
    }
}

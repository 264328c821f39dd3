//! HTTP fetch primitive shared by the page fetcher and the resource cache

use crate::error::{FetchError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A single-GET transport returning the raw response body
///
/// Implementations must report any status outside 200..300 as
/// [`FetchError::BadStatus`] and connection level failures as
/// [`FetchError::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Bytes>;
}

/// [`Transport`] backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new HttpFetcher with a 30 second request timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HttpFetcher with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpFetcher { client })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        HttpFetcher { client }
    }
}

#[async_trait]
impl Transport for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<Bytes> {
        debug!("GET url={}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!("GET failed for url={}: {}", url, e);
            if e.is_builder() {
                FetchError::InvalidRequest(format!("Cannot build request: {}", e))
            } else {
                FetchError::Transport(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        if let Some(err) = FetchError::from_http_status(status) {
            warn!("Unexpected status for url={}: status={}", url, status);
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("Failed to read response body: {}", e)))?;

        debug!("Received response for url={}: status={}, bytes={}", url, status, body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_fetcher_creation() {
        assert!(HttpFetcher::new().is_ok());
        assert!(HttpFetcher::with_timeout(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_get_success_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thing"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = Url::parse(&format!("{}/thing", server.uri())).unwrap();
        let body = fetcher.get(&url).await.unwrap();
        assert_eq!(&body[..], b"payload");
    }

    #[tokio::test]
    async fn test_get_accepts_any_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(203).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        assert!(fetcher.get(&url).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_non_2xx_is_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        assert_eq!(fetcher.get(&url).await, Err(FetchError::BadStatus(503)));
    }

    #[tokio::test]
    async fn test_get_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::with_timeout(Duration::from_millis(50)).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        assert!(matches!(fetcher.get(&url).await, Err(FetchError::Transport(_))));
    }
}

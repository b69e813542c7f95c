//! REST client for the Hermes reporting API.

use crate::config::CacheConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Config error: {0}")]
    Config(String),
}

/// Read side of the remote API as seen by the cache.
///
/// Paths are absolute (`/user/get/all`) and resolved against the source's own
/// base URL. Implementations return the decoded JSON body of a successful
/// response and an error for anything else.
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ApiClientError>;

    /// POST a JSON `body` to `path` and return the raw response bytes.
    ///
    /// Sources without binary endpoints keep this default, which fails.
    async fn post_bytes(
        &self,
        path: &str,
        _body: &serde_json::Value,
    ) -> Result<Vec<u8>, ApiClientError> {
        Err(ApiClientError::InvalidResponse(format!(
            "binary requests are not supported for {}",
            path
        )))
    }
}

/// Body the server sends alongside non-success statuses.
#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RestClient {
    pub fn new(config: &CacheConfig) -> Result<Self, ApiClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base_url = config.normalized_base_url();
        if base_url.is_empty() {
            return Err(ApiClientError::Config("api_base_url is empty".to_string()));
        }

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn classify(&self, err: reqwest::Error) -> ApiClientError {
        if err.is_timeout() {
            ApiClientError::Timeout(self.timeout)
        } else {
            ApiClientError::Http(err)
        }
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiClientError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| self.classify(e))?;
        if status.is_success() {
            Ok(serde_json::from_str::<T>(&text)?)
        } else {
            Err(status_error(status, &text))
        }
    }
}

/// Non-success status, preferring the server's `{"error": ..}` message.
fn status_error(status: StatusCode, text: &str) -> ApiClientError {
    let message = match serde_json::from_str::<ServerErrorBody>(text) {
        Ok(body) => body.error,
        Err(_) => text.to_string(),
    };
    ApiClientError::InvalidResponse(format!("HTTP {}: {}", status.as_u16(), message))
}

#[async_trait]
impl TableSource for RestClient {
    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ApiClientError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        self.parse_response(response).await
    }

    async fn post_bytes(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Vec<u8>, ApiClientError> {
        let response = self
            .client
            .post(self.url(path))
            .header(ACCEPT, HeaderValue::from_static("*/*"))
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.map_err(|e| self.classify(e))?;
            return Err(status_error(status, &text));
        }
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining_strips_duplicate_slashes() {
        let client = RestClient::new(&CacheConfig::new("http://localhost:5000///")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(
            client.url("/reports/preverified/all"),
            "http://localhost:5000/reports/preverified/all"
        );
        assert_eq!(client.url("media/4"), "http://localhost:5000/media/4");
    }

    #[test]
    fn test_timeout_from_config() {
        let mut config = CacheConfig::new("http://localhost:5000");
        config.request_timeout_ms = 1500;
        let client = RestClient::new(&config).unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_status_error_prefers_server_message() {
        let err = status_error(StatusCode::NOT_FOUND, r#"{"error": "Media not found"}"#);
        assert_eq!(err.to_string(), "Unexpected response: HTTP 404: Media not found");

        let err = status_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.to_string(), "Unexpected response: HTTP 502: <html>bad gateway</html>");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(matches!(
            RestClient::new(&CacheConfig::new("/")),
            Err(ApiClientError::Config(_))
        ));
    }
}

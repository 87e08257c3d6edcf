use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::config::parse_base_url;
use crate::error::TransportError;

pub mod submit;

pub use submit::{RetryPolicy, Submitter, Timeouts};

/// Path probed before a run to make sure the publish server is up.
pub const PROBE_PATH: &str = "api/entries";

/// Raw HTTP response from the publish server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResponse {
    pub status: u16,
    pub body: String,
}

impl PublishResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Write side of the sync: one POST per entry, no request body.
#[async_trait]
pub trait PublishApi: Send + Sync {
    async fn post(&self, path: &str, timeout: Duration) -> Result<PublishResponse, TransportError>;

    /// Cheap GET used as a connectivity check before a run.
    async fn probe(&self, timeout: Duration) -> Result<PublishResponse, TransportError>;
}

/// HTTP client for the render-and-submit server.
#[derive(Clone)]
pub struct PublishClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for PublishClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PublishClient {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url = parse_base_url(base_url).map_err(TransportError::new)?;
        let http = Client::builder()
            .user_agent(concat!("content-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::new(format!("invalid publish path '{path}': {e}")))
    }

    pub fn build_request(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<reqwest::Request, TransportError> {
        Ok(self
            .http
            .post(self.endpoint(path)?)
            .timeout(timeout)
            .build()?)
    }

    async fn execute(&self, request: reqwest::Request) -> Result<PublishResponse, TransportError> {
        debug!(method = %request.method(), url = %request.url(), "publish request");
        let res = self.http.execute(request).await?;
        let status = res.status().as_u16();
        let body = res.text().await?;
        debug!(status, "publish response");
        Ok(PublishResponse { status, body })
    }
}

#[async_trait]
impl PublishApi for PublishClient {
    async fn post(&self, path: &str, timeout: Duration) -> Result<PublishResponse, TransportError> {
        let request = self.build_request(path, timeout)?;
        self.execute(request).await
    }

    async fn probe(&self, timeout: Duration) -> Result<PublishResponse, TransportError> {
        let request = self
            .http
            .get(self.endpoint(PROBE_PATH)?)
            .timeout(timeout)
            .build()?;
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_request_posts_to_joined_path_with_timeout() {
        let client = PublishClient::new("http://localhost:3000").unwrap();
        let request = client
            .build_request("render-and-submit-faq/abc123", Duration::from_secs(60))
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "http://localhost:3000/render-and-submit-faq/abc123");
        assert_eq!(request.timeout(), Some(&Duration::from_secs(60)));
        assert!(request.body().is_none());
    }

    #[test]
    fn leading_slash_keeps_base_prefix() {
        let client = PublishClient::new("http://publisher/internal/").unwrap();
        let request = client
            .build_request("/render-and-submit/xyz", Duration::from_secs(30))
            .unwrap();
        assert_eq!(request.url().path(), "/internal/render-and-submit/xyz");
    }

    #[test]
    fn response_helpers() {
        let ok = PublishResponse::json(200, &json!({ "success": true }));
        assert!(ok.is_success());
        assert_eq!(ok.body, r#"{"success":true}"#);
        let err = PublishResponse::text(502, "Bad Gateway");
        assert!(!err.is_success());
        assert!(PublishResponse::text(204, "").is_success());
        assert!(!PublishResponse::text(302, "").is_success());
    }

    #[test]
    fn invalid_base_url_rejected() {
        assert!(PublishClient::new("not a url").is_err());
    }
}

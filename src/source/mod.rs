use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{parse_base_url, SourceConfig};
use crate::error::SourceError;
use crate::model::Entry;
use crate::source::model::EntryCollection;

pub mod fetch;
pub mod model;

pub use fetch::{FetchedEntries, PageFetcher, MAX_PAGE_SIZE};

/// One page request against the entries endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub content_type: String,
    pub skip: usize,
    pub limit: usize,
    pub include: u8,
    pub order: Option<String>,
    pub select: Option<String>,
}

impl PageQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("content_type", self.content_type.clone()),
            ("skip", self.skip.to_string()),
            ("limit", self.limit.to_string()),
            ("include", self.include.to_string()),
        ];
        if let Some(order) = &self.order {
            params.push(("order", order.clone()));
        }
        if let Some(select) = &self.select {
            params.push(("select", select.clone()));
        }
        params
    }
}

/// A decoded page: the matching entries plus side-loaded linked entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub includes: Vec<Entry>,
    pub total: Option<u64>,
}

impl From<EntryCollection> for EntryPage {
    fn from(collection: EntryCollection) -> Self {
        Self {
            entries: collection.items.into_iter().map(Entry::from).collect(),
            includes: collection
                .includes
                .entry
                .into_iter()
                .filter(|raw| raw.is_entry())
                .map(Entry::from)
                .collect(),
            total: collection.total,
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<EntryPage, SourceError>;
}

/// Read-only client for the Contentful Delivery API.
#[derive(Clone)]
pub struct ContentfulClient {
    http: Client,
    base_url: Url,
    space_id: String,
    environment: String,
    access_token: String,
}

impl fmt::Debug for ContentfulClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentfulClient")
            .field("base_url", &self.base_url)
            .field("space_id", &self.space_id)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl ContentfulClient {
    pub fn from_config(cfg: &SourceConfig, timeout: Duration) -> Result<Self, SourceError> {
        let base_url = parse_base_url(&cfg.cdn_url).map_err(SourceError::InvalidUrl)?;
        let http = Client::builder()
            .user_agent(concat!("content-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            space_id: cfg.space_id.clone(),
            environment: cfg.environment.clone(),
            access_token: cfg.access_token.clone(),
        })
    }

    pub fn build_request(&self, query: &PageQuery) -> Result<reqwest::Request, SourceError> {
        let endpoint = self
            .base_url
            .join(&format!(
                "spaces/{}/environments/{}/entries",
                self.space_id, self.environment
            ))
            .map_err(|e| SourceError::InvalidUrl(e.to_string()))?;
        Ok(self
            .http
            .get(endpoint)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .query(&query.params())
            .build()?)
    }
}

#[async_trait]
impl ContentSource for ContentfulClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<EntryPage, SourceError> {
        let request = self.build_request(query)?;
        debug!(url = %request.url(), "requesting entries page");

        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "content source rejected page request");
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = res.text().await?;
        let collection: EntryCollection =
            serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(collection.into())
    }
}

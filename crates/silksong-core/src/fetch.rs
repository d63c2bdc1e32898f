use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;

use crate::query::{ProductQuery, QueryError, validate_product_id};
use crate::status::{Resolution, resolve};

pub const STORE_BASE_URL: &str = "https://store.steampowered.com";
const REGION: &str = "us";
const LANGUAGE: &str = "en";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("refusing to fetch invalid product id: {0}")]
    InvalidQuery(#[from] QueryError),
    #[error("failed to reach the store: {0}")]
    Request(#[source] reqwest::Error),
    #[error("store request failed with HTTP {status}{body_snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body_snippet: String,
    },
    #[error("failed to read store response: {0}")]
    Body(#[source] reqwest::Error),
    #[error("payload unavailable: {reason}")]
    Unavailable { reason: String },
}

impl TransportError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Request(error) | Self::Body(error) => error.is_timeout(),
            _ => false,
        }
    }
}

/// One read of the raw catalog payload for a product. Implementations must
/// not retry; the poll loop owns the retry cadence.
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch(&self, product_id: &str) -> Result<String, TransportError>;
}

#[must_use]
pub fn store_url(base_url: &str, product_id: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/api/appdetails?appids={product_id}&cc={REGION}&l={LANGUAGE}")
}

/// Reads `appdetails` from the Steam storefront.
#[derive(Debug, Clone)]
pub struct SteamStoreFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl SteamStoreFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, STORE_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StatusFetcher for SteamStoreFetcher {
    async fn fetch(&self, product_id: &str) -> Result<String, TransportError> {
        validate_product_id(product_id)?;
        let url = store_url(&self.base_url, product_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, 160))
                .unwrap_or_default();
            warn!("Store request for app {product_id} failed: HTTP {status}");
            return Err(TransportError::HttpStatus {
                status,
                body_snippet,
            });
        }

        let body = response.text().await.map_err(TransportError::Body)?;
        debug!(
            "Fetched store payload for app {product_id}: HTTP {status}, {} bytes",
            body.len()
        );
        Ok(body)
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.trim().is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

/// Run a single fetch + resolve for `query`. Transport failures are logged
/// and reported through the resolver like any other error.
pub async fn check_once(fetcher: &dyn StatusFetcher, query: &ProductQuery) -> Resolution {
    match fetcher.fetch(query.product_id()).await {
        Ok(raw) => resolve(Some(&raw), query.product_id()),
        Err(error) => {
            if error.is_timeout() {
                warn!("Store request for app {} timed out", query.product_id());
            } else {
                warn!(
                    "Fetching status for app {} failed: {error}",
                    query.product_id()
                );
            }
            resolve(None, query.product_id())
        }
    }
}

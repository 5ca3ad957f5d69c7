//! TMDB-style HTTP feed client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{FeedError, FeedPage, RemoteFeed, ServerEntry};
use crate::config::FeedConfig;

/// HTTP client for a TMDB-style popular-movies feed.
pub struct TmdbFeed {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Response body shape for one page.
#[derive(Debug, Deserialize)]
struct WirePage {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    results: Vec<ServerEntry>,
}

impl TmdbFeed {
    /// Build a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Network`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("cinefeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Network(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl RemoteFeed for TmdbFeed {
    async fn fetch_page(&self, page_number: u32) -> Result<FeedPage, FeedError> {
        let url = format!("{}/movie/popular", self.base_url);
        debug!(page = page_number, "fetching feed page");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("page", &page_number.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    FeedError::InvalidRequest
                } else {
                    FeedError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Network(format!("feed answered {status}")));
        }

        let body: WirePage = response
            .json()
            .await
            .map_err(|e| FeedError::Network(format!("cannot decode page: {e}")))?;

        if body.results.is_empty() {
            return Err(FeedError::EmptyResponse);
        }

        Ok(FeedPage {
            page_number: body.page.unwrap_or(page_number),
            entries: body.results,
        })
    }
}

//! Remote paged feed.
//!
//! The feed is an opaque network collaborator: one page request yields
//! either a page of entries plus its page number, or a fetch error.
//! Requests are cancellable before completion by dropping the future
//! (the download operation races it against its cancellation token).

mod tmdb;

pub use tmdb::TmdbFeed;

use async_trait::async_trait;
use serde::Deserialize;

use crate::store::{FeedRecord, parse_release_date};

/// Remote feed fetch error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// The request never went out: cancellation, or a missing input
    /// page number forwarded from an upstream failure.
    #[error("fetch cancelled")]
    Cancelled,

    /// The request could not be constructed.
    #[error("invalid request")]
    InvalidRequest,

    /// The feed answered with no entries.
    #[error("empty response")]
    EmptyResponse,

    /// Transport, status, or decode failure.
    #[error("network error: {0}")]
    Network(String),
}

/// One entry as the feed serves it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerEntry {
    /// Server-assigned identity.
    pub id: i64,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Synopsis text.
    #[serde(default)]
    pub overview: Option<String>,
    /// Poster image path.
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Release date string in the feed's fixed format.
    #[serde(default)]
    pub release_date: Option<String>,
    /// Popularity score.
    #[serde(default)]
    pub popularity: Option<f64>,
}

impl ServerEntry {
    /// Convert to the store's native record shape, tagged with the page
    /// it was downloaded as part of.
    pub fn into_record(self, page: u32) -> FeedRecord {
        FeedRecord {
            id: self.id,
            title: self.title.unwrap_or_default(),
            overview: self.overview.unwrap_or_default(),
            poster_ref: self.poster_path,
            release_date: parse_release_date(self.release_date.as_deref()),
            popularity: self.popularity.unwrap_or(0.0),
            page,
        }
    }
}

/// One downloaded page. Transient: produced by the feed, consumed by
/// the persist operation, never stored as its own entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    /// Page number the entries belong to.
    pub page_number: u32,
    /// Entries in feed order.
    pub entries: Vec<ServerEntry>,
}

/// Paged data source contract.
#[async_trait]
pub trait RemoteFeed: Send + Sync {
    /// Fetch one page of entries.
    ///
    /// A well-formed page with no entries is an [`FeedError::EmptyResponse`].
    async fn fetch_page(&self, page_number: u32) -> Result<FeedPage, FeedError>;
}

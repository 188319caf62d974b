//! Fetching the search-results page.

mod mock;
mod pubmed;

pub use mock::MockFetcher;
pub use pubmed::PubMedFetcher;

use async_trait::async_trait;

use crate::models::RawArticle;

/// Errors fetching or parsing the search-results page. Both are recoverable:
/// the coordinator skips the cycle and retries after a shortened cooldown.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network or HTTP error
    #[error("network error: {0}")]
    Network(String),

    /// The page did not parse as expected
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Fetches a search URL and extracts the raw article records listed on it.
#[async_trait]
pub trait PageFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, url: &str) -> Result<Vec<RawArticle>, FetchError>;
}

//! Publishing composed posts to the microblogging platform.

mod http;
mod mock;

pub use http::HttpPoster;
pub use mock::MockPoster;

use async_trait::async_trait;

/// Errors publishing a post. Recoverable via the coordinator's bounded
/// linear-backoff retry; after max attempts the article is abandoned for the
/// cycle and picked up again when it reappears in a later fetch.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Network or HTTP transport error
    #[error("network error: {0}")]
    Network(String),

    /// The platform rejected or failed to accept the post
    #[error("platform error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        PublishError::Network(err.to_string())
    }
}

/// Publishes a post and returns the platform-issued post id.
///
/// Implementations own their credential/session concern entirely; the
/// coordinator's retry loop only re-invokes `publish`.
#[async_trait]
pub trait Poster: Send + Sync + std::fmt::Debug {
    async fn publish(&self, text: &str) -> Result<String, PublishError>;
}

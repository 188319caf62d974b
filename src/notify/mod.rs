//! Best-effort notification side channel.
//!
//! Notification failures are logged and never retried; they never block or
//! roll back the main publish path.

mod mock;
mod telegram;

pub use mock::{MockNotifier, SentMessage};
pub use telegram::TelegramNotifier;

use async_trait::async_trait;

/// Errors delivering a notification. Always best-effort: logged, never
/// retried.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Network or HTTP transport error
    #[error("network error: {0}")]
    Network(String),

    /// The messaging platform rejected the message
    #[error("messaging platform error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Network(err.to_string())
    }
}

/// Text formatting for an outgoing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Plain text, no markup interpretation
    Plain,
    /// Rich text with HTML markup
    Html,
}

/// An optional single inline button attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

impl LinkButton {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Sends a message to one recipient (a user id or a channel id).
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        format: MessageFormat,
        button: Option<&LinkButton>,
    ) -> Result<(), NotifyError>;
}

//! Telegram Bot API notifier.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::notify::{LinkButton, MessageFormat, Notifier, NotifyError};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Notifier delivering messages through the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>) -> Result<Self, NotifyError> {
        Self::with_base_url(token, TELEGRAM_API_URL)
    }

    /// Point the notifier at a different API host (for testing).
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        format: MessageFormat,
        button: Option<&LinkButton>,
    ) -> Result<(), NotifyError> {
        let mut body = serde_json::json!({
            "chat_id": recipient,
            "text": text,
        });
        if format == MessageFormat::Html {
            body["parse_mode"] = serde_json::json!("HTML");
        }
        if let Some(button) = button {
            body["reply_markup"] = serde_json::json!({
                "inline_keyboard": [[{ "text": button.label, "url": button.url }]],
            });
        }

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Network(format!("failed to reach Telegram: {}", e)))?;

        let status = response.status();
        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Api(format!("unexpected Telegram response: {}", e)))?;

        if !parsed.ok {
            return Err(NotifyError::Api(format!(
                "Telegram returned status {}: {}",
                status,
                parsed.description.unwrap_or_default()
            )));
        }

        Ok(())
    }
}

//! Bearer-token HTTP poster.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::post::{PublishError, Poster};

/// Poster for a JSON status-update endpoint authenticated with a bearer
/// token. Token auth is stateless, so there is no session to re-establish
/// between retry attempts.
#[derive(Debug, Clone)]
pub struct HttpPoster {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PublishResponse {
    data: PublishData,
}

#[derive(Debug, Deserialize)]
struct PublishData {
    id: String,
}

impl HttpPoster {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PublishError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl Poster for HttpPoster {
    async fn publish(&self, text: &str) -> Result<String, PublishError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| PublishError::Network(format!("failed to reach platform: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api(format!(
                "platform returned status {}: {}",
                status, body
            )));
        }

        let parsed: PublishResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(format!("unexpected platform response: {}", e)))?;

        Ok(parsed.data.id)
    }
}

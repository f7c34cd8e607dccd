//! Current-tag endpoint client

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, TagSourceError};
use crate::types::TagSnapshot;

/// Something that can report the game's current tag
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Fetch the current tag
    ///
    /// # Errors
    ///
    /// Returns `TagSourceError` when the endpoint is unreachable, answers with
    /// a non-success status, or sends a payload that is not a valid tag.
    async fn fetch(&self) -> Result<TagSnapshot>;
}

/// Tag source backed by the game's JSON endpoint
pub struct HttpTagSource {
    url: String,
    client: reqwest::Client,
}

impl HttpTagSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let client = crate::http::client(timeout).map_err(|e| TagSourceError::Request {
            url: url.clone(),
            reason: format!("could not build HTTP client: {}", e),
        })?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TagSource for HttpTagSource {
    async fn fetch(&self) -> Result<TagSnapshot> {
        tracing::debug!("Fetching current tag from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TagSourceError::Request {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TagSourceError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.text().await.map_err(|e| TagSourceError::Request {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        let tag: TagSnapshot = serde_json::from_str(&body)
            .map_err(|e| TagSourceError::Malformed(e.to_string()))?;

        Ok(tag)
    }
}

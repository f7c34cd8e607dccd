//! Mastodon publisher
//!
//! Uses the megalodon library, so any server speaking the Mastodon API
//! (Mastodon, Pleroma, Akkoma, GoToSocial) works.

use std::path::Path;

use async_trait::async_trait;
use megalodon::entities::UploadMedia;
use megalodon::megalodon::{
    GetAccountStatusesInputOptions, PostStatusInputOptions, PostStatusOutput,
    UploadMediaInputOptions,
};
use megalodon::{Megalodon, SNS};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::credentials::{CredentialSource, RefreshCredentials};
use crate::error::{ConfigError, CredentialError, PlatformError, Result};
use crate::platforms::{Connector, Publisher};
use crate::types::PublishedStatus;

/// Session on a Mastodon-compatible instance
pub struct MastodonClient {
    client: Box<dyn Megalodon + Send + Sync>,
    instance_url: String,
    /// Filled in by `authenticate`
    account: Option<AccountInfo>,
}

#[derive(Debug, Clone)]
struct AccountInfo {
    id: String,
    acct: String,
}

impl MastodonClient {
    /// Create an unauthenticated client for `instance_url`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if megalodon rejects the instance URL.
    pub fn new(instance_url: &str, access_token: String) -> Result<Self> {
        let instance_url = normalize_instance_url(instance_url);
        let client = megalodon::generator(
            SNS::Mastodon,
            instance_url.clone(),
            Some(access_token),
            Some(crate::http::USER_AGENT.to_string()),
        )
        .map_err(|e| ConfigError::InvalidValue {
            field: "mastodon.instance".to_string(),
            reason: format!("{:?}", e),
        })?;

        Ok(Self {
            client,
            instance_url,
            account: None,
        })
    }

    /// Verify the token and remember which account it belongs to
    pub async fn authenticate(&mut self) -> std::result::Result<(), PlatformError> {
        let response = self
            .client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(e, "verify credentials"))?;

        self.account = Some(AccountInfo {
            id: response.json.id,
            acct: response.json.acct,
        });
        Ok(())
    }

    /// `@user@instance` style handle, once authenticated
    pub fn handle(&self) -> Option<String> {
        let account = self.account.as_ref()?;
        let host = self
            .instance_url
            .split("://")
            .nth(1)
            .unwrap_or(self.instance_url.as_str())
            .trim_end_matches('/');
        Some(format!("@{}@{}", account.acct, host))
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    async fn account_id(&self) -> Result<String> {
        if let Some(account) = &self.account {
            return Ok(account.id.clone());
        }
        let response = self
            .client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(e, "verify credentials"))?;
        Ok(response.json.id)
    }
}

#[async_trait]
impl Publisher for MastodonClient {
    async fn verify(&self) -> Result<()> {
        self.client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(e, "verify credentials"))?;
        Ok(())
    }

    async fn latest_status_text(&self) -> Result<Option<String>> {
        let account_id = self.account_id().await?;
        let options = GetAccountStatusesInputOptions {
            limit: Some(1),
            exclude_reblogs: Some(true),
            ..Default::default()
        };

        let response = self
            .client
            .get_account_statuses(account_id, Some(&options))
            .await
            .map_err(|e| map_megalodon_error(e, "read timeline"))?;

        Ok(response.json.into_iter().next().map(|status| status.content))
    }

    async fn upload_media(&self, path: &Path, alt_text: &str) -> Result<String> {
        let options = UploadMediaInputOptions {
            description: Some(alt_text.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .upload_media(path.to_string_lossy().into_owned(), Some(&options))
            .await
            .map_err(|e| match map_megalodon_error(e, "upload media") {
                PlatformError::Posting(msg) => PlatformError::Upload(msg),
                other => other,
            })?;

        let media_id = match response.json {
            UploadMedia::Attachment(attachment) => attachment.id,
            UploadMedia::AsyncAttachment(attachment) => attachment.id,
        };
        Ok(media_id)
    }

    async fn post_status(&self, text: &str, media_ids: &[String]) -> Result<PublishedStatus> {
        let options = PostStatusInputOptions {
            media_ids: Some(media_ids.to_vec()),
            ..Default::default()
        };

        let response = self
            .client
            .post_status(text.to_string(), Some(&options))
            .await
            .map_err(|e| map_megalodon_error(e, "post status"))?;

        let published = match response.json {
            PostStatusOutput::Status(status) => PublishedStatus {
                id: status.id,
                url: status.url,
            },
            PostStatusOutput::ScheduledStatus(scheduled) => PublishedStatus {
                id: scheduled.id,
                url: None,
            },
        };
        Ok(published)
    }

    fn name(&self) -> &str {
        "mastodon"
    }
}

/// Opens Mastodon sessions from a credential file
pub struct MastodonConnector {
    instance_url: String,
    credentials: CredentialSource,
}

impl MastodonConnector {
    pub fn new(instance_url: String, credentials: CredentialSource) -> Self {
        Self {
            instance_url,
            credentials,
        }
    }

    async fn refresh_access_token(&self, refresh: RefreshCredentials<'_>) -> Result<String> {
        let client = megalodon::generator(
            SNS::Mastodon,
            normalize_instance_url(&self.instance_url),
            None,
            Some(crate::http::USER_AGENT.to_string()),
        )
        .map_err(|e| ConfigError::InvalidValue {
            field: "mastodon.instance".to_string(),
            reason: format!("{:?}", e),
        })?;

        let token = client
            .refresh_access_token(
                refresh.client_id.to_string(),
                refresh.client_secret.to_string(),
                refresh.refresh_token.to_string(),
            )
            .await
            .map_err(|e| CredentialError::Rejected(format!("token refresh failed: {}", e)))?;

        Ok(token.access_token)
    }
}

#[async_trait]
impl Connector for MastodonConnector {
    async fn connect(&self) -> Result<Box<dyn Publisher>> {
        let credentials = self.credentials.load()?;

        let mut client = MastodonClient::new(
            &self.instance_url,
            credentials.access_token.expose_secret().to_string(),
        )?;

        match client.authenticate().await {
            Ok(()) => {}
            Err(PlatformError::Authentication(reason)) => {
                let refresh = credentials
                    .refresh()
                    .ok_or_else(|| CredentialError::Rejected(reason.clone()))?;

                warn!("Access token rejected ({}), trying refresh token", reason);
                let token = self.refresh_access_token(refresh).await?;

                client = MastodonClient::new(&self.instance_url, token)?;
                client.authenticate().await.map_err(reject_auth)?;
            }
            Err(other) => return Err(other.into()),
        }

        info!(
            "Authenticated as: {}",
            client.handle().unwrap_or_else(|| "unknown account".to_string())
        );
        Ok(Box::new(client))
    }
}

/// Authentication failures during the credential exchange are fatal
fn reject_auth(error: PlatformError) -> crate::error::BiketagError {
    match error {
        PlatformError::Authentication(reason) => CredentialError::Rejected(reason).into(),
        other => other.into(),
    }
}

/// Ensure the instance URL carries a scheme, defaulting to https
fn normalize_instance_url(instance: &str) -> String {
    let trimmed = instance.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Map a megalodon error onto a `PlatformError`
///
/// HTTP failures carry their status code, which decides the class. Other
/// failures fall back to the message text.
fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> PlatformError {
    use megalodon::error::Error;

    match error {
        Error::OwnError(own) => match own.status {
            Some(status) => classify_status(status, &own.message, context),
            None => classify_message(&own.to_string(), context),
        },
        Error::RequestError(e) => match e.status() {
            Some(status) => classify_status(status.as_u16(), &e.to_string(), context),
            None => PlatformError::Network(format!("Mastodon request failed ({}): {}", context, e)),
        },
        other => classify_message(&other.to_string(), context),
    }
}

/// Classify an HTTP error response
///
/// - 401/403 → `Authentication`
/// - 422 → `Posting` (the server refused the content)
/// - 429 → `RateLimit`
/// - anything else, 5xx included → `Network`
fn classify_status(status: u16, detail: &str, context: &str) -> PlatformError {
    match status {
        401 | 403 => PlatformError::Authentication(format!(
            "Mastodon authentication failed ({}): HTTP {} {}",
            context, status, detail
        )),
        422 => PlatformError::Posting(format!(
            "Mastodon rejected the request ({}): HTTP {} {}",
            context, status, detail
        )),
        429 => PlatformError::RateLimit(format!(
            "Mastodon rate limit exceeded ({}): HTTP {} {}",
            context, status, detail
        )),
        500..=599 => PlatformError::Network(format!(
            "Mastodon server error ({}): HTTP {} {}",
            context, status, detail
        )),
        _ => PlatformError::Network(format!(
            "Mastodon HTTP error ({}): HTTP {} {}",
            context, status, detail
        )),
    }
}

/// Classify an error that has no HTTP status
fn classify_message(error_str: &str, context: &str) -> PlatformError {
    let error_lower = error_str.to_lowercase();

    if error_lower.contains("parse")
        || error_lower.contains("json")
        || error_lower.contains("deserialize")
    {
        PlatformError::Posting(format!(
            "Mastodon response parse error ({}): {}",
            context, error_str
        ))
    } else {
        PlatformError::Network(format!("Mastodon error ({}): {}", context, error_str))
    }
}

//! OAuth credential loading
//!
//! Credentials come from a `.env` file, parsed with `dotenvy` (`KEY=VALUE`
//! lines, `#` comments, quoting and `export` prefixes). Process environment variables with the same
//! names override the file. The file itself must exist: without it the
//! announcer refuses to start a session.
//!
//! # Keys
//!
//! - `access_token` (required): user token for the posting account
//! - `consumer_key` / `consumer_secret`: OAuth application id and secret
//! - `access_token_secret`: refresh token paired with `access_token`
//!
//! The last three are only needed to refresh a rejected access token.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::error::{CredentialError, Result};

pub const CONSUMER_KEY: &str = "consumer_key";
pub const CONSUMER_SECRET: &str = "consumer_secret";
pub const ACCESS_TOKEN: &str = "access_token";
pub const ACCESS_TOKEN_SECRET: &str = "access_token_secret";

/// Loaded OAuth credentials
///
/// Values are zeroed on drop and never printed by `Debug`.
pub struct Credentials {
    pub consumer_key: Option<SecretString>,
    pub consumer_secret: Option<SecretString>,
    pub access_token: SecretString,
    pub access_token_secret: Option<SecretString>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key.as_ref().map(|_| "[REDACTED]"))
            .field("consumer_secret", &self.consumer_secret.as_ref().map(|_| "[REDACTED]"))
            .field("access_token", &"[REDACTED]")
            .field(
                "access_token_secret",
                &self.access_token_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Client id, client secret and refresh token, when all three are present
pub struct RefreshCredentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

impl Credentials {
    pub fn refresh(&self) -> Option<RefreshCredentials<'_>> {
        Some(RefreshCredentials {
            client_id: self.consumer_key.as_ref()?.expose_secret(),
            client_secret: self.consumer_secret.as_ref()?.expose_secret(),
            refresh_token: self.access_token_secret.as_ref()?.expose_secret(),
        })
    }
}

/// A credential file plus environment overrides
#[derive(Debug, Clone)]
pub struct CredentialSource {
    path: PathBuf,
}

impl CredentialSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the credential file and apply environment overrides
    ///
    /// # Errors
    ///
    /// - `CredentialError::SourceMissing` if the file does not exist
    /// - `CredentialError::Unreadable` if it cannot be read
    /// - `CredentialError::MissingValue` if no `access_token` is available
    pub fn load(&self) -> Result<Credentials> {
        if !self.path.exists() {
            return Err(CredentialError::SourceMissing(self.path.clone()).into());
        }

        let unreadable = |e: dotenvy::Error| CredentialError::Unreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        let mut values = HashMap::new();
        for entry in dotenvy::from_path_iter(&self.path).map_err(unreadable)? {
            let (key, value) = entry.map_err(unreadable)?;
            values.insert(key, value);
        }

        for key in [CONSUMER_KEY, CONSUMER_SECRET, ACCESS_TOKEN, ACCESS_TOKEN_SECRET] {
            if let Ok(value) = std::env::var(key) {
                values.insert(key.to_string(), value);
            }
        }

        let mut take = |key: &str| {
            values
                .remove(key)
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
        };

        let consumer_key = take(CONSUMER_KEY);
        let consumer_secret = take(CONSUMER_SECRET);
        let access_token_secret = take(ACCESS_TOKEN_SECRET);
        let access_token = take(ACCESS_TOKEN)
            .ok_or_else(|| CredentialError::MissingValue(ACCESS_TOKEN.to_string()))?;

        Ok(Credentials {
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        })
    }
}

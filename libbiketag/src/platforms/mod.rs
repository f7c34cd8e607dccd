//! Social platform abstraction
//!
//! A [`Connector`] turns credentials into a verified session, which is a
//! [`Publisher`]: the handful of calls the announcer needs from the account it
//! posts with.
//!
//! # Examples
//!
//! ```no_run
//! use libbiketag::credentials::CredentialSource;
//! use libbiketag::platforms::{mastodon::MastodonConnector, Connector};
//!
//! # async fn example() -> libbiketag::error::Result<()> {
//! let connector = MastodonConnector::new(
//!     "https://mastodon.social".to_string(),
//!     CredentialSource::new(".env"),
//! );
//!
//! let session = connector.connect().await?;
//! if let Some(text) = session.latest_status_text().await? {
//!     println!("Last post: {}", text);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::PublishedStatus;

pub mod mastodon;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

/// An authenticated session on the posting account
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Check that the session is still accepted by the platform
    async fn verify(&self) -> Result<()>;

    /// Text of the account's most recent post, `None` when it has never posted
    async fn latest_status_text(&self) -> Result<Option<String>>;

    /// Upload an image and attach alt text, returning the platform media id
    async fn upload_media(&self, path: &Path, alt_text: &str) -> Result<String>;

    /// Publish a status with the given media attached
    async fn post_status(&self, text: &str, media_ids: &[String]) -> Result<PublishedStatus>;

    /// Lowercase platform identifier, e.g. "mastodon"
    fn name(&self) -> &str;
}

/// Establishes new sessions
#[async_trait]
pub trait Connector: Send + Sync {
    /// Load credentials and open a verified session
    ///
    /// # Errors
    ///
    /// `CredentialError` when the credential source is missing or the
    /// platform rejects the credentials (fatal); `PlatformError` for network
    /// trouble during the exchange (transient).
    async fn connect(&self) -> Result<Box<dyn Publisher>>;
}

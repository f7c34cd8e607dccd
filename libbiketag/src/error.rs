//! Error types for the BikeTag announcer

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BiketagError>;

#[derive(Error, Debug)]
pub enum BiketagError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Tag source error: {0}")]
    TagSource(#[from] TagSourceError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl BiketagError {
    /// Whether this error must end the process instead of restarting the poll loop
    ///
    /// Without usable credentials nothing downstream can succeed, so credential
    /// and configuration failures are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BiketagError::Credential(_) | BiketagError::Config(_))
    }

    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BiketagError::Credential(_) => 2,
            BiketagError::Config(_) => 1,
            BiketagError::TagSource(_) => 1,
            BiketagError::Media(_) => 1,
            BiketagError::Platform(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("OAuth keys {} not found. Aborting.", .0.display())]
    SourceMissing(PathBuf),

    #[error("Failed to read credential file {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Missing credential: {0}")]
    MissingValue(String),

    #[error("Failed to authorize user: {0}")]
    Rejected(String),
}

#[derive(Error, Debug, Clone)]
pub enum TagSourceError {
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Tag endpoint {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed tag payload: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Image download from {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Media upload failed: {0}")]
    Upload(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

//! Configuration management for the BikeTag announcer
//!
//! Every section is optional; missing sections and fields fall back to the
//! built-in defaults, and a missing config file means "all defaults".

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

pub const DEFAULT_TAG_SOURCE_URL: &str = "https://seattle.biketag.org/api/current";
pub const DEFAULT_MASTODON_INSTANCE: &str = "https://mastodon.social";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tag_source: TagSourceConfig,
    pub mastodon: MastodonConfig,
    pub credentials: CredentialsConfig,
    pub polling: PollingConfig,
    pub media: MediaConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagSourceConfig {
    pub url: String,
}

impl Default for TagSourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TAG_SOURCE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MastodonConfig {
    pub instance: String,
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            instance: DEFAULT_MASTODON_INSTANCE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// `.env`-style file holding the OAuth keys
    pub file: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            file: ".env".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub floor_minutes: u64,
    pub step_minutes: u64,
    pub overnight_ceiling_minutes: u64,
    pub afternoon_ceiling_minutes: u64,
    pub daytime_ceiling_minutes: u64,
    pub retry_wait_minutes: u64,
    /// IANA timezone used to read the hour of day; host local time when unset
    pub timezone: Option<String>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            floor_minutes: 5,
            step_minutes: 5,
            overnight_ceiling_minutes: 120,
            afternoon_ceiling_minutes: 30,
            daytime_ceiling_minutes: 60,
            retry_wait_minutes: 5,
            timezone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory for the downloaded tag image; system temp dir when unset
    pub scratch_dir: Option<String>,
    /// Longest side allowed before the image is scaled down
    pub max_dimension: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            max_dimension: 2200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file yields the default configuration.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let polling = &self.polling;

        if polling.floor_minutes == 0 {
            return Err(invalid("polling.floor_minutes", "must be at least 1"));
        }

        let ceilings = [
            ("polling.overnight_ceiling_minutes", polling.overnight_ceiling_minutes),
            ("polling.afternoon_ceiling_minutes", polling.afternoon_ceiling_minutes),
            ("polling.daytime_ceiling_minutes", polling.daytime_ceiling_minutes),
        ];
        for (field, ceiling) in ceilings {
            if ceiling < polling.floor_minutes {
                return Err(invalid(
                    field,
                    &format!("must not be below floor_minutes ({})", polling.floor_minutes),
                ));
            }
        }

        if let Some(tz) = &polling.timezone {
            tz.parse::<chrono_tz::Tz>()
                .map_err(|e| invalid("polling.timezone", &e.to_string()))?;
        }

        if self.tag_source.url.trim().is_empty() {
            return Err(ConfigError::MissingField("tag_source.url".to_string()).into());
        }

        if self.mastodon.instance.trim().is_empty() {
            return Err(ConfigError::MissingField("mastodon.instance".to_string()).into());
        }

        if self.media.max_dimension == 0 {
            return Err(invalid("media.max_dimension", "must be at least 1"));
        }

        Ok(())
    }

    /// Directory the media fetcher writes into
    pub fn scratch_dir(&self) -> PathBuf {
        match &self.media.scratch_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).to_string()),
            None => std::env::temp_dir(),
        }
    }

    /// Credential file path with `~` expanded
    pub fn credentials_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.credentials.file).to_string())
    }
}

fn invalid(field: &str, reason: &str) -> crate::error::BiketagError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("BIKETAG_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("biketag").join("config.toml"))
}

//! biketag-post - announce new Seattle BikeTag rounds on Mastodon
//!
//! Polls the game's current-tag endpoint and posts each new tag, with its
//! photo, to the configured account.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use libbiketag::backoff::BackoffPolicy;
use libbiketag::clock::SystemClock;
use libbiketag::credentials::CredentialSource;
use libbiketag::media::HttpMediaFetcher;
use libbiketag::poller::minutes;
use libbiketag::platforms::mastodon::MastodonConnector;
use libbiketag::tag_source::HttpTagSource;
use libbiketag::{BiketagError, Config, Poller};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "biketag-post")]
#[command(version)]
#[command(about = "Announce new Seattle BikeTag rounds on Mastodon")]
#[command(long_about = "\
biketag-post - announce new Seattle BikeTag rounds on Mastodon

DESCRIPTION:
    biketag-post is a long-running daemon. It polls the BikeTag current-tag
    endpoint, and whenever a new tag appears it downloads the tag photo and
    posts it with a caption. Before posting it reads the account's latest
    post, so restarting the daemon never announces the same tag twice.

    While nothing changes the poll interval grows from 5 minutes up to a
    ceiling that depends on the time of day (120 minutes overnight, 30 in
    the afternoon and evening, 60 otherwise). Errors are logged and the
    daemon starts over after 5 minutes.

CREDENTIALS:
    Read from .env in the working directory (see [credentials] below),
    overridden by environment variables of the same name:

    access_token          user access token (required)
    consumer_key          OAuth application client id
    consumer_secret       OAuth application client secret
    access_token_secret   refresh token for access_token

    A missing credential file or rejected credentials stop the daemon.

CONFIGURATION:
    Configuration file: $BIKETAG_CONFIG or ~/.config/biketag/config.toml
    (optional; built-in defaults are used when absent)

    [tag_source]
    url = \"https://seattle.biketag.org/api/current\"

    [mastodon]
    instance = \"https://mastodon.social\"

    [credentials]
    file = \".env\"

    [polling]
    timezone = \"America/Los_Angeles\"   # hour-of-day for the ceilings

LOGGING:
    BIKETAG_LOG_FORMAT   text | json | pretty (default: text)
    BIKETAG_LOG_LEVEL    error | warn | info | debug | trace (default: info)
    RUST_LOG             overrides BIKETAG_LOG_LEVEL

EXIT CODES:
    1 - Configuration error
    2 - Missing or rejected credentials
")]
struct Cli {}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    Cli::parse();
    libbiketag::logging::init_default();

    if let Err(e) = run().await {
        error!("{:#}", e);
        let code = e
            .downcast_ref::<BiketagError>()
            .map(BiketagError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let poller = build_poller(&config)?;

    info!("biketag-post starting");
    info!("Polling {}", config.tag_source.url);

    match poller.supervise().await {
        Ok(never) => match never {},
        Err(e) => Err(e.into()),
    }
}

/// Wire the production collaborators from configuration
fn build_poller(config: &Config) -> anyhow::Result<Poller> {
    let timeout = Duration::from_secs(config.http.timeout_secs);

    let source = HttpTagSource::new(config.tag_source.url.clone(), timeout)?;
    let media = HttpMediaFetcher::new(config.scratch_dir(), config.media.max_dimension, timeout)?;
    let connector = MastodonConnector::new(
        config.mastodon.instance.clone(),
        CredentialSource::new(config.credentials_path()),
    );
    let clock = SystemClock::from_name(config.polling.timezone.as_deref())?;

    Ok(Poller::new(
        Box::new(source),
        Box::new(media),
        Box::new(connector),
        Box::new(clock),
    )
    .with_policy(BackoffPolicy::from_config(&config.polling))
    .with_retry_wait(minutes(config.polling.retry_wait_minutes)))
}

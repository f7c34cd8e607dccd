//! Shared HTTP client construction

use std::time::Duration;

pub const USER_AGENT: &str = concat!("biketag-bot/", env!("CARGO_PKG_VERSION"));

/// Client with a per-request timeout so a stalled server cannot hang the poll loop
pub fn client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

//! The announcer's poll loop
//!
//! One cycle fetches the current tag and either waits (nothing new) or
//! announces it. Announcing is gated twice:
//!
//! 1. locally, against the highest tag this run has already handled, so a tag
//!    is only ever attempted once per run even if publishing fails; and
//! 2. remotely, against the tag number in the account's most recent post,
//!    which survives restarts and prevents double posting.
//!
//! [`Poller::supervise`] wraps the loop: transient errors are logged, the loop
//! waits a fixed retry interval and restarts with fresh state. Only fatal
//! (credential/config) errors escape.

use std::convert::Infallible;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::announcement;
use crate::backoff::BackoffPolicy;
use crate::clock::Clock;
use crate::error::Result;
use crate::media::MediaFetcher;
use crate::platforms::{Connector, Publisher};
use crate::tag_source::TagSource;
use crate::types::{PublishedStatus, TagSnapshot};

/// Minutes as a `Duration`, saturating instead of overflowing
pub fn minutes(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

/// Per-run state, rebuilt whenever the supervisor restarts the loop
pub struct PollState {
    /// Highest tag number handled in this run
    pub last_announced: u64,
    /// Wait before the next poll when nothing changes
    pub delay_minutes: u64,
    /// Cached session, verified before each use
    pub session: Option<Box<dyn Publisher>>,
}

impl PollState {
    pub fn new(policy: &BackoffPolicy) -> Self {
        Self {
            last_announced: 0,
            delay_minutes: policy.floor_minutes,
            session: None,
        }
    }
}

impl std::fmt::Debug for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollState")
            .field("last_announced", &self.last_announced)
            .field("delay_minutes", &self.delay_minutes)
            .field("session", &self.session.as_ref().map(|s| s.name()))
            .finish()
    }
}

/// What a single cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No newer tag; waited `waited_minutes` (the wait began at `hour`)
    NoChange { waited_minutes: u64, hour: u32 },
    /// The account's latest post already covers this tag
    AlreadyAnnounced { number: u64, remote_number: u64 },
    /// The tag was announced
    Published { number: u64, status: PublishedStatus },
}

/// Collaborators and policy for the poll loop
pub struct Poller {
    source: Box<dyn TagSource>,
    media: Box<dyn MediaFetcher>,
    connector: Box<dyn Connector>,
    clock: Box<dyn Clock>,
    policy: BackoffPolicy,
    retry_wait: Duration,
}

impl Poller {
    pub fn new(
        source: Box<dyn TagSource>,
        media: Box<dyn MediaFetcher>,
        connector: Box<dyn Connector>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            source,
            media,
            connector,
            clock,
            policy: BackoffPolicy::default(),
            retry_wait: Duration::from_secs(5 * 60),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_wait(mut self, retry_wait: Duration) -> Self {
        self.retry_wait = retry_wait;
        self
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Fresh state for a new run of the loop
    pub fn initial_state(&self) -> PollState {
        PollState::new(&self.policy)
    }

    /// Run the loop forever, restarting it after transient errors
    ///
    /// Returns only with a fatal error.
    pub async fn supervise(&self) -> Result<Infallible> {
        loop {
            let error = match self.run().await {
                Ok(never) => match never {},
                Err(e) => e,
            };

            if error.is_fatal() {
                return Err(error);
            }

            error!("{}", error);
            info!(
                "Restarting poll loop in {} minutes",
                self.retry_wait.as_secs() / 60
            );
            self.clock.sleep(self.retry_wait).await;
        }
    }

    /// Run cycles from a fresh state until one fails
    pub async fn run(&self) -> Result<Infallible> {
        let mut state = self.initial_state();
        loop {
            self.run_cycle(&mut state).await?;
        }
    }

    /// Fetch the current tag and wait or announce it
    pub async fn run_cycle(&self, state: &mut PollState) -> Result<CycleOutcome> {
        info!("Fetching current tag");
        let tag = self.source.fetch().await?;

        if tag.number <= state.last_announced {
            return Ok(self.wait(state).await);
        }

        info!("New tag detected: #{} by {}", tag.number, tag.credit);
        state.last_announced = tag.number;
        state.delay_minutes = self.policy.floor_minutes;

        let session = self.ensure_session(state.session.take()).await?;
        let publisher: &dyn Publisher = &**state.session.insert(session);

        let remote_number = publisher
            .latest_status_text()
            .await?
            .map(|text| announcement::announced_tag_number(&text))
            .unwrap_or(0);

        if remote_number >= tag.number {
            info!("Already posted tag number {}", remote_number);
            return Ok(CycleOutcome::AlreadyAnnounced {
                number: tag.number,
                remote_number,
            });
        }

        let status = self.publish(publisher, &tag).await?;
        info!("Posted tag #{} with id {}", tag.number, status.id);
        if let Some(url) = &status.url {
            info!("{}", url);
        }

        Ok(CycleOutcome::Published {
            number: tag.number,
            status,
        })
    }

    /// Sleep for the current delay, then grow it within the hour's ceiling
    async fn wait(&self, state: &mut PollState) -> CycleOutcome {
        let hour = self.clock.hour();
        let waited_minutes = state.delay_minutes;

        info!("Sleeping for {} minutes.", waited_minutes);
        self.clock
            .sleep(minutes(waited_minutes))
            .await;

        state.delay_minutes = self.policy.next_delay(waited_minutes, hour);
        CycleOutcome::NoChange {
            waited_minutes,
            hour,
        }
    }

    /// Reuse `cached` if it still verifies, otherwise connect anew
    async fn ensure_session(
        &self,
        cached: Option<Box<dyn Publisher>>,
    ) -> Result<Box<dyn Publisher>> {
        if let Some(session) = cached {
            match session.verify().await {
                Ok(()) => return Ok(session),
                Err(e) => warn!("Session verification failed, logging in again: {}", e),
            }
        }

        self.connector.connect().await
    }

    async fn publish(&self, publisher: &dyn Publisher, tag: &TagSnapshot) -> Result<PublishedStatus> {
        let image = self.media.fetch(&tag.full_image_url()).await?;

        let upload = publisher
            .upload_media(image.path(), &announcement::alt_text(tag))
            .await;
        drop(image);
        let media_id = upload?;

        publisher
            .post_status(&announcement::status_text(tag), &[media_id])
            .await
    }
}

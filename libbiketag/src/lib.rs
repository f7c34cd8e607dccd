//! BikeTag announcer
//!
//! Watches the Seattle BikeTag game for new tags and announces each one on a
//! Mastodon account, with the tag photo attached. The account's own timeline
//! doubles as the record of what has been announced, so restarts never post a
//! tag twice.

pub mod announcement;
pub mod backoff;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod logging;
pub mod media;
pub mod platforms;
pub mod poller;
pub mod tag_source;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{BiketagError, Result};
pub use poller::{CycleOutcome, PollState, Poller};
pub use types::{PublishedStatus, TagSnapshot};

//! Time source for the poll loop
//!
//! The loop only needs the current hour (to pick a backoff ceiling) and a way
//! to sleep. [`ManualClock`] is public so integration tests can drive the loop
//! without waiting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Timelike;
use chrono_tz::Tz;

use crate::error::{ConfigError, Result};

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current hour of day, 0-23
    fn hour(&self) -> u32;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock, read in a fixed timezone or in host local time
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    timezone: Option<Tz>,
}

impl SystemClock {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self { timezone }
    }

    /// Build from an optional IANA timezone name
    pub fn from_name(name: Option<&str>) -> Result<Self> {
        let timezone = name
            .map(|n| {
                n.parse::<Tz>().map_err(|e| ConfigError::InvalidValue {
                    field: "polling.timezone".to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        Ok(Self::new(timezone))
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn hour(&self) -> u32 {
        match self.timezone {
            Some(tz) => chrono::Utc::now().with_timezone(&tz).hour(),
            None => chrono::Local::now().hour(),
        }
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock with a settable hour that records sleeps instead of waiting
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    hour: Arc<Mutex<u32>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn at_hour(hour: u32) -> Self {
        let clock = Self::default();
        clock.set_hour(hour);
        clock
    }

    pub fn set_hour(&self, hour: u32) {
        *self.hour.lock().unwrap() = hour;
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    /// Requested sleeps in whole minutes
    pub fn sleep_minutes(&self) -> Vec<u64> {
        self.sleeps().iter().map(|d| d.as_secs() / 60).collect()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn hour(&self) -> u32 {
        *self.hour.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

//! Adaptive wait between polls of the tag endpoint
//!
//! The delay grows by a fixed step while nothing changes and is capped by a
//! ceiling that depends on the hour of day: long overnight, short in the
//! afternoon and evening when most tags get posted.

use crate::config::PollingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub floor_minutes: u64,
    pub step_minutes: u64,
    pub overnight_ceiling_minutes: u64,
    pub afternoon_ceiling_minutes: u64,
    pub daytime_ceiling_minutes: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            floor_minutes: config.floor_minutes,
            step_minutes: config.step_minutes,
            overnight_ceiling_minutes: config.overnight_ceiling_minutes,
            afternoon_ceiling_minutes: config.afternoon_ceiling_minutes,
            daytime_ceiling_minutes: config.daytime_ceiling_minutes,
        }
    }

    /// Maximum delay for a wait that begins at `hour` (0-23)
    pub fn ceiling(&self, hour: u32) -> u64 {
        if hour < 8 || hour > 20 {
            self.overnight_ceiling_minutes
        } else if hour > 14 && hour < 20 {
            self.afternoon_ceiling_minutes
        } else {
            self.daytime_ceiling_minutes
        }
    }

    /// Delay to use after a no-change wait of `current` minutes that began at `hour`
    ///
    /// A delay already above the ceiling is pulled down to it.
    pub fn next_delay(&self, current: u64, hour: u32) -> u64 {
        current
            .saturating_add(self.step_minutes)
            .min(self.ceiling(hour))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_buckets() {
        let policy = BackoffPolicy::default();

        for hour in [0, 3, 7, 21, 23] {
            assert_eq!(policy.ceiling(hour), 120, "hour {}", hour);
        }
        for hour in [15, 16, 19] {
            assert_eq!(policy.ceiling(hour), 30, "hour {}", hour);
        }
        for hour in [8, 10, 14, 20] {
            assert_eq!(policy.ceiling(hour), 60, "hour {}", hour);
        }
    }

    #[test]
    fn test_overnight_step() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.next_delay(55, 22), 60);
    }

    #[test]
    fn test_afternoon_clamps_down() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.next_delay(55, 16), 30);
    }

    #[test]
    fn test_growth_stops_at_ceiling() {
        let policy = BackoffPolicy::default();
        let mut delay = policy.floor_minutes;
        for _ in 0..50 {
            delay = policy.next_delay(delay, 10);
            assert!(delay <= 60);
        }
        assert_eq!(delay, 60);
    }

    #[test]
    fn test_zero_step_holds_delay() {
        let policy = BackoffPolicy {
            step_minutes: 0,
            ..BackoffPolicy::default()
        };
        assert_eq!(policy.next_delay(5, 3), 5);
    }
}

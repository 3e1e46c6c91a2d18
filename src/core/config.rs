//! # Ledger configuration.
//!
//! Provides [`LedgerConfig`], the settings consulted by
//! [`Ledger::reap`](crate::Ledger::reap).
//!
//! ## Sentinel values
//! - `stale_after = 0s` → reaping disabled (`reap` frees nothing; explicit
//!   `timeout` calls still work).

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Configuration for a [`Ledger`](crate::Ledger).
///
/// ## Field semantics
/// - `stale_after`: how long a task may go without a progress update before
///   [`Ledger::reap`](crate::Ledger::reap) treats it as abandoned. Staleness
///   is inferred purely from elapsed time since `updated_at`; there is no
///   heartbeat channel.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Age at which an active task counts as abandoned (`0s` = never).
    pub stale_after: Duration,
}

impl LedgerConfig {
    /// Returns the reap cutoff for the given current time, or `None` when
    /// reaping is disabled.
    #[inline]
    pub fn stale_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.stale_after.is_zero() {
            return None;
        }
        chrono::Duration::from_std(self.stale_after)
            .ok()
            .map(|age| now - age)
    }
}

impl Default for LedgerConfig {
    /// Default configuration:
    ///
    /// - `stale_after = 60s`
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cutoff_subtracts_stale_age() {
        let cfg = LedgerConfig {
            stale_after: Duration::from_secs(30),
        };
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(cfg.stale_cutoff(now), Some(now - chrono::Duration::seconds(30)));
    }

    #[test]
    fn test_zero_disables_reaping() {
        let cfg = LedgerConfig {
            stale_after: Duration::ZERO,
        };
        assert_eq!(cfg.stale_cutoff(Utc::now()), None);
    }
}

//! # Injectable time source.
//!
//! All registry timestamping goes through a [`Clock`] so that tests can pin
//! or advance time deterministically. A `Clock` is a cheap handle: clones
//! share the same override cell, so overriding through any handle affects
//! every component that was built from it.
//!
//! Without an override, `now()` reads the system clock.
//!
//! ## Example
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use taskledger::Clock;
//!
//! let clock = Clock::new();
//! let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
//!
//! clock.set_override(t0);
//! assert_eq!(clock.now(), t0);
//!
//! clock.advance(Duration::seconds(30));
//! assert_eq!(clock.now(), t0 + Duration::seconds(30));
//!
//! clock.clear_override();
//! assert!(clock.now() > t0);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Shared, overridable source of the current time.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    override_time: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl Clock {
    /// Creates a clock that follows the system time until overridden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current time: the override if one is set, otherwise
    /// the system clock.
    pub fn now(&self) -> DateTime<Utc> {
        match *self.override_time.read() {
            Some(t) => t,
            None => Utc::now(),
        }
    }

    /// Pins `now()` to a constant time until advanced or cleared.
    pub fn set_override(&self, time: DateTime<Utc>) {
        *self.override_time.write() = Some(time);
    }

    /// Moves the overridden time forward (or backward, with a negative
    /// delta). Has no effect unless an override is set.
    pub fn advance(&self, delta: Duration) {
        let mut slot = self.override_time.write();
        if let Some(current) = *slot {
            *slot = Some(current + delta);
        }
    }

    /// Removes the override; `now()` follows the system clock again.
    pub fn clear_override(&self) {
        *self.override_time.write() = None;
    }

    /// Returns true while an override is in effect.
    pub fn is_overridden(&self) -> bool {
        self.override_time.read().is_some()
    }
}

//! Sliding-window attempt throttle
//!
//! Counts attempts per key over a trailing window. The whole counter map sits
//! behind one mutex so the filter, count and append for a call happen as a
//! single step: two callers sharing a key can never both see room for the
//! last slot.
//!
//! # Usage Example
//!
//! ```rust
//! use usergate::core::auth::throttle::AttemptThrottle;
//! use std::time::Duration;
//!
//! let throttle = AttemptThrottle::new(2, Duration::from_secs(60));
//!
//! assert!(throttle.allow("login"));
//! assert!(throttle.allow("login"));
//! assert!(!throttle.allow("login"));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::core::config::Config;

/// Key used when the caller's origin is unknown
pub const DEFAULT_THROTTLE_KEY: &str = "login";

#[derive(Debug)]
pub struct AttemptThrottle {
    /// Attempts allowed per window
    limit: usize,
    window: Duration,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl AttemptThrottle {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.rate_limit, config.rate_limit_window())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an attempt for `key` now, returning `false` if over the limit
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Same as [`allow`](Self::allow) with an explicit clock reading.
    ///
    /// Denied attempts are not recorded.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let window_start = now.checked_sub(self.window);

        let timestamps = attempts.entry(key.to_string()).or_default();
        if let Some(start) = window_start {
            timestamps.retain(|t| *t > start);
        }

        if timestamps.len() >= self.limit {
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Forget keys with no attempt inside the window. Returns keys removed.
    pub fn prune_idle(&self, now: Instant) -> usize {
        let Some(start) = now.checked_sub(self.window) else {
            return 0;
        };

        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let before = attempts.len();
        attempts.retain(|_, timestamps| timestamps.iter().any(|t| *t > start));
        before - attempts.len()
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

//! Core rate limiter implementation.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::record::RequestRecord;

/// Configuration for a rate limiter.
///
/// Values are taken as given: a zero quota admits only the request that opens
/// each window, and a zero window expires immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Maximum admissions per window
    pub max_requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RateLimiterConfig {
    /// Create a new configuration.
    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }
}

/// Read-only view of one key's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitStatus {
    /// Quota per window
    pub limit: u32,
    /// Admissions left in the current window
    pub remaining: u32,
    /// End of the current window, if one is live
    pub reset_time: Option<i64>,
}

/// A fixed-window rate limiter keyed by arbitrary strings.
///
/// Each key gets its own window, anchored at the first admission after the
/// previous window ended. The limiter is thread-safe; admission checks on the
/// same key are serialized so the quota can never be overrun.
pub struct RateLimiter<C: Clock = SystemClock> {
    /// Quota and window length
    config: RateLimiterConfig,
    /// Live and stale records indexed by key
    records: DashMap<String, RequestRecord>,
    /// Time source
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// Create a new rate limiter on the system clock.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a new rate limiter with a custom time source.
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> Self {
        Self {
            config,
            records: DashMap::new(),
            clock,
        }
    }

    /// The configuration this limiter was built with.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Decide whether one more request for `key` may proceed.
    ///
    /// The request that opens a window is always admitted. Within a window,
    /// requests are admitted until `max_requests` is reached; denials do not
    /// consume quota.
    pub fn check_limit(&self, key: &str) -> bool {
        let now = self.clock.now_ms();

        trace!(key = %key, now = now, "Checking rate limit");

        match self.records.entry(key.to_owned()) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if record.is_expired(now) {
                    *record = RequestRecord::open(now, self.config.window_ms);
                    debug!(
                        key = %key,
                        reset_time = record.reset_time,
                        "Previous window expired, opening new window"
                    );
                    return true;
                }

                if record.try_admit(self.config.max_requests) {
                    true
                } else {
                    debug!(
                        key = %key,
                        count = record.count,
                        reset_time = record.reset_time,
                        "Rate limit exceeded"
                    );
                    false
                }
            }
            Entry::Vacant(entry) => {
                let record = entry.insert(RequestRecord::open(now, self.config.window_ms));
                debug!(
                    key = %key,
                    limit = self.config.max_requests,
                    reset_time = record.reset_time,
                    "Opening rate limit window"
                );
                true
            }
        }
    }

    /// Admissions left for `key` in its current window.
    ///
    /// Does not consume quota or touch the registry.
    pub fn get_remaining(&self, key: &str) -> u32 {
        self.status(key).remaining
    }

    /// When the current window for `key` ends, or `None` if there is no live
    /// window.
    pub fn get_reset_time(&self, key: &str) -> Option<i64> {
        self.status(key).reset_time
    }

    /// Snapshot of quota for `key`.
    pub fn status(&self, key: &str) -> LimitStatus {
        self.status_at(key, self.clock.now_ms())
    }

    fn status_at(&self, key: &str, now: i64) -> LimitStatus {
        let limit = self.config.max_requests;

        match self.records.get(key) {
            Some(record) if !record.is_expired(now) => LimitStatus {
                limit,
                remaining: record.remaining(limit),
                reset_time: Some(record.reset_time),
            },
            _ => LimitStatus {
                limit,
                remaining: limit,
                reset_time: None,
            },
        }
    }

    /// Whole seconds until `key` may be admitted again, rounded up.
    ///
    /// Returns 0 when there is no live window.
    pub fn retry_after_secs(&self, key: &str) -> u64 {
        let now = self.clock.now_ms();
        match self.status_at(key, now).reset_time {
            Some(reset_time) => u64::try_from(reset_time.saturating_sub(now))
                .unwrap_or(0)
                .div_ceil(1000),
            None => 0,
        }
    }

    /// Forget `key`. The next check opens a fresh window.
    pub fn reset(&self, key: &str) {
        if self.records.remove(key).is_some() {
            debug!(key = %key, "Rate limit reset");
        }
    }

    /// Forget every key.
    pub fn clear_all(&self) {
        self.records.clear();
    }

    /// Drop records whose window has ended, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut purged = 0;
        self.records.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        if purged > 0 {
            debug!(purged = purged, "Purged expired rate limit records");
        }
        purged
    }

    /// Number of records held, including expired ones not yet touched.
    pub fn tracked_keys(&self) -> usize {
        self.records.len()
    }
}

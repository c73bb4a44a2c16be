//! Per-key window bookkeeping.

/// Tracking entry for one key's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRecord {
    /// Admissions granted inside the current window
    pub count: u32,
    /// Milliseconds since the Unix epoch at which the window ends
    pub reset_time: i64,
}

impl RequestRecord {
    /// Open a new window at `now_ms`, counting the request that opened it.
    pub fn open(now_ms: i64, window_ms: u64) -> Self {
        let window_ms = i64::try_from(window_ms).unwrap_or(i64::MAX);
        Self {
            count: 1,
            reset_time: now_ms.saturating_add(window_ms),
        }
    }

    /// Whether the window has ended. A window is over at its reset time.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.reset_time <= now_ms
    }

    /// Count one more admission if the quota allows it.
    ///
    /// Returns `false` and leaves the count untouched once `max_requests`
    /// admissions have been granted.
    pub fn try_admit(&mut self, max_requests: u32) -> bool {
        if self.count < max_requests {
            self.count += 1;
            true
        } else {
            false
        }
    }

    /// Admissions still available in this window.
    pub fn remaining(&self, max_requests: u32) -> u32 {
        max_requests.saturating_sub(self.count)
    }
}

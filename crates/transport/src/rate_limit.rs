//! Per-session rate limiting. A
//! `parking_lot::Mutex`-guarded map of `RateLimitWindow`s with no
//! background sweep timer: a session's counter entry is removed when its
//! owning session tears down (`remove`), not on a fixed interval — this
//! bounds memory without a periodic sweep (see the design note this
//! resolves).

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use vsg_domain::rate_limit::{Admission, RateLimitWindow};

pub struct RateLimitOutcome {
    pub accepted: bool,
    pub retry_after_secs: u64,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateLimitWindow>>,
    cap: u32,
    window_ms: u64,
}

impl RateLimiter {
    pub fn new(cap: u32, window_ms: u64) -> Self {
        RateLimiter {
            windows: Mutex::new(HashMap::new()),
            cap,
            window_ms,
        }
    }

    pub fn admit(&self, session_id: &str) -> RateLimitOutcome {
        let mut windows = self.windows.lock();
        let window = windows
            .entry(session_id.to_string())
            .or_insert_with(|| RateLimitWindow::new(self.cap, self.window_ms));

        match window.admit(Utc::now()) {
            Admission::Accepted => RateLimitOutcome {
                accepted: true,
                retry_after_secs: 0,
            },
            Admission::Rejected { retry_after_secs } => RateLimitOutcome {
                accepted: false,
                retry_after_secs,
            },
        }
    }

    /// Called by the orchestrator on session teardown so the map does not
    /// grow unbounded across a long-running process.
    pub fn remove(&self, session_id: &str) {
        self.windows.lock().remove(session_id);
    }

    pub fn tracked_sessions(&self) -> usize {
        self.windows.lock().len()
    }
}

//! `RateLimitWindow` — per-session sliding counter.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone)]
pub struct RateLimitWindow {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
    window: Duration,
    cap: u32,
}

pub enum Admission {
    Accepted,
    Rejected { retry_after_secs: u64 },
}

impl RateLimitWindow {
    pub fn new(cap: u32, window_ms: u64) -> Self {
        let window = Duration::milliseconds(window_ms as i64);
        RateLimitWindow {
            count: 0,
            reset_at: Utc::now() + window,
            window,
            cap,
        }
    }

    /// Resets the window lazily when touched past `reset_at`, rather than on
    /// a background timer — see `vsg-transport::rate_limit`.
    pub fn admit(&mut self, now: DateTime<Utc>) -> Admission {
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + self.window;
        }
        if self.count >= self.cap {
            let retry_after_secs = (self.reset_at - now).num_milliseconds().max(0) as u64 / 1000 + 1;
            return Admission::Rejected { retry_after_secs };
        }
        self.count += 1;
        Admission::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_cap_then_rejects() {
        let mut w = RateLimitWindow::new(2, 1000);
        let now = Utc::now();
        assert!(matches!(w.admit(now), Admission::Accepted));
        assert!(matches!(w.admit(now), Admission::Accepted));
        assert!(matches!(w.admit(now), Admission::Rejected { .. }));
    }

    #[test]
    fn resets_after_window_elapses() {
        let mut w = RateLimitWindow::new(1, 1000);
        let now = Utc::now();
        assert!(matches!(w.admit(now), Admission::Accepted));
        assert!(matches!(w.admit(now), Admission::Rejected { .. }));
        let later = now + Duration::milliseconds(1001);
        assert!(matches!(w.admit(later), Admission::Accepted));
    }
}

//! Reconnection backoff math: fixed `base * 2^(attempt-1)`
//! formula, no jitter, no configurable multiplier — the endpoint's contract
//! pins the exact shape, unlike the jittered/configurable variant this was
//! adapted from.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl ReconnectPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        ReconnectPolicy {
            max_retries,
            base_delay_ms,
        }
    }

    /// `attempt` is 1-based (the first retry is attempt 1).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = 1u64 << attempt.saturating_sub(1).min(32);
        Duration::from_millis(self.base_delay_ms.saturating_mul(multiplier))
    }

    pub fn attempts_exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_retries
    }
}

// Bounded retry with exponential backoff for notification delivery.
// Exhaustion is terminal: the stage's notification is marked Failed and left
// for manual follow-up, it never rolls back an approval.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before the given retry (1-based: attempt 1 is the first retry
    /// after the initial try). Doubles per attempt, capped at `max_delay`,
    /// with up to 50% random jitter added when enabled.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let base = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay);
        if !self.jitter {
            return base;
        }
        let spread = base.as_millis() as u64 / 2;
        let extra = if spread == 0 {
            0
        } else {
            rand::rng().random_range(0..=spread)
        };
        (base + Duration::from_millis(extra)).min(self.max_delay)
    }
}

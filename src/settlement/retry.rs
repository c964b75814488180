use std::time::Duration;

/// Bounded retry with a fixed delay between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Delay before the next attempt, or `None` once `attempts_made` hits the cap.
    pub fn delay_after(&self, attempts_made: u32) -> Option<Duration> {
        (attempts_made < self.max_attempts).then_some(self.delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::fixed(6, Duration::from_secs(60))
    }
}

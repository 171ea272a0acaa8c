use std::time::Duration;
use tokio::time::sleep;

/// Reconnect delay that doubles per failed attempt, capped at `max_delay`
#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay: u64,
    max_delay: u64,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: u64, max: u64) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max,
            current_attempt: 0,
        }
    }

    /// Delay in seconds for the next attempt
    pub fn next_delay(&self) -> u64 {
        let factor = 2_u64.checked_pow(self.current_attempt).unwrap_or(u64::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub async fn sleep(&mut self) {
        let delay = self.next_delay();

        log::warn!("⏳ Retry attempt {} in {}s", self.current_attempt + 1, delay);

        sleep(Duration::from_secs(delay)).await;
        self.current_attempt = self.current_attempt.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

//! Decode-rate limiting.
//!
//! A token bucket caps how many frames per second reach the decoder. Frames
//! that arrive while the worker waits for a token are superseded as usual, so
//! limiting never builds a backlog.

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;

type DirectLimiter =
    GovLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Limiter for the decode attempts of one pipeline.
pub struct RateLimiter {
    limiter: DirectLimiter,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` decodes per second, evenly spaced.
    ///
    /// Returns `None` for a rate of zero, which means unlimited.
    pub fn new(rate: u32) -> Option<Self> {
        let rate = NonZeroU32::new(rate)?;
        Some(Self {
            limiter: GovLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN)),
        })
    }

    /// Wait until another decode is allowed.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_zero_rate_is_unlimited() {
        assert!(RateLimiter::new(0).is_none());
    }

    #[tokio::test]
    async fn test_first_wait_is_immediate() {
        let limiter = RateLimiter::new(1).unwrap();
        tokio::time::timeout(Duration::from_millis(200), limiter.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_second_wait_is_spaced() {
        let limiter = RateLimiter::new(10).unwrap();
        limiter.wait().await;

        let started = Instant::now();
        limiter.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}

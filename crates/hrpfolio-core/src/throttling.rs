//! Process-wide pacing of outbound upstream calls.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Global gate enforcing a minimum spacing between successive upstream calls.
///
/// Every fetch path shares one pacer; callers suspend in [`CallPacer::until_ready`]
/// until the spacing interval since the previous call has elapsed. Computation
/// stages never pass through the gate. The limiter state is a single
/// atomically-updated cell, so the pacer is cheap to clone and share.
#[derive(Clone)]
pub struct CallPacer {
    limiter: Arc<DirectRateLimiter>,
}

impl CallPacer {
    pub fn new(min_spacing: Duration) -> Self {
        let period = min_spacing.max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .expect("period is always greater than zero")
            .allow_burst(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Suspend until the caller may issue the next upstream call.
    pub async fn until_ready(&self) {
        self.limiter.until_ready().await;
    }

    /// Non-blocking eligibility probe. Consumes the slot on success.
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn first_call_is_immediately_eligible() {
        let pacer = CallPacer::new(Duration::from_secs(60));
        assert!(pacer.check());
        assert!(!pacer.check());
    }

    #[tokio::test]
    async fn sequential_calls_are_spaced_by_the_minimum_interval() {
        let pacer = CallPacer::new(Duration::from_millis(40));

        let started = Instant::now();
        for _ in 0..3 {
            pacer.until_ready().await;
        }
        // First slot is free; the remaining two each wait out the spacing.
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn clones_share_the_same_gate() {
        let pacer = CallPacer::new(Duration::from_secs(60));
        let clone = pacer.clone();

        assert!(pacer.check());
        assert!(!clone.check());
    }
}

//! Token-bucket rate limiter.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket bounding how many batches start per second.
///
/// The bucket starts full, refills continuously at the configured rate,
/// and `acquire` sleeps until a token is available.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(rate_per_sec: u32) -> Self {
        let capacity = f64::from(rate_per_sec.max(1));
        Self {
            capacity,
            refill_per_sec: capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, waiting for a refill if the bucket is empty.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_up_to_capacity_is_immediate() {
        let bucket = TokenBucket::new(5);
        let start = Instant::now();
        for _ in 0..5 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn acquire_waits_when_empty() {
        let bucket = TokenBucket::new(10);
        for _ in 0..10 {
            bucket.acquire().await;
        }
        let start = Instant::now();
        bucket.acquire().await;
        // Next token needs ~100ms at 10/sec
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}

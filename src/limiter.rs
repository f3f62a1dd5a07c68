use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
    cooloff_until: Option<Instant>,
}

/// A token-bucket rate limiter shared across every fetcher. `acquire` is a suspension
/// point: it waits until enough tokens have accumulated before deducting them.
/// `cooloff` pauses every acquirer for a fixed duration regardless of token state, used
/// when upstream signals throttling.
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(rate: f64, capacity: u32) -> Self {
        let rate = rate.max(0.1);
        let capacity = (capacity as f64).max(1.0);
        Self {
            rate,
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
                cooloff_until: None,
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;
    }

    /// Waits until `n` tokens are available, then deducts them.
    pub async fn acquire(&self, n: u32) {
        let n = n as f64;
        loop {
            let wait = {
                let mut guard = self.state.lock().await;
                if let Some(until) = guard.cooloff_until {
                    let now = Instant::now();
                    if now < until {
                        Some(until - now)
                    } else {
                        guard.cooloff_until = None;
                        None
                    }
                } else {
                    self.refill(&mut guard);
                    if guard.tokens >= n {
                        guard.tokens -= n;
                        None
                    } else {
                        let deficit = n - guard.tokens;
                        Some(Duration::from_secs_f64(deficit / self.rate))
                    }
                }
            };
            match wait {
                Some(d) => sleep(d).await,
                None => return,
            }
        }
    }

    /// Pauses all acquirers for `duration`, independent of token availability.
    pub async fn cooloff(&self, duration: Duration) {
        let mut guard = self.state.lock().await;
        let until = Instant::now() + duration;
        guard.cooloff_until = match guard.cooloff_until {
            Some(existing) if existing > until => Some(existing),
            _ => Some(until),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_drains_burst_immediately() {
        let limiter = RateLimiter::new(1000.0, 5);
        let start = Instant::now();
        limiter.acquire(5).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn acquire_waits_for_refill_beyond_capacity() {
        let limiter = RateLimiter::new(1000.0, 1);
        limiter.acquire(1).await;
        let start = Instant::now();
        limiter.acquire(1).await;
        assert!(start.elapsed() >= Duration::from_millis(1));
    }

    #[tokio::test]
    async fn cooloff_delays_next_acquire() {
        let limiter = RateLimiter::new(1000.0, 5);
        limiter.cooloff(Duration::from_millis(50)).await;
        let start = Instant::now();
        limiter.acquire(1).await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}

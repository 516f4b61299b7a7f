//! Client-side token-bucket rate limiting for transfer throughput.
//!
//! Complements the server-side `x-tos-traffic-limit` header: the header
//! caps what the service sends/accepts, this caps what the client itself
//! is willing to push through, useful when sharing a link with other
//! traffic the service has no visibility into.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Token-bucket limiter capping sustained throughput to a fixed rate.
///
/// Bursts are allowed up to one second's worth of budget.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Bucket>>,
}

struct Bucket {
    capacity: f64,
    tokens: f64,
    rate_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        self.last_refill = now;
    }
}

impl RateLimiter {
    /// Create a limiter allowing up to `bytes_per_sec` sustained throughput.
    pub fn new(bytes_per_sec: u64) -> Self {
        let rate = (bytes_per_sec as f64).max(1.0);
        Self {
            inner: Arc::new(Mutex::new(Bucket {
                capacity: rate,
                tokens: rate,
                rate_per_sec: rate,
                last_refill: Instant::now(),
            })),
        }
    }

    /// Block until `bytes` worth of budget is available, then consume it.
    pub async fn acquire(&self, bytes: u64) {
        let mut remaining = bytes as f64;
        loop {
            let wait = {
                let mut bucket = self.inner.lock().await;
                bucket.refill(Instant::now());
                if bucket.tokens >= remaining {
                    bucket.tokens -= remaining;
                    None
                } else {
                    remaining -= bucket.tokens;
                    bucket.tokens = 0.0;
                    Some(Duration::from_secs_f64(remaining / bucket.rate_per_sec))
                }
            };
            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }
}

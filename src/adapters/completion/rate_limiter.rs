use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Token bucket limiting how fast completion requests leave the process.
///
/// Capacity equals the refill rate, so a full bucket allows a one-second
/// burst. Tokens refill continuously.
#[derive(Clone)]
pub struct TokenBucketRateLimiter {
    bucket: Arc<Mutex<Bucket>>,
    capacity: f64,
    refill_rate: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucketRateLimiter {
    /// `requests_per_second` must be positive; config validation rejects
    /// anything else, and non-positive values are raised to one request per
    /// thousand seconds here.
    pub fn new(requests_per_second: f64) -> Self {
        let rate = requests_per_second.max(0.001);
        Self {
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: rate.max(1.0),
                last_refill: Instant::now(),
            })),
            capacity: rate.max(1.0),
            refill_rate: rate,
        }
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64(((1.0 - bucket.tokens) / self.refill_rate).max(0.01))
            };
            sleep(wait).await;
        }
    }

    #[cfg(test)]
    pub async fn available_tokens(&self) -> f64 {
        let bucket = self.bucket.lock().await;
        let elapsed = Instant::now().duration_since(bucket.last_refill).as_secs_f64();
        (bucket.tokens + elapsed * self.refill_rate).min(self.capacity)
    }
}

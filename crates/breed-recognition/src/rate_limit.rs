/// Token bucket guarding the classifier quota.
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    state: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    /// `None` when `rps` is zero, meaning unlimited.
    pub fn new(rps: u32) -> Option<Self> {
        (rps > 0).then(|| Self {
            rps,
            state: Arc::new(Mutex::new(Bucket {
                tokens: f64::from(rps),
                last: Instant::now(),
            })),
        })
    }

    /// Take one token, or explain how long to wait for the next one.
    pub async fn check(&self) -> Result<(), String> {
        let capacity = f64::from(self.rps);
        let mut bucket = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last);
        bucket.last = now;
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * capacity).min(capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / capacity);
        Err(format!(
            "rate limit exceeded ({} recognitions/s): try again in ~{}ms",
            self.rps,
            wait.as_millis()
        ))
    }
}

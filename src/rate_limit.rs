use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Gate awaited before every outbound detail request.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self);
}

/// Releases one permit per `interval`; the first permit is immediate.
#[derive(Debug)]
pub struct FixedInterval {
    interval: Duration,
    next_release: Mutex<Option<Instant>>,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_release: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RateLimiter for FixedInterval {
    async fn acquire(&self) {
        let mut next_release = self.next_release.lock().await;
        if let Some(at) = *next_release {
            tokio::time::sleep_until(at).await;
        }
        *next_release = Some(Instant::now() + self.interval);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self) {}
}

pub fn from_delay(delay: Duration) -> Box<dyn RateLimiter> {
    if delay.is_zero() {
        Box::new(Unlimited)
    } else {
        Box::new(FixedInterval::new(delay))
    }
}

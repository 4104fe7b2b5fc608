//! Per-registrable-domain token bucket rate limiter.
//!
//! Adapted from the embedding crate's sliding-window limiter: same
//! "acquire waits cooperatively, buckets keyed per caller" shape, but a
//! token bucket (refill rate + capacity) rather than a fixed request
//! window, and keyed per host rather than global to one provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
  pub per_domain: f64,
  pub capacity: u32,
  pub idle_gc: Duration,
}

impl From<&amelia_core::config::RateLimitConfig> for RateLimitConfig {
  fn from(c: &amelia_core::config::RateLimitConfig) -> Self {
    Self {
      per_domain: c.per_domain,
      capacity: c.capacity,
      idle_gc: Duration::from_secs(c.idle_gc_secs),
    }
  }
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self {
      per_domain: 1.0,
      capacity: 1,
      idle_gc: Duration::from_secs(300),
    }
  }
}

struct Bucket {
  tokens: f64,
  last_refill: Instant,
  last_used: Instant,
}

impl Bucket {
  fn new(capacity: u32) -> Self {
    let now = Instant::now();
    Self {
      tokens: capacity as f64,
      last_refill: now,
      last_used: now,
    }
  }

  fn refill(&mut self, refill_rate: f64, capacity: u32) {
    let now = Instant::now();
    let elapsed = now.duration_since(self.last_refill).as_secs_f64();
    self.tokens = (self.tokens + elapsed * refill_rate).min(capacity as f64);
    self.last_refill = now;
  }
}

/// Owned by the crawl coordinator, shared across worker tasks via a handle.
pub struct HostRateLimiter {
  config: RateLimitConfig,
  buckets: Mutex<HashMap<String, Bucket>>,
}

impl HostRateLimiter {
  pub fn new(config: RateLimitConfig) -> Arc<Self> {
    Arc::new(Self {
      config,
      buckets: Mutex::new(HashMap::new()),
    })
  }

  /// Waits until a token is available for `host`, consuming it. Cancellable
  /// at the `sleep` await point since callers run inside a cancellable task.
  pub async fn acquire(&self, host: &str) {
    loop {
      let wait = {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(host.to_string()).or_insert_with(|| Bucket::new(self.config.capacity));
        bucket.refill(self.config.per_domain, self.config.capacity);
        bucket.last_used = Instant::now();

        if bucket.tokens >= 1.0 {
          bucket.tokens -= 1.0;
          None
        } else {
          let deficit = 1.0 - bucket.tokens;
          Some(Duration::from_secs_f64(deficit / self.config.per_domain.max(f64::MIN_POSITIVE)))
        }
      };

      match wait {
        None => return,
        Some(duration) => {
          debug!(host, wait_ms = duration.as_millis(), "rate limit wait");
          sleep(duration).await;
        }
      }
    }
  }

  /// Drops buckets idle longer than `idle_gc`. Intended to be called
  /// periodically by the coordinator; losing bucket state is harmless.
  pub async fn gc(&self) {
    let cutoff = Instant::now() - self.config.idle_gc;
    let mut buckets = self.buckets.lock().await;
    buckets.retain(|_, b| b.last_used > cutoff);
  }

  #[cfg(test)]
  pub async fn bucket_count(&self) -> usize {
    self.buckets.lock().await.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn first_acquire_does_not_wait() {
    let limiter = HostRateLimiter::new(RateLimitConfig::default());
    let start = Instant::now();
    limiter.acquire("example.com").await;
    assert!(start.elapsed() < Duration::from_millis(50));
  }

  #[tokio::test]
  async fn second_immediate_acquire_waits_for_refill() {
    let limiter = HostRateLimiter::new(RateLimitConfig {
      per_domain: 20.0,
      capacity: 1,
      idle_gc: Duration::from_secs(60),
    });
    limiter.acquire("example.com").await;
    let start = Instant::now();
    limiter.acquire("example.com").await;
    assert!(start.elapsed() >= Duration::from_millis(40));
  }

  #[tokio::test]
  async fn distinct_hosts_have_independent_buckets() {
    let limiter = HostRateLimiter::new(RateLimitConfig::default());
    limiter.acquire("a.test").await;
    limiter.acquire("b.test").await;
    assert_eq!(limiter.bucket_count().await, 2);
  }

  #[tokio::test]
  async fn gc_drops_idle_buckets() {
    let limiter = HostRateLimiter::new(RateLimitConfig {
      per_domain: 1.0,
      capacity: 1,
      idle_gc: Duration::from_millis(10),
    });
    limiter.acquire("a.test").await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    limiter.gc().await;
    assert_eq!(limiter.bucket_count().await, 0);
  }
}

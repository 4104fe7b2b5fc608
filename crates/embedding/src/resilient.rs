//! Resilient HTTP client wrapper with retries and backoff
//!
//! - Exponential backoff with jitter
//! - Retry on 429, 502, 503, 504 status codes
//! - Network error and timeout detection and retry

use crate::{EmbeddingError, EmbeddingProvider};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
  pub max_retries: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
  pub backoff_multiplier: f64,
  pub add_jitter: bool,
  pub request_timeout: Duration,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_retries: 3,
      initial_backoff: Duration::from_secs(1),
      max_backoff: Duration::from_secs(30),
      backoff_multiplier: 2.0,
      add_jitter: true,
      request_timeout: Duration::from_secs(60),
    }
  }
}

impl RetryConfig {
  /// Config tuned for a fast local provider (e.g. an in-process or
  /// localhost embedding server).
  pub fn for_local() -> Self {
    Self {
      max_retries: 2,
      initial_backoff: Duration::from_millis(500),
      max_backoff: Duration::from_secs(5),
      backoff_multiplier: 2.0,
      add_jitter: true,
      request_timeout: Duration::from_secs(30),
    }
  }

  /// Config tuned for a remote/cloud provider.
  pub fn for_cloud() -> Self {
    Self {
      max_retries: 5,
      initial_backoff: Duration::from_secs(1),
      max_backoff: Duration::from_secs(60),
      backoff_multiplier: 2.0,
      add_jitter: true,
      request_timeout: Duration::from_secs(120),
    }
  }

  pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
    let base = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
    let mut backoff = Duration::from_secs_f64(base.min(self.max_backoff.as_secs_f64()));

    if self.add_jitter {
      let jitter_factor = 1.0 + (rand::thread_rng().gen::<f64>() * 0.25);
      backoff = Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor);
    }

    backoff.min(self.max_backoff)
  }
}

pub fn is_retryable_error(error: &EmbeddingError) -> bool {
  match error {
    EmbeddingError::Network(_) => true,
    EmbeddingError::ProviderError(msg) => {
      msg.contains("429") || msg.contains("502") || msg.contains("503") || msg.contains("504")
    }
    EmbeddingError::Timeout => true,
    _ => false,
  }
}

/// Wraps another provider with retry logic. `ResilientProvider` is itself an
/// `EmbeddingProvider`, so callers compose it the same way they would the
/// underlying provider.
pub struct ResilientProvider<P: EmbeddingProvider> {
  inner: P,
  config: RetryConfig,
}

impl<P: EmbeddingProvider> ResilientProvider<P> {
  pub fn new(provider: P) -> Self {
    Self {
      inner: provider,
      config: RetryConfig::default(),
    }
  }

  pub fn with_config(provider: P, config: RetryConfig) -> Self {
    Self {
      inner: provider,
      config,
    }
  }

  async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let backoff = self.config.backoff_for_attempt(attempt - 1);
        debug!("retry attempt {} after {:?}", attempt, backoff);
        sleep(backoff).await;
      }

      match tokio::time::timeout(self.config.request_timeout, self.inner.embed(text)).await {
        Ok(Ok(result)) => return Ok(result),
        Ok(Err(e)) => {
          if is_retryable_error(&e) && attempt < self.config.max_retries {
            warn!("retryable error on attempt {}: {}", attempt + 1, e);
            last_error = Some(e);
            continue;
          }
          return Err(e);
        }
        Err(_) => {
          warn!("request timed out on attempt {}", attempt + 1);
          last_error = Some(EmbeddingError::Timeout);
          if attempt < self.config.max_retries {
            continue;
          }
        }
      }
    }

    Err(last_error.unwrap_or_else(|| EmbeddingError::ProviderError("max retries exceeded".to_string())))
  }
}

#[async_trait]
impl<P: EmbeddingProvider + Send + Sync> EmbeddingProvider for ResilientProvider<P> {
  fn name(&self) -> &str {
    self.inner.name()
  }

  fn model_id(&self) -> &str {
    self.inner.model_id()
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    self.embed_with_retry(text).await
  }

  async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut results = Vec::with_capacity(texts.len());
    for text in texts {
      results.push(self.embed_with_retry(text).await?);
    }
    Ok(results)
  }

  async fn is_available(&self) -> bool {
    self.inner.is_available().await
  }
}

pub fn wrap_resilient<P: EmbeddingProvider>(provider: P) -> ResilientProvider<P> {
  ResilientProvider::new(provider)
}

pub fn wrap_resilient_arc<P>(provider: P) -> Arc<dyn EmbeddingProvider + Send + Sync>
where
  P: EmbeddingProvider + Send + Sync + 'static,
{
  Arc::new(ResilientProvider::new(provider))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn retry_config_defaults() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.initial_backoff, Duration::from_secs(1));
    assert_eq!(config.max_backoff, Duration::from_secs(30));
  }

  #[test]
  fn retry_config_for_local() {
    let config = RetryConfig::for_local();
    assert_eq!(config.max_retries, 2);
    assert!(config.initial_backoff < Duration::from_secs(1));
  }

  #[test]
  fn retry_config_for_cloud() {
    let config = RetryConfig::for_cloud();
    assert_eq!(config.max_retries, 5);
    assert!(config.max_backoff > Duration::from_secs(30));
  }

  #[test]
  fn backoff_calculation_without_jitter() {
    let config = RetryConfig {
      initial_backoff: Duration::from_secs(1),
      backoff_multiplier: 2.0,
      max_backoff: Duration::from_secs(60),
      add_jitter: false,
      ..Default::default()
    };

    assert_eq!(config.backoff_for_attempt(0), Duration::from_secs(1));
    assert_eq!(config.backoff_for_attempt(1), Duration::from_secs(2));
    assert_eq!(config.backoff_for_attempt(2), Duration::from_secs(4));
    assert_eq!(config.backoff_for_attempt(3), Duration::from_secs(8));
  }

  #[test]
  fn backoff_respects_max() {
    let config = RetryConfig {
      initial_backoff: Duration::from_secs(10),
      backoff_multiplier: 10.0,
      max_backoff: Duration::from_secs(30),
      add_jitter: false,
      ..Default::default()
    };

    assert_eq!(config.backoff_for_attempt(2), Duration::from_secs(30));
  }

  #[test]
  fn retryable_errors_are_classified_correctly() {
    assert!(is_retryable_error(&EmbeddingError::Network("connection reset".to_string())));
    assert!(is_retryable_error(&EmbeddingError::Timeout));
    assert!(is_retryable_error(&EmbeddingError::ProviderError("Status 429".to_string())));
    assert!(is_retryable_error(&EmbeddingError::ProviderError("Got 503".to_string())));
    assert!(!is_retryable_error(&EmbeddingError::ProviderError("Invalid input".to_string())));
    assert!(!is_retryable_error(&EmbeddingError::ProviderError("Status 400".to_string())));
  }
}

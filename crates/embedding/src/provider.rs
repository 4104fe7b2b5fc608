use amelia_core::EMBEDDING_DIM;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Device an embedding provider should run its model on. Purely advisory for
/// remote providers; local providers use it to pick a compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
  Cpu,
  Cuda,
}

impl From<amelia_core::EmbeddingDevice> for Device {
  fn from(d: amelia_core::EmbeddingDevice) -> Self {
    match d {
      amelia_core::EmbeddingDevice::Cpu => Device::Cpu,
      amelia_core::EmbeddingDevice::Cuda => Device::Cuda,
    }
  }
}

/// `embed_batch(texts, {device, batch_size}) -> [vector(1024)]`. The model
/// and dimension are fixed for the deployment: every vector returned must
/// have exactly [`EMBEDDING_DIM`] elements.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
  fn name(&self) -> &str;
  fn model_id(&self) -> &str;

  fn dimensions(&self) -> usize {
    EMBEDDING_DIM
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

  /// Embeds a batch of texts in one call where the provider supports it.
  /// Implementations that lack native batching should still honor
  /// `batch_size` by chunking their own requests accordingly.
  async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

  async fn is_available(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
  #[error("provider not available")]
  NotAvailable,
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),
  #[error("provider error: {0}")]
  ProviderError(String),
  #[error("network error: {0}")]
  Network(String),
  #[error("request timed out")]
  Timeout,
  #[error("expected {expected} dimensions, got {got}")]
  DimensionMismatch { expected: usize, got: usize },
}

impl amelia_core::Classify for EmbeddingError {
  fn kind(&self) -> amelia_core::FailureKind {
    match self {
      EmbeddingError::NotAvailable | EmbeddingError::Network(_) | EmbeddingError::Timeout => {
        amelia_core::FailureKind::TransientExternal
      }
      EmbeddingError::Request(_) => amelia_core::FailureKind::TransientExternal,
      EmbeddingError::ProviderError(_) => amelia_core::FailureKind::TransientExternal,
      EmbeddingError::DimensionMismatch { .. } => amelia_core::FailureKind::ConfigurationError,
    }
  }
}

/// Validates a batch of provider output against the deployment-fixed
/// dimension contract.
pub fn validate_dimensions(vectors: &[Vec<f32>]) -> Result<(), EmbeddingError> {
  for v in vectors {
    if v.len() != EMBEDDING_DIM {
      return Err(EmbeddingError::DimensionMismatch {
        expected: EMBEDDING_DIM,
        got: v.len(),
      });
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validate_dimensions_rejects_wrong_length() {
    let vectors = vec![vec![0.0; EMBEDDING_DIM], vec![0.0; 3]];
    let err = validate_dimensions(&vectors).unwrap_err();
    assert!(matches!(err, EmbeddingError::DimensionMismatch { got: 3, .. }));
  }

  #[test]
  fn validate_dimensions_accepts_correct_length() {
    let vectors = vec![vec![0.0; EMBEDDING_DIM]];
    assert!(validate_dimensions(&vectors).is_ok());
  }
}

use crate::{EmbeddingError, EmbeddingProvider};
use amelia_core::EMBEDDING_DIM;
use async_trait::async_trait;

/// Deterministic in-process provider for tests: derives a vector from the
/// text's byte length so repeated calls on the same input are stable.
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingProvider {
  pub available: bool,
}

impl MockEmbeddingProvider {
  pub fn new() -> Self {
    Self { available: true }
  }

  fn vector_for(text: &str) -> Vec<f32> {
    let seed = text.len() as f32;
    (0..EMBEDDING_DIM).map(|i| ((seed + i as f32) % 97.0) / 97.0).collect()
  }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
  fn name(&self) -> &str {
    "mock"
  }

  fn model_id(&self) -> &str {
    "mock-1024"
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    if !self.available {
      return Err(EmbeddingError::NotAvailable);
    }
    Ok(Self::vector_for(text))
  }

  async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if !self.available {
      return Err(EmbeddingError::NotAvailable);
    }
    Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
  }

  async fn is_available(&self) -> bool {
    self.available
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn vectors_have_fixed_dimension() {
    let provider = MockEmbeddingProvider::new();
    let v = provider.embed("hello").await.unwrap();
    assert_eq!(v.len(), EMBEDDING_DIM);
  }

  #[tokio::test]
  async fn same_text_yields_same_vector() {
    let provider = MockEmbeddingProvider::new();
    let a = provider.embed("repeat me").await.unwrap();
    let b = provider.embed("repeat me").await.unwrap();
    assert_eq!(a, b);
  }

  #[tokio::test]
  async fn unavailable_provider_errors() {
    let provider = MockEmbeddingProvider { available: false };
    assert!(provider.embed("x").await.is_err());
  }
}

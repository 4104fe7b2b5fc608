use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ids::{ChunkId, EmbeddingId};

/// Fixed embedding dimension for the deployment; rejecting any other length
/// is the startup-time invariant §9 of the spec calls for.
pub const EMBEDDING_DIM: usize = 1024;

/// Exactly one dense vector per chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
  pub id: EmbeddingId,
  pub chunk_id: ChunkId,
  pub vector: Vec<f32>,
  pub model_name: String,
}

impl Embedding {
  pub fn new(chunk_id: ChunkId, vector: Vec<f32>, model_name: impl Into<String>) -> Result<Self, Error> {
    if vector.len() != EMBEDDING_DIM {
      return Err(Error::Configuration(format!(
        "embedding dimension mismatch: expected {EMBEDDING_DIM}, got {}",
        vector.len()
      )));
    }
    Ok(Self {
      id: EmbeddingId::new(),
      chunk_id,
      vector,
      model_name: model_name.into(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_wrong_dimension() {
    let err = Embedding::new(ChunkId::new(), vec![0.0; 3], "test-model");
    assert!(err.is_err());
  }

  #[test]
  fn accepts_correct_dimension() {
    let emb = Embedding::new(ChunkId::new(), vec![0.0; EMBEDDING_DIM], "test-model").unwrap();
    assert_eq!(emb.vector.len(), EMBEDDING_DIM);
  }
}

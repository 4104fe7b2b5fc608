use amelia_core::{Classify, FailureKind};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
  #[error("empty query")]
  EmptyQuery,
  #[error("store error: {0}")]
  Store(#[from] amelia_db::DbError),
  #[error("embedding error: {0}")]
  Embedding(#[from] amelia_embedding::EmbeddingError),
  #[error("core error: {0}")]
  Core(#[from] amelia_core::Error),
  #[error("rerank error: {0}")]
  Rerank(String),
}

impl Classify for SearchError {
  fn kind(&self) -> FailureKind {
    match self {
      SearchError::EmptyQuery => FailureKind::PermanentInput,
      SearchError::Store(e) => e.kind(),
      SearchError::Embedding(e) => e.kind(),
      SearchError::Core(e) => e.kind(),
      SearchError::Rerank(_) => FailureKind::TransientExternal,
    }
  }
}

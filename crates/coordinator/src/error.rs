use amelia_core::{Classify, FailureKind};

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
  #[error("store: {0}")]
  Store(#[from] amelia_db::DbError),
  #[error("ingest: {0}")]
  Ingest(#[from] amelia_ingest::IngestError),
  #[error("crawl: {0}")]
  Crawl(#[from] amelia_crawl::CrawlError),
  #[error("embedding: {0}")]
  Embedding(#[from] amelia_embedding::EmbeddingError),
  #[error("core: {0}")]
  Core(#[from] amelia_core::Error),
  #[error("malformed job metadata: {0}")]
  BadMetadata(#[from] serde_json::Error),
}

impl Classify for CoordinatorError {
  fn kind(&self) -> FailureKind {
    match self {
      CoordinatorError::Store(e) => e.kind(),
      CoordinatorError::Ingest(e) => e.kind(),
      CoordinatorError::Crawl(e) => e.kind(),
      CoordinatorError::Embedding(e) => e.kind(),
      CoordinatorError::Core(e) => e.kind(),
      CoordinatorError::BadMetadata(_) => FailureKind::PermanentInput,
    }
  }
}

use amelia_core::{Classify, FailureKind};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
  #[error("unsupported file type: {0}")]
  UnsupportedFileType(String),
  #[error("store error: {0}")]
  Store(#[from] amelia_db::DbError),
  #[error("embedding error: {0}")]
  Embedding(#[from] amelia_embedding::EmbeddingError),
  #[error("core error: {0}")]
  Core(#[from] amelia_core::Error),
  #[error("asr error: {0}")]
  Asr(String),
  #[error("media inspection error: {0}")]
  Media(String),
  #[error("cancelled")]
  Cancelled,
}

impl Classify for IngestError {
  fn kind(&self) -> FailureKind {
    match self {
      IngestError::Io(_) => FailureKind::TransientExternal,
      IngestError::UnsupportedFileType(_) => FailureKind::PermanentInput,
      IngestError::Store(e) => e.kind(),
      IngestError::Embedding(e) => e.kind(),
      IngestError::Core(e) => e.kind(),
      IngestError::Asr(_) => FailureKind::TransientExternal,
      IngestError::Media(_) => FailureKind::PermanentInput,
      IngestError::Cancelled => FailureKind::Cancellation,
    }
  }
}

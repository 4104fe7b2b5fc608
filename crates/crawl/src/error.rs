use amelia_core::{Classify, FailureKind};

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
  #[error("invalid url: {0}")]
  InvalidUrl(#[from] url::ParseError),
  #[error("fetch error: {0}")]
  Fetch(String),
  #[error("robots.txt disallows this url")]
  RobotsDisallowed,
  #[error("store error: {0}")]
  Store(#[from] amelia_db::DbError),
  #[error("ingest error: {0}")]
  Ingest(#[from] amelia_ingest::IngestError),
  #[error("core error: {0}")]
  Core(#[from] amelia_core::Error),
  #[error("cancelled")]
  Cancelled,
}

impl Classify for CrawlError {
  fn kind(&self) -> FailureKind {
    match self {
      CrawlError::InvalidUrl(_) => FailureKind::PermanentInput,
      CrawlError::Fetch(_) => FailureKind::TransientExternal,
      CrawlError::RobotsDisallowed => FailureKind::PermanentInput,
      CrawlError::Store(e) => e.kind(),
      CrawlError::Ingest(e) => e.kind(),
      CrawlError::Core(e) => e.kind(),
      CrawlError::Cancelled => FailureKind::Cancellation,
    }
  }
}

pub mod chunk;
pub mod collection;
pub mod config;
pub mod crawl;
pub mod document;
pub mod embedding;
pub mod error;
pub mod ids;
pub mod job;
pub mod logfields;
pub mod validation;

pub use chunk::{Chunk, ChunkMetadata, is_contiguous};
pub use collection::{Collection, DEFAULT_COLLECTION};
pub use config::{Config, EmbeddingDevice};
pub use crawl::{CrawlQueueEntry, CrawlStatus, CrawledUrl, retry_backoff_seconds};
pub use document::{Document, SourceType};
pub use embedding::{EMBEDDING_DIM, Embedding};
pub use error::{Classify, Error, FailureKind, Result};
pub use ids::{ChunkId, DocumentId, EmbeddingId, JobId};
pub use job::{Job, JobStatus, JobType, backoff_seconds};
pub use validation::{
  ValidationError, ValidationResult, optional_array, optional_bool, optional_enum, optional_f64, optional_f64_range,
  optional_i64, optional_i64_range, optional_string, optional_string_array, optional_string_min, optional_u64,
  require_array, require_bool, require_enum, require_f64, require_f64_range, require_i64, require_i64_range,
  require_string, require_string_array, require_string_min, require_string_range, require_u64,
};

/// ISO language code to Postgres full-text-search configuration name.
/// Unknown codes fall back to `"english"`.
pub fn fts_config_for_iso(code: &str) -> &'static str {
  match code.to_lowercase().as_str() {
    "en" => "english",
    "es" => "spanish",
    "fr" => "french",
    "de" => "german",
    "pt" => "portuguese",
    "it" => "italian",
    "ru" => "russian",
    "nl" => "dutch",
    "sv" => "swedish",
    "no" => "norwegian",
    "da" => "danish",
    "fi" => "finnish",
    _ => "english",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_iso_code_falls_back_to_english() {
    assert_eq!(fts_config_for_iso("xx"), "english");
    assert_eq!(fts_config_for_iso("es"), "spanish");
  }
}

use amelia_core::{ChunkId, ChunkMetadata, DocumentId, SourceType};
use serde::{Deserialize, Serialize};

/// Caller-facing narrowing; translated into `amelia_db::SearchFilters` at
/// the query boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
  pub source_type: Option<SourceType>,
  pub file_type: Option<String>,
  pub domain: Option<String>,
  pub language: Option<String>,
}

impl From<&Filters> for amelia_db::SearchFilters {
  fn from(f: &Filters) -> Self {
    amelia_db::SearchFilters {
      source_type: f.source_type,
      file_type: f.file_type.clone(),
      domain: f.domain.clone(),
      language: f.language.clone(),
    }
  }
}

/// Retrieval strategy. `Auto` is resolved to one of the others before any
/// store call is made; the resolved value is reported back as
/// `strategy_used`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
  #[default]
  Auto,
  Vector,
  Hybrid,
  Contextual,
}

/// One ranked chunk. Scores are strategy-specific and not comparable across
/// strategies; only ranks are guaranteed monotonic with relevance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
  pub chunk_id: ChunkId,
  pub document_id: DocumentId,
  pub content: String,
  pub headers: Option<String>,
  pub metadata: ChunkMetadata,
  pub score: f64,
  pub source_type: SourceType,
  pub source_path: Option<String>,
  pub source_url: Option<String>,
  pub start_timestamp: Option<f64>,
  pub end_timestamp: Option<f64>,
}

impl From<amelia_db::SearchRow> for Hit {
  fn from(row: amelia_db::SearchRow) -> Self {
    Hit {
      chunk_id: row.chunk.id,
      document_id: row.document_id,
      content: row.chunk.content,
      headers: row.chunk.headers,
      metadata: row.chunk.metadata,
      score: row.score,
      source_type: row.source_type,
      source_path: row.source_path,
      source_url: row.source_url,
      start_timestamp: row.chunk.start_timestamp,
      end_timestamp: row.chunk.end_timestamp,
    }
  }
}

use amelia_core::{Chunk, ChunkId, ChunkMetadata, DocumentId, SourceType};
use pgvector::Vector;
use sqlx::FromRow;
use uuid::Uuid;

use crate::connection::{DbError, Result, Store};

/// Optional narrowing applied at the SQL layer before ranking. `domain`
/// matches the `domain_of()` of a web document's `source_url`; `language`
/// matches either the chunk's own `metadata.language` or the parent
/// document's `language_detected`.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
  pub source_type: Option<SourceType>,
  pub file_type: Option<String>,
  pub domain: Option<String>,
  pub language: Option<String>,
}

/// One ranked chunk, joined with enough of its parent document to build a
/// `search_documents` hit without a second round-trip.
#[derive(Debug, Clone)]
pub struct SearchRow {
  pub chunk: Chunk,
  pub document_id: DocumentId,
  pub source_type: SourceType,
  pub source_path: Option<String>,
  pub source_url: Option<String>,
  pub score: f64,
}

#[derive(FromRow)]
struct Row2 {
  chunk_id: Uuid,
  document_id: Uuid,
  chunk_index: i32,
  content: String,
  char_count: i32,
  word_count: i32,
  headers: Option<String>,
  metadata: serde_json::Value,
  start_timestamp: Option<f64>,
  end_timestamp: Option<f64>,
  source_type: String,
  source_path: Option<String>,
  source_url: Option<String>,
  score: f64,
}

impl TryFrom<Row2> for SearchRow {
  type Error = DbError;

  fn try_from(row: Row2) -> Result<Self> {
    let metadata: ChunkMetadata = serde_json::from_value(row.metadata)?;
    let chunk = Chunk {
      id: ChunkId::from_uuid(row.chunk_id),
      document_id: DocumentId::from_uuid(row.document_id),
      chunk_index: row.chunk_index,
      content: row.content,
      char_count: row.char_count,
      word_count: row.word_count,
      headers: row.headers,
      metadata,
      start_timestamp: row.start_timestamp,
      end_timestamp: row.end_timestamp,
    };
    let source_type = row
      .source_type
      .parse::<SourceType>()
      .map_err(|e| DbError::NotFound(format!("invalid source_type in row: {e}")))?;
    Ok(SearchRow {
      chunk,
      document_id: DocumentId::from_uuid(row.document_id),
      source_type,
      source_path: row.source_path,
      source_url: row.source_url,
      score: row.score,
    })
  }
}

const FILTER_CLAUSE: &str = "
    AND ($3::text IS NULL OR d.source_type = $3::source_type)
    AND ($4::text IS NULL OR d.file_type = $4)
    AND ($5::text IS NULL OR domain_of(d.source_url) = $5)
    AND ($6::text IS NULL OR coalesce(c.metadata->>'language', d.language_detected) = $6)";

/// `vector_search`: top-k chunks by cosine distance. Ties broken by
/// `document_id`, then `chunk_index`, per the pipeline's ordering contract.
pub async fn vector_search(
  store: &Store,
  collection: &amelia_core::Collection,
  query_vector: &[f32],
  k: i64,
  filters: &SearchFilters,
) -> Result<Vec<SearchRow>> {
  let sql = format!(
    "SELECT c.id AS chunk_id, c.document_id, c.chunk_index, c.content, c.char_count, c.word_count,
            c.headers, c.metadata, c.start_timestamp, c.end_timestamp,
            d.source_type::text AS source_type, d.source_path, d.source_url,
            (e.vector <=> $2) AS score
     FROM embeddings e
     JOIN chunks c ON c.id = e.chunk_id
     JOIN documents d ON d.id = c.document_id
     WHERE d.collection = $1{FILTER_CLAUSE}
     ORDER BY e.vector <=> $2 ASC, d.id ASC, c.chunk_index ASC
     LIMIT $7"
  );

  let rows = sqlx::query_as::<_, Row2>(&sql)
    .bind(collection.as_str())
    .bind(Vector::from(query_vector.to_vec()))
    .bind(filters.source_type.map(|s| s.as_str().to_string()))
    .bind(&filters.file_type)
    .bind(&filters.domain)
    .bind(&filters.language)
    .bind(k)
    .fetch_all(&store.pool)
    .await?;

  rows.into_iter().map(SearchRow::try_from).collect()
}

/// `bm25_search`: ranks by `ts_rank_cd` over `chunks.search_vector`, which
/// the write-path trigger maintains under the English configuration by
/// default (§9). Queries are tokenized with `plainto_tsquery('english', _)`.
pub async fn bm25_search(
  store: &Store,
  collection: &amelia_core::Collection,
  query: &str,
  k: i64,
  filters: &SearchFilters,
) -> Result<Vec<SearchRow>> {
  let sql = format!(
    "SELECT c.id AS chunk_id, c.document_id, c.chunk_index, c.content, c.char_count, c.word_count,
            c.headers, c.metadata, c.start_timestamp, c.end_timestamp,
            d.source_type::text AS source_type, d.source_path, d.source_url,
            ts_rank_cd(c.search_vector, plainto_tsquery('english', $2)) AS score
     FROM chunks c
     JOIN documents d ON d.id = c.document_id
     WHERE d.collection = $1
       AND c.search_vector @@ plainto_tsquery('english', $2){FILTER_CLAUSE}
     ORDER BY score DESC, d.id ASC, c.chunk_index ASC
     LIMIT $7"
  );

  let rows = sqlx::query_as::<_, Row2>(&sql)
    .bind(collection.as_str())
    .bind(query)
    .bind(filters.source_type.map(|s| s.as_str().to_string()))
    .bind(&filters.file_type)
    .bind(&filters.domain)
    .bind(&filters.language)
    .bind(k)
    .fetch_all(&store.pool)
    .await?;

  rows.into_iter().map(SearchRow::try_from).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn filters_default_to_unset() {
    let f = SearchFilters::default();
    assert!(f.source_type.is_none());
    assert!(f.domain.is_none());
  }
}

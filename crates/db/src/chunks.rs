use amelia_core::{Chunk, ChunkId, ChunkMetadata, DocumentId};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::connection::{DbError, Result, Store};

#[derive(sqlx::FromRow)]
struct ChunkRow {
  id: Uuid,
  document_id: Uuid,
  chunk_index: i32,
  content: String,
  char_count: i32,
  word_count: i32,
  headers: Option<String>,
  metadata: serde_json::Value,
  start_timestamp: Option<f64>,
  end_timestamp: Option<f64>,
}

impl TryFrom<ChunkRow> for Chunk {
  type Error = DbError;

  fn try_from(row: ChunkRow) -> Result<Self> {
    let metadata: ChunkMetadata = serde_json::from_value(row.metadata)?;
    Ok(Chunk {
      id: ChunkId::from_uuid(row.id),
      document_id: DocumentId::from_uuid(row.document_id),
      chunk_index: row.chunk_index,
      content: row.content,
      char_count: row.char_count,
      word_count: row.word_count,
      headers: row.headers,
      metadata,
      start_timestamp: row.start_timestamp,
      end_timestamp: row.end_timestamp,
    })
  }
}

/// Inserts a chunk; the `search_vector` column is maintained by the
/// `chunks_search_vector_update` trigger, never set here.
pub async fn insert(tx: &mut Transaction<'_, Postgres>, chunk: &Chunk) -> Result<()> {
  sqlx::query(
    "INSERT INTO chunks
       (id, document_id, chunk_index, content, char_count, word_count, headers,
        metadata, start_timestamp, end_timestamp)
     VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
  )
  .bind(chunk.id.as_uuid())
  .bind(chunk.document_id.as_uuid())
  .bind(chunk.chunk_index)
  .bind(&chunk.content)
  .bind(chunk.char_count)
  .bind(chunk.word_count)
  .bind(&chunk.headers)
  .bind(serde_json::to_value(&chunk.metadata)?)
  .bind(chunk.start_timestamp)
  .bind(chunk.end_timestamp)
  .execute(&mut **tx)
  .await?;
  Ok(())
}

pub async fn list_for_document(store: &Store, document_id: DocumentId) -> Result<Vec<Chunk>> {
  let rows = sqlx::query_as::<_, ChunkRow>("SELECT * FROM chunks WHERE document_id = $1 ORDER BY chunk_index ASC")
    .bind(document_id.as_uuid())
    .fetch_all(&store.pool)
    .await?;
  rows.into_iter().map(Chunk::try_from).collect()
}

pub async fn get(store: &Store, id: ChunkId) -> Result<Chunk> {
  let row = sqlx::query_as::<_, ChunkRow>("SELECT * FROM chunks WHERE id = $1")
    .bind(id.as_uuid())
    .fetch_optional(&store.pool)
    .await?
    .ok_or_else(|| DbError::NotFound(format!("chunk {id}")))?;
  Chunk::try_from(row)
}

pub async fn count_for_document(store: &Store, document_id: DocumentId) -> Result<i64> {
  let count: i64 = sqlx::query_scalar("SELECT count(*) FROM chunks WHERE document_id = $1")
    .bind(document_id.as_uuid())
    .fetch_one(&store.pool)
    .await?;
  Ok(count)
}

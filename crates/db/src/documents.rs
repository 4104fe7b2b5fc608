use amelia_core::{Collection, Document, DocumentId, SourceType};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::connection::{DbError, Result, Store};

#[derive(sqlx::FromRow)]
struct DocumentRow {
  id: Uuid,
  collection: String,
  source_type: String,
  source_path: Option<String>,
  source_url: Option<String>,
  file_type: Option<String>,
  title: String,
  content_hash: String,
  version: i32,
  indexed_at: DateTime<Utc>,
  last_modified: Option<DateTime<Utc>>,
  crawled_at: Option<DateTime<Utc>>,
  audio_duration: Option<f64>,
  language_detected: Option<String>,
  transcript_model: Option<String>,
}

impl TryFrom<DocumentRow> for Document {
  type Error = DbError;

  fn try_from(row: DocumentRow) -> Result<Self> {
    let source_type = row
      .source_type
      .parse::<SourceType>()
      .map_err(|e| DbError::NotFound(format!("invalid source_type in row: {e}")))?;
    let collection = Collection::new(row.collection).map_err(|e| DbError::NotFound(e.to_string()))?;
    Ok(Document {
      id: DocumentId::from_uuid(row.id),
      collection,
      source_type,
      source_path: row.source_path,
      source_url: row.source_url,
      file_type: row.file_type,
      title: row.title,
      content_hash: row.content_hash,
      version: row.version,
      indexed_at: row.indexed_at,
      last_modified: row.last_modified,
      crawled_at: row.crawled_at,
      audio_duration: row.audio_duration,
      language_detected: row.language_detected,
      transcript_model: row.transcript_model,
    })
  }
}

/// Looked up by the ingestion pipeline before deciding skip/update/create.
pub async fn find_by_source_path(
  store: &Store,
  collection: &Collection,
  source_path: &str,
) -> Result<Option<Document>> {
  let row = sqlx::query_as::<_, DocumentRow>(
    "SELECT * FROM documents WHERE collection = $1 AND source_path = $2",
  )
  .bind(collection.as_str())
  .bind(source_path)
  .fetch_optional(&store.pool)
  .await?;
  row.map(Document::try_from).transpose()
}

pub async fn find_by_source_url(store: &Store, collection: &Collection, source_url: &str) -> Result<Option<Document>> {
  let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE collection = $1 AND source_url = $2")
    .bind(collection.as_str())
    .bind(source_url)
    .fetch_optional(&store.pool)
    .await?;
  row.map(Document::try_from).transpose()
}

pub async fn get(store: &Store, id: DocumentId) -> Result<Document> {
  let row = sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = $1")
    .bind(id.as_uuid())
    .fetch_optional(&store.pool)
    .await?
    .ok_or_else(|| DbError::NotFound(format!("document {id}")))?;
  Document::try_from(row)
}

/// Inserts a brand-new document (version 1).
pub async fn insert(tx: &mut Transaction<'_, Postgres>, doc: &Document) -> Result<()> {
  sqlx::query(
    "INSERT INTO documents
       (id, collection, source_type, source_path, source_url, file_type, title,
        content_hash, version, indexed_at, last_modified, crawled_at,
        audio_duration, language_detected, transcript_model)
     VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)",
  )
  .bind(doc.id.as_uuid())
  .bind(doc.collection.as_str())
  .bind(doc.source_type.as_str())
  .bind(&doc.source_path)
  .bind(&doc.source_url)
  .bind(&doc.file_type)
  .bind(&doc.title)
  .bind(&doc.content_hash)
  .bind(doc.version)
  .bind(doc.indexed_at)
  .bind(doc.last_modified)
  .bind(doc.crawled_at)
  .bind(doc.audio_duration)
  .bind(&doc.language_detected)
  .bind(&doc.transcript_model)
  .execute(&mut **tx)
  .await?;
  Ok(())
}

/// Applies a content-changed re-ingestion: bumps version/hash/timestamps.
/// Callers must delete descendant chunks in the same transaction first.
pub async fn apply_update(tx: &mut Transaction<'_, Postgres>, doc: &Document) -> Result<()> {
  sqlx::query(
    "UPDATE documents SET content_hash = $2, version = $3, indexed_at = $4,
       last_modified = $5, crawled_at = $6 WHERE id = $1",
  )
  .bind(doc.id.as_uuid())
  .bind(&doc.content_hash)
  .bind(doc.version)
  .bind(doc.indexed_at)
  .bind(doc.last_modified)
  .bind(doc.crawled_at)
  .execute(&mut **tx)
  .await?;
  Ok(())
}

pub async fn delete_chunks(tx: &mut Transaction<'_, Postgres>, document_id: DocumentId) -> Result<()> {
  sqlx::query("DELETE FROM chunks WHERE document_id = $1")
    .bind(document_id.as_uuid())
    .execute(&mut **tx)
    .await?;
  Ok(())
}

/// Deletes a document; cascades to chunks and embeddings.
pub async fn remove(store: &Store, id: DocumentId) -> Result<u64> {
  let result = sqlx::query("DELETE FROM documents WHERE id = $1")
    .bind(id.as_uuid())
    .execute(&store.pool)
    .await?;
  Ok(result.rows_affected())
}

pub async fn remove_by_source(
  store: &Store,
  collection: &Collection,
  source_path: Option<&str>,
  source_url: Option<&str>,
) -> Result<u64> {
  let result = sqlx::query(
    "DELETE FROM documents WHERE collection = $1
       AND (($2::text IS NOT NULL AND source_path = $2) OR ($3::text IS NOT NULL AND source_url = $3))",
  )
  .bind(collection.as_str())
  .bind(source_path)
  .bind(source_url)
  .execute(&store.pool)
  .await?;
  Ok(result.rows_affected())
}

pub async fn list(
  store: &Store,
  collection: &Collection,
  source_type: Option<SourceType>,
  limit: i64,
) -> Result<Vec<Document>> {
  let rows = sqlx::query_as::<_, DocumentRow>(
    "SELECT * FROM documents WHERE collection = $1
       AND ($2::text IS NULL OR source_type = $2::source_type)
     ORDER BY indexed_at DESC LIMIT $3",
  )
  .bind(collection.as_str())
  .bind(source_type.map(|s| s.as_str().to_string()))
  .bind(limit)
  .fetch_all(&store.pool)
  .await?;
  rows.into_iter().map(Document::try_from).collect()
}

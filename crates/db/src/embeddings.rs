use amelia_core::{ChunkId, Embedding, EmbeddingId, EMBEDDING_DIM};
use pgvector::Vector;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::connection::{DbError, Result, Store};

#[derive(sqlx::FromRow)]
struct EmbeddingRow {
  id: Uuid,
  chunk_id: Uuid,
  vector: Vector,
  model_name: String,
}

impl TryFrom<EmbeddingRow> for Embedding {
  type Error = DbError;

  fn try_from(row: EmbeddingRow) -> Result<Self> {
    Ok(Embedding {
      id: EmbeddingId::from_uuid(row.id),
      chunk_id: ChunkId::from_uuid(row.chunk_id),
      vector: row.vector.to_vec(),
      model_name: row.model_name,
    })
  }
}

pub async fn insert(tx: &mut Transaction<'_, Postgres>, embedding: &Embedding) -> Result<()> {
  debug_assert_eq!(embedding.vector.len(), EMBEDDING_DIM);
  sqlx::query("INSERT INTO embeddings (id, chunk_id, vector, model_name) VALUES ($1,$2,$3,$4)")
    .bind(embedding.id.as_uuid())
    .bind(embedding.chunk_id.as_uuid())
    .bind(Vector::from(embedding.vector.clone()))
    .bind(&embedding.model_name)
    .execute(&mut **tx)
    .await?;
  Ok(())
}

pub async fn get_for_chunk(store: &Store, chunk_id: ChunkId) -> Result<Embedding> {
  let row = sqlx::query_as::<_, EmbeddingRow>("SELECT * FROM embeddings WHERE chunk_id = $1")
    .bind(chunk_id.as_uuid())
    .fetch_optional(&store.pool)
    .await?
    .ok_or_else(|| DbError::NotFound(format!("embedding for chunk {chunk_id}")))?;
  Embedding::try_from(row)
}

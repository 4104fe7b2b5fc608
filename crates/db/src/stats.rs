use std::collections::HashMap;

use amelia_core::Collection;
use serde::{Deserialize, Serialize};

use crate::connection::{Result, Store};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
  pub documents: i64,
  pub chunks: i64,
  pub by_source_type: HashMap<String, i64>,
  pub by_file_type: HashMap<String, i64>,
}

pub async fn get_statistics(store: &Store, collection: &Collection) -> Result<CollectionStats> {
  let documents: i64 = sqlx::query_scalar("SELECT count(*) FROM documents WHERE collection = $1")
    .bind(collection.as_str())
    .fetch_one(&store.pool)
    .await?;

  let chunks: i64 = sqlx::query_scalar(
    "SELECT count(*) FROM chunks c JOIN documents d ON c.document_id = d.id WHERE d.collection = $1",
  )
  .bind(collection.as_str())
  .fetch_one(&store.pool)
  .await?;

  let by_source_type: Vec<(String, i64)> = sqlx::query_as(
    "SELECT source_type::text, count(*) FROM documents WHERE collection = $1 GROUP BY source_type",
  )
  .bind(collection.as_str())
  .fetch_all(&store.pool)
  .await?;

  let by_file_type: Vec<(Option<String>, i64)> = sqlx::query_as(
    "SELECT file_type, count(*) FROM documents WHERE collection = $1 GROUP BY file_type",
  )
  .bind(collection.as_str())
  .fetch_all(&store.pool)
  .await?;

  Ok(CollectionStats {
    documents,
    chunks,
    by_source_type: by_source_type.into_iter().collect(),
    by_file_type: by_file_type
      .into_iter()
      .map(|(ft, n)| (ft.unwrap_or_else(|| "unknown".to_string()), n))
      .collect(),
  })
}

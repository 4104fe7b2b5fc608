use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::Hit;

/// Optional cross-encoder collaborator: re-scores a fixed set of candidate
/// texts against a query. Not required for vector/hybrid search to function.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
  async fn score(&self, query: &str, texts: &[String]) -> Result<Vec<f32>, SearchError>;
}

/// Re-scores `candidates` with `reranker` and reorders by the new score,
/// replacing each hit's `score` field and truncating to `top_k`.
pub async fn rerank(reranker: &dyn CrossEncoder, query: &str, mut candidates: Vec<Hit>, top_k: usize) -> Result<Vec<Hit>, SearchError> {
  if candidates.is_empty() {
    return Ok(candidates);
  }
  let texts: Vec<String> = candidates.iter().map(|h| h.content.clone()).collect();
  let scores = reranker.score(query, &texts).await?;
  if scores.len() != candidates.len() {
    return Err(SearchError::Rerank(format!(
      "reranker returned {} scores for {} candidates",
      scores.len(),
      candidates.len()
    )));
  }
  for (hit, score) in candidates.iter_mut().zip(scores.into_iter()) {
    hit.score = score as f64;
  }
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
  candidates.truncate(top_k);
  Ok(candidates)
}

#[cfg(test)]
mod tests {
  use super::*;
  use amelia_core::{ChunkId, ChunkMetadata, DocumentId, SourceType};

  struct ReverseScorer;

  #[async_trait]
  impl CrossEncoder for ReverseScorer {
    async fn score(&self, _query: &str, texts: &[String]) -> Result<Vec<f32>, SearchError> {
      Ok((0..texts.len()).rev().map(|i| i as f32).collect())
    }
  }

  fn hit(content: &str) -> Hit {
    Hit {
      chunk_id: ChunkId::new(),
      document_id: DocumentId::new(),
      content: content.to_string(),
      headers: None,
      metadata: ChunkMetadata::default(),
      score: 0.0,
      source_type: SourceType::Local,
      source_path: Some("/t/a.md".to_string()),
      source_url: None,
      start_timestamp: None,
      end_timestamp: None,
    }
  }

  #[tokio::test]
  async fn reorders_by_new_score_and_truncates() {
    let candidates = vec![hit("a"), hit("b"), hit("c")];
    let reranked = rerank(&ReverseScorer, "q", candidates, 2).await.unwrap();
    assert_eq!(reranked.len(), 2);
    assert_eq!(reranked[0].content, "a");
  }

  #[tokio::test]
  async fn empty_candidates_short_circuits() {
    let reranked = rerank(&ReverseScorer, "q", Vec::new(), 5).await.unwrap();
    assert!(reranked.is_empty());
  }
}

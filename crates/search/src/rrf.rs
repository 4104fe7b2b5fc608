use std::collections::HashMap;

use amelia_core::ChunkId;

use crate::types::Hit;

const RRF_K: f64 = 60.0;

/// Combines two rankings by Reciprocal Rank Fusion, weighting vector
/// contributions by `alpha` and BM25 contributions by `1 - alpha`. Returns
/// the top `k` hits by fused score, each hit's `score` replaced with the
/// fused value (not comparable to either input ranking's own scores).
pub fn fuse(vector_hits: Vec<Hit>, bm25_hits: Vec<Hit>, alpha: f64, k: usize) -> Vec<Hit> {
  let mut fused: HashMap<ChunkId, (Hit, f64)> = HashMap::new();

  for (rank, hit) in vector_hits.into_iter().enumerate() {
    let contribution = alpha / (RRF_K + (rank + 1) as f64);
    fused
      .entry(hit.chunk_id)
      .and_modify(|(_, score)| *score += contribution)
      .or_insert_with(|| (hit, contribution));
  }

  for (rank, hit) in bm25_hits.into_iter().enumerate() {
    let contribution = (1.0 - alpha) / (RRF_K + (rank + 1) as f64);
    fused
      .entry(hit.chunk_id)
      .and_modify(|(_, score)| *score += contribution)
      .or_insert_with(|| (hit, contribution));
  }

  let mut results: Vec<(Hit, f64)> = fused.into_values().collect();
  results.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.document_id.to_string().cmp(&b.0.document_id.to_string())));
  results.truncate(k);
  results
    .into_iter()
    .map(|(mut hit, score)| {
      hit.score = score;
      hit
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use amelia_core::{ChunkMetadata, DocumentId, SourceType};

  fn hit(chunk_id: ChunkId, document_id: DocumentId) -> Hit {
    Hit {
      chunk_id,
      document_id,
      content: "x".to_string(),
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

  #[test]
  fn chunk_ranked_first_in_both_lists_wins() {
    let doc = DocumentId::new();
    let a = ChunkId::new();
    let b = ChunkId::new();
    let vector_hits = vec![hit(a, doc), hit(b, doc)];
    let bm25_hits = vec![hit(a, doc), hit(b, doc)];
    let fused = fuse(vector_hits, bm25_hits, 0.5, 10);
    assert_eq!(fused[0].chunk_id, a);
  }

  #[test]
  fn unique_to_one_side_still_ranks() {
    let doc = DocumentId::new();
    let a = ChunkId::new();
    let b = ChunkId::new();
    let vector_hits = vec![hit(a, doc)];
    let bm25_hits = vec![hit(b, doc)];
    let fused = fuse(vector_hits, bm25_hits, 0.5, 10);
    assert_eq!(fused.len(), 2);
  }

  #[test]
  fn truncates_to_k() {
    let doc = DocumentId::new();
    let hits: Vec<Hit> = (0..5).map(|_| hit(ChunkId::new(), doc)).collect();
    let fused = fuse(hits, Vec::new(), 1.0, 3);
    assert_eq!(fused.len(), 3);
  }
}

use serde::{Deserialize, Serialize};

use crate::ids::{ChunkId, DocumentId};

/// Structured per-chunk metadata. `language` must name a valid full-text
/// configuration (see `fts_config_for_iso`); absent means the store's
/// default configuration applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
  pub language: Option<String>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A retrievable fragment of a document, exclusively owned by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
  pub id: ChunkId,
  pub document_id: DocumentId,
  /// 0-based, contiguous within a document after successful ingestion.
  pub chunk_index: i32,

  pub content: String,
  pub char_count: i32,
  pub word_count: i32,

  /// Reconstructed heading path, e.g. `"H1 > H2"`, or `None`.
  pub headers: Option<String>,
  pub metadata: ChunkMetadata,

  /// Set only for chunks produced by the timestamp-aware chunker.
  pub start_timestamp: Option<f64>,
  pub end_timestamp: Option<f64>,
}

impl Chunk {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    document_id: DocumentId,
    chunk_index: i32,
    content: String,
    headers: Option<String>,
    metadata: ChunkMetadata,
  ) -> Self {
    let char_count = content.chars().count() as i32;
    let word_count = content.split_whitespace().count() as i32;
    Self {
      id: ChunkId::new(),
      document_id,
      chunk_index,
      content,
      char_count,
      word_count,
      headers,
      metadata,
      start_timestamp: None,
      end_timestamp: None,
    }
  }

  pub fn with_timestamps(mut self, start: f64, end: f64) -> Self {
    self.start_timestamp = Some(start);
    self.end_timestamp = Some(end);
    self
  }

  /// True only when the timestamp span is well-formed: non-empty and ordered.
  pub fn has_valid_timespan(&self) -> bool {
    match (self.start_timestamp, self.end_timestamp) {
      (Some(s), Some(e)) => s < e,
      (None, None) => true,
      _ => false,
    }
  }
}

/// Verifies `{c.chunk_index}` of a document's chunks forms `0..N-1`.
pub fn is_contiguous(indices: &[i32]) -> bool {
  let mut sorted = indices.to_vec();
  sorted.sort_unstable();
  sorted.iter().enumerate().all(|(i, &idx)| i as i32 == idx)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chunk(index: i32) -> Chunk {
    Chunk::new(DocumentId::new(), index, "hello world".into(), None, ChunkMetadata::default())
  }

  #[test]
  fn counts_chars_and_words() {
    let c = chunk(0);
    assert_eq!(c.char_count, 11);
    assert_eq!(c.word_count, 2);
  }

  #[test]
  fn contiguity_check() {
    assert!(is_contiguous(&[0, 1, 2]));
    assert!(is_contiguous(&[2, 0, 1]));
    assert!(!is_contiguous(&[0, 2]));
    assert!(is_contiguous(&[]));
  }

  #[test]
  fn timespan_validity() {
    let c = chunk(0).with_timestamps(1.0, 2.0);
    assert!(c.has_valid_timespan());
    let bad = chunk(0).with_timestamps(2.0, 2.0);
    assert!(!bad.has_valid_timespan());
  }
}

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a canonical content string. Drives the
/// skip/update/create decision in the ingestion pipeline.
pub fn content_hash(canonical: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(canonical.as_bytes());
  hex::encode(hasher.finalize())
}

/// Incremental hasher for content assembled piece-by-piece (e.g. transcript
/// segments) without materializing the whole string first.
#[derive(Default)]
pub struct StreamingHasher(Sha256);

impl StreamingHasher {
  pub fn new() -> Self {
    Self(Sha256::new())
  }

  pub fn update(&mut self, piece: &str) {
    self.0.update(piece.as_bytes());
  }

  pub fn finish(self) -> String {
    hex::encode(self.0.finalize())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_content_hashes_equal() {
    assert_eq!(content_hash("hello"), content_hash("hello"));
  }

  #[test]
  fn different_content_hashes_differ() {
    assert_ne!(content_hash("hello"), content_hash("world"));
  }

  #[test]
  fn streaming_hash_matches_whole_string_hash() {
    let mut streaming = StreamingHasher::new();
    streaming.update("hello ");
    streaming.update("world");
    assert_eq!(streaming.finish(), content_hash("hello world"));
  }
}

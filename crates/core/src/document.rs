use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::ids::DocumentId;

/// Origin classification of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
  Local,
  Web,
  Audio,
}

impl SourceType {
  pub fn as_str(&self) -> &'static str {
    match self {
      SourceType::Local => "local",
      SourceType::Web => "web",
      SourceType::Audio => "audio",
    }
  }
}

impl std::str::FromStr for SourceType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "local" => Ok(SourceType::Local),
      "web" => Ok(SourceType::Web),
      "audio" => Ok(SourceType::Audio),
      other => Err(format!("unknown source type: {other}")),
    }
  }
}

/// A logical unit of content ingested from one source. Identity is
/// `(collection, source_path)` for local/audio sources or `(collection,
/// source_url)` for web sources — exactly one of the two is set, enforced at
/// the store layer (unique partial indexes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  pub id: DocumentId,
  pub collection: Collection,
  pub source_type: SourceType,

  /// Local filesystem path; set iff `source_type` is `local` or `audio`.
  pub source_path: Option<String>,
  /// Canonicalized URL; set iff `source_type` is `web`.
  pub source_url: Option<String>,

  pub file_type: Option<String>,
  pub title: String,

  /// Hex SHA-256 of the canonical content string.
  pub content_hash: String,
  /// Monotonic, starts at 1, increments on every content change.
  pub version: i32,

  pub indexed_at: DateTime<Utc>,
  /// Set for local/audio sources.
  pub last_modified: Option<DateTime<Utc>>,
  /// Set for web sources.
  pub crawled_at: Option<DateTime<Utc>>,

  pub audio_duration: Option<f64>,
  /// ISO language code detected during transcription.
  pub language_detected: Option<String>,
  pub transcript_model: Option<String>,
}

impl Document {
  #[allow(clippy::too_many_arguments)]
  pub fn new_local(
    collection: Collection,
    source_path: String,
    file_type: Option<String>,
    title: String,
    content_hash: String,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: DocumentId::new(),
      collection,
      source_type: SourceType::Local,
      source_path: Some(source_path),
      source_url: None,
      file_type,
      title,
      content_hash,
      version: 1,
      indexed_at: now,
      last_modified: Some(now),
      crawled_at: None,
      audio_duration: None,
      language_detected: None,
      transcript_model: None,
    }
  }

  pub fn new_audio(collection: Collection, source_path: String, title: String, content_hash: String) -> Self {
    let now = Utc::now();
    Self {
      id: DocumentId::new(),
      collection,
      source_type: SourceType::Audio,
      source_path: Some(source_path),
      source_url: None,
      file_type: None,
      title,
      content_hash,
      version: 1,
      indexed_at: now,
      last_modified: Some(now),
      crawled_at: None,
      audio_duration: None,
      language_detected: None,
      transcript_model: None,
    }
  }

  pub fn new_web(collection: Collection, source_url: String, title: String, content_hash: String) -> Self {
    let now = Utc::now();
    Self {
      id: DocumentId::new(),
      collection,
      source_type: SourceType::Web,
      source_path: None,
      source_url: Some(source_url),
      file_type: Some("html".to_string()),
      title,
      content_hash,
      version: 1,
      indexed_at: now,
      last_modified: None,
      crawled_at: Some(now),
      audio_duration: None,
      language_detected: None,
      transcript_model: None,
    }
  }

  /// Apply a re-ingestion that changed the canonical content: bumps the
  /// version and refreshes the hash/timestamp. Callers are responsible for
  /// deleting descendant chunks in the same transaction.
  pub fn apply_update(&mut self, content_hash: String) {
    self.content_hash = content_hash;
    self.version += 1;
    let now = Utc::now();
    self.indexed_at = now;
    match self.source_type {
      SourceType::Web => self.crawled_at = Some(now),
      _ => self.last_modified = Some(now),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn apply_update_bumps_version_and_hash() {
    let mut doc = Document::new_local(
      Collection::new("c").unwrap(),
      "/t/a.md".into(),
      Some("md".into()),
      "H".into(),
      "abc".into(),
    );
    assert_eq!(doc.version, 1);
    doc.apply_update("def".into());
    assert_eq!(doc.version, 2);
    assert_eq!(doc.content_hash, "def");
  }

  #[test]
  fn source_type_round_trips_through_str() {
    assert_eq!("web".parse::<SourceType>().unwrap(), SourceType::Web);
    assert!("bogus".parse::<SourceType>().is_err());
  }
}

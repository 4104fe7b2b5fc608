use std::sync::Arc;

use amelia_core::{Chunk, ChunkMetadata, Collection, Document, DocumentId, Embedding, fts_config_for_iso};
use amelia_db::Store;
use amelia_embedding::EmbeddingProvider;
use async_trait::async_trait;

use crate::chunker::{ChunkerConfig, TimestampedSegment, chunk_timestamped};
use crate::error::IngestError;
use crate::hasher::StreamingHasher;
use crate::pipeline::IngestOutcome;

pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac"];

#[derive(Debug, Clone)]
pub struct TranscriptSegment {
  pub start: f64,
  pub end: f64,
  pub text: String,
}

#[derive(Debug, Clone)]
pub struct Transcript {
  pub segments: Vec<TranscriptSegment>,
  pub detected_language: String,
}

#[derive(Debug, Clone)]
pub struct MediaInfo {
  pub duration: f64,
  pub format: String,
  pub bitrate: Option<u32>,
  pub sample_rate: Option<u32>,
}

/// External speech-to-text collaborator.
#[async_trait]
pub trait AsrProvider: Send + Sync {
  async fn transcribe(&self, path: &std::path::Path, language_hint: &str) -> Result<Transcript, IngestError>;
  fn model_id(&self) -> &str;
}

/// External media-inspection collaborator.
#[async_trait]
pub trait MediaInspector: Send + Sync {
  async fn inspect(&self, path: &std::path::Path) -> Result<MediaInfo, IngestError>;
}

pub fn is_supported_audio(path: &std::path::Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| SUPPORTED_AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
    .unwrap_or(false)
}

/// Deterministic per-segment markdown rendering: `[start -> end] text`, one
/// line per segment. Hashed incrementally so the full string is never
/// required to be live at once for very long transcripts.
fn canonical_transcript_hash(segments: &[TranscriptSegment]) -> String {
  let mut hasher = StreamingHasher::new();
  for segment in segments {
    hasher.update(&format!("[{:.2} -> {:.2}] {}\n", segment.start, segment.end, segment.text));
  }
  hasher.finish()
}

pub struct TranscriptionPipeline {
  store: Store,
  embedder: Arc<dyn EmbeddingProvider>,
  asr: Arc<dyn AsrProvider>,
  inspector: Arc<dyn MediaInspector>,
  chunker_config: ChunkerConfig,
}

impl TranscriptionPipeline {
  pub fn new(
    store: Store,
    embedder: Arc<dyn EmbeddingProvider>,
    asr: Arc<dyn AsrProvider>,
    inspector: Arc<dyn MediaInspector>,
    chunker_config: ChunkerConfig,
  ) -> Self {
    Self {
      store,
      embedder,
      asr,
      inspector,
      chunker_config,
    }
  }

  /// Runs the §4.3 algorithm: validate, transcribe, hash, timestamp-chunk,
  /// embed, publish.
  pub async fn ingest_audio(&self, path: &std::path::Path, language_hint: &str, collection: &Collection) -> Result<IngestOutcome, IngestError> {
    if !is_supported_audio(path) {
      return Err(IngestError::UnsupportedFileType(path.to_string_lossy().into_owned()));
    }
    let media_info = self.inspector.inspect(path).await?;
    let transcript = self.asr.transcribe(path, language_hint).await?;

    let segments: Vec<TranscriptSegment> = transcript.segments;
    let hash = canonical_transcript_hash(&segments);

    let source_path = path.to_string_lossy().into_owned();
    let existing = amelia_db::documents::find_by_source_path(&self.store, collection, &source_path).await?;

    if let Some(doc) = &existing {
      if doc.content_hash == hash {
        return Ok(IngestOutcome::Skipped { document_id: doc.id });
      }
    }

    let timestamped_segments: Vec<TimestampedSegment> = segments
      .iter()
      .map(|s| TimestampedSegment {
        start: s.start,
        end: s.end,
        text: s.text.clone(),
      })
      .collect();
    let drafts = chunk_timestamped(&timestamped_segments, &self.chunker_config);

    let fts_config = fts_config_for_iso(&transcript.detected_language);
    let texts: Vec<&str> = drafts.iter().map(|d| d.content.as_str()).collect();
    let vectors = if texts.is_empty() {
      Vec::new()
    } else {
      self.embedder.embed_batch(&texts).await?
    };

    let document_id = match &existing {
      Some(doc) => doc.id,
      None => DocumentId::new(),
    };

    let chunks: Vec<Chunk> = drafts
      .iter()
      .enumerate()
      .map(|(i, draft)| {
        let metadata = ChunkMetadata {
          language: Some(fts_config.to_string()),
          ..Default::default()
        };
        Chunk::new(document_id, i as i32, draft.content.clone(), None, metadata).with_timestamps(draft.start_timestamp, draft.end_timestamp)
      })
      .collect();

    let embeddings: Result<Vec<Embedding>, amelia_core::Error> = chunks
      .iter()
      .zip(vectors.into_iter())
      .map(|(chunk, vector)| Embedding::new(chunk.id, vector, self.embedder.model_id()))
      .collect();
    let embeddings = embeddings?;

    let chunk_count = chunks.len();
    let mut tx = self.store.pool.begin().await.map_err(amelia_db::DbError::from)?;

    let outcome = match existing {
      Some(mut doc) => {
        amelia_db::documents::delete_chunks(&mut tx, doc.id).await?;
        doc.apply_update(hash);
        doc.audio_duration = Some(media_info.duration);
        doc.language_detected = Some(transcript.detected_language.clone());
        doc.transcript_model = Some(self.asr.model_id().to_string());
        amelia_db::documents::apply_update(&mut tx, &doc).await?;
        IngestOutcome::Updated {
          document_id: doc.id,
          chunk_count,
        }
      }
      None => {
        let title = path
          .file_stem()
          .and_then(|s| s.to_str())
          .unwrap_or("untitled")
          .to_string();
        let mut doc = Document::new_audio(collection.clone(), source_path.clone(), title, hash);
        doc.audio_duration = Some(media_info.duration);
        doc.language_detected = Some(transcript.detected_language.clone());
        doc.transcript_model = Some(self.asr.model_id().to_string());
        amelia_db::documents::insert(&mut tx, &doc).await?;
        IngestOutcome::Created {
          document_id: doc.id,
          chunk_count,
        }
      }
    };

    for chunk in &chunks {
      amelia_db::chunks::insert(&mut tx, chunk).await?;
    }
    for embedding in &embeddings {
      amelia_db::embeddings::insert(&mut tx, embedding).await?;
    }

    tx.commit().await.map_err(amelia_db::DbError::from)?;

    Ok(outcome)
  }
}

const DEFAULT_ASR_BASE_URL: &str = "http://localhost:8089";
const DEFAULT_ASR_MODEL: &str = "whisper-base";

/// Talks to a local or self-hosted ASR server over HTTP, mirroring the
/// embedding crate's HTTP provider shape. `transcribe` posts the file path
/// and a language hint; `inspect` is a thin wrapper over the same server's
/// media-inspection endpoint.
#[derive(Debug, Clone)]
pub struct HttpAsrProvider {
  client: reqwest::Client,
  base_url: String,
  model: String,
}

impl HttpAsrProvider {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: DEFAULT_ASR_BASE_URL.to_string(),
      model: DEFAULT_ASR_MODEL.to_string(),
    }
  }

  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.base_url = url.into();
    self
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  fn transcribe_url(&self) -> String {
    format!("{}/transcribe", self.base_url)
  }
}

impl Default for HttpAsrProvider {
  fn default() -> Self {
    Self::new()
  }
}

#[derive(Debug, serde::Serialize)]
struct TranscribeRequest<'a> {
  model: &'a str,
  path: &'a str,
  language: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct TranscribeResponse {
  segments: Vec<TranscribeSegmentDto>,
  detected_language: String,
}

#[derive(Debug, serde::Deserialize)]
struct TranscribeSegmentDto {
  start: f64,
  end: f64,
  text: String,
}

#[async_trait]
impl AsrProvider for HttpAsrProvider {
  async fn transcribe(&self, path: &std::path::Path, language_hint: &str) -> Result<Transcript, IngestError> {
    let request = TranscribeRequest {
      model: &self.model,
      path: &path.to_string_lossy(),
      language: language_hint,
    };

    let response = self
      .client
      .post(self.transcribe_url())
      .json(&request)
      .send()
      .await
      .map_err(|e| IngestError::Asr(e.to_string()))?;

    if !response.status().is_success() {
      let status = response.status();
      return Err(IngestError::Asr(format!("asr provider returned {status}")));
    }

    let body: TranscribeResponse = response
      .json()
      .await
      .map_err(|e| IngestError::Asr(e.to_string()))?;

    Ok(Transcript {
      segments: body
        .segments
        .into_iter()
        .map(|s| TranscriptSegment {
          start: s.start,
          end: s.end,
          text: s.text,
        })
        .collect(),
      detected_language: body.detected_language,
    })
  }

  fn model_id(&self) -> &str {
    &self.model
  }
}

/// Thin wrapper over the same ASR server's `/inspect` endpoint.
#[derive(Debug, Clone)]
pub struct HttpMediaInspector {
  client: reqwest::Client,
  base_url: String,
}

impl HttpMediaInspector {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: base_url.into(),
    }
  }
}

#[derive(Debug, serde::Deserialize)]
struct InspectResponse {
  duration: f64,
  format: String,
  bitrate: Option<u32>,
  sample_rate: Option<u32>,
}

#[async_trait]
impl MediaInspector for HttpMediaInspector {
  async fn inspect(&self, path: &std::path::Path) -> Result<MediaInfo, IngestError> {
    let response = self
      .client
      .get(format!("{}/inspect", self.base_url))
      .query(&[("path", path.to_string_lossy().as_ref())])
      .send()
      .await
      .map_err(|e| IngestError::Media(e.to_string()))?;

    if !response.status().is_success() {
      let status = response.status();
      return Err(IngestError::Media(format!("media inspector returned {status}")));
    }

    let body: InspectResponse = response
      .json()
      .await
      .map_err(|e| IngestError::Media(e.to_string()))?;

    Ok(MediaInfo {
      duration: body.duration,
      format: body.format,
      bitrate: body.bitrate,
      sample_rate: body.sample_rate,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn recognizes_supported_audio_extensions() {
    assert!(is_supported_audio(std::path::Path::new("a.mp3")));
    assert!(is_supported_audio(std::path::Path::new("a.WAV")));
    assert!(!is_supported_audio(std::path::Path::new("a.ogg")));
  }

  #[test]
  fn hash_is_deterministic_and_order_sensitive() {
    let a = vec![
      TranscriptSegment {
        start: 0.0,
        end: 1.0,
        text: "hi".into(),
      },
      TranscriptSegment {
        start: 1.0,
        end: 2.0,
        text: "there".into(),
      },
    ];
    let b = vec![a[1].clone(), a[0].clone()];
    assert_eq!(canonical_transcript_hash(&a), canonical_transcript_hash(&a.clone()));
    assert_ne!(canonical_transcript_hash(&a), canonical_transcript_hash(&b));
  }
}

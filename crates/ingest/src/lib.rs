pub mod chunker;
pub mod error;
pub mod hasher;
pub mod parser;
pub mod pipeline;
pub mod scanner;
pub mod transcribe;

pub use chunker::{ChunkDraft, ChunkerConfig, TimestampedChunkDraft, TimestampedSegment, chunk_markdown, chunk_timestamped};
pub use error::IngestError;
pub use hasher::{StreamingHasher, content_hash};
pub use parser::{DocumentParser, MarkdownParser, ParsedDocument, ParserRegistry, PlainTextParser, file_type_for};
pub use pipeline::{IngestOutcome, Pipeline};
pub use scanner::{DiscoveredFile, discover};
pub use transcribe::{
  AsrProvider, HttpAsrProvider, HttpMediaInspector, MediaInfo, MediaInspector, SUPPORTED_AUDIO_EXTENSIONS, Transcript, TranscriptSegment,
  TranscriptionPipeline, is_supported_audio,
};

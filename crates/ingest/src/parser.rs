use async_trait::async_trait;
use std::path::Path;

use crate::error::IngestError;

/// Text extracted from a source file, ready for hashing and chunking.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
  pub canonical_text: String,
  pub title: String,
}

/// A format-specific extraction step. PDF/DOCX/HTML parsing are expected to
/// be supplied by external collaborators implementing this trait; only
/// markdown and plain text are provided here.
#[async_trait]
pub trait DocumentParser: Send + Sync {
  async fn parse(&self, path: &Path, file_type: &str) -> Result<ParsedDocument, IngestError>;
  fn supports(&self, file_type: &str) -> bool;
}

pub struct MarkdownParser;

#[async_trait]
impl DocumentParser for MarkdownParser {
  async fn parse(&self, path: &Path, _file_type: &str) -> Result<ParsedDocument, IngestError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let title = extract_title(&raw).unwrap_or_else(|| file_stem(path));
    Ok(ParsedDocument {
      canonical_text: raw,
      title,
    })
  }

  fn supports(&self, file_type: &str) -> bool {
    matches!(file_type, "md" | "markdown" | "mdx")
  }
}

pub struct PlainTextParser;

#[async_trait]
impl DocumentParser for PlainTextParser {
  async fn parse(&self, path: &Path, _file_type: &str) -> Result<ParsedDocument, IngestError> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(ParsedDocument {
      canonical_text: raw,
      title: file_stem(path),
    })
  }

  fn supports(&self, file_type: &str) -> bool {
    matches!(file_type, "txt" | "text")
  }
}

/// Dispatches to the first registered parser whose `supports` matches.
pub struct ParserRegistry {
  parsers: Vec<Box<dyn DocumentParser>>,
}

impl Default for ParserRegistry {
  fn default() -> Self {
    Self {
      parsers: vec![Box::new(MarkdownParser), Box::new(PlainTextParser)],
    }
  }
}

impl ParserRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, parser: Box<dyn DocumentParser>) {
    self.parsers.push(parser);
  }

  pub async fn parse(&self, path: &Path, file_type: &str) -> Result<ParsedDocument, IngestError> {
    for parser in &self.parsers {
      if parser.supports(file_type) {
        return parser.parse(path, file_type).await;
      }
    }
    Err(IngestError::UnsupportedFileType(file_type.to_string()))
  }
}

fn extract_title(text: &str) -> Option<String> {
  text.lines().find_map(|line| line.strip_prefix("# ").map(|t| t.trim().to_string()))
}

fn file_stem(path: &Path) -> String {
  path.file_stem().and_then(|s| s.to_str()).unwrap_or("untitled").to_string()
}

pub fn file_type_for(path: &Path) -> Option<String> {
  path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[tokio::test]
  async fn markdown_parser_extracts_h1_title() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# My Doc\n\nBody text.").unwrap();
    let parser = MarkdownParser;
    let parsed = parser.parse(file.path(), "md").await.unwrap();
    assert_eq!(parsed.title, "My Doc");
    assert!(parsed.canonical_text.contains("Body text."));
  }

  #[tokio::test]
  async fn markdown_parser_falls_back_to_filename() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.md");
    tokio::fs::write(&path, "no heading here").await.unwrap();
    let parser = MarkdownParser;
    let parsed = parser.parse(&path, "md").await.unwrap();
    assert_eq!(parsed.title, "notes");
  }

  #[tokio::test]
  async fn registry_rejects_unsupported_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.png");
    tokio::fs::write(&path, b"binary").await.unwrap();
    let registry = ParserRegistry::new();
    let err = registry.parse(&path, "png").await.unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFileType(_)));
  }

  #[test]
  fn file_type_for_lowercases_extension() {
    assert_eq!(file_type_for(Path::new("FILE.MD")), Some("md".to_string()));
  }
}

use serde::{Deserialize, Serialize};

/// `ingest_documents` tool input, persisted verbatim as `jobs.metadata` so a
/// crash-recovered job can resume without the caller resubmitting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
  pub paths: Vec<String>,
  #[serde(default)]
  pub recursive: bool,
  #[serde(default)]
  pub file_patterns: Vec<String>,
  pub collection: String,
  #[serde(default)]
  pub transcription_language: Option<String>,
}

/// `crawl_website` tool input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
  pub url: String,
  pub collection: String,
  #[serde(default = "default_max_depth")]
  pub max_depth: i32,
  #[serde(default = "default_max_pages")]
  pub max_pages: i32,
  #[serde(default = "default_true")]
  pub follow_links: bool,
  #[serde(default)]
  pub exclude_patterns: Vec<String>,
  #[serde(default)]
  pub include_patterns: Vec<String>,
  #[serde(default = "default_pool_size")]
  pub batch_size: usize,
  #[serde(default = "default_true")]
  pub js_enabled: bool,
  #[serde(default = "default_true")]
  pub respect_robots_txt: bool,
}

fn default_max_depth() -> i32 {
  3
}
fn default_max_pages() -> i32 {
  1000
}
fn default_pool_size() -> usize {
  5
}
fn default_true() -> bool {
  true
}

//! Typed configuration record with layered loading: project-relative
//! `.amelia/config.toml` overlaid on a user config
//! (`~/.config/amelia/config.toml`), both overlaid by environment variables.
//! Unknown keys are rejected (`deny_unknown_fields`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingDevice {
  #[default]
  Cpu,
  Cuda,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EmbeddingConfig {
  pub device: EmbeddingDevice,
  pub batch_size: usize,
}

impl Default for EmbeddingConfig {
  fn default() -> Self {
    Self {
      device: EmbeddingDevice::Cpu,
      batch_size: 32,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SearchConfig {
  pub default_n_results: usize,
  pub max_n_results: usize,
  pub enable_hybrid_search: bool,
  pub enable_reranking: bool,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      default_n_results: 5,
      max_n_results: 50,
      enable_hybrid_search: true,
      enable_reranking: false,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ChunkConfig {
  pub default_chunk_size: usize,
  pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
  fn default() -> Self {
    Self {
      default_chunk_size: 1000,
      chunk_overlap: 200,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CrawlConfig {
  pub max_depth: i32,
  pub max_pages: i32,
  pub pool_size: usize,
  pub js_enabled: bool,
  pub respect_robots_txt: bool,
  pub user_agent: String,
  pub fetch_timeout_secs: u64,
}

impl Default for CrawlConfig {
  fn default() -> Self {
    Self {
      max_depth: 3,
      max_pages: 1000,
      pool_size: 5,
      js_enabled: true,
      respect_robots_txt: true,
      user_agent: "amelia-crawler/0.1".to_string(),
      fetch_timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AudioConfig {
  pub whisper_model: String,
  /// "auto" requests language detection.
  pub language: String,
  pub max_buffered_transcript_bytes: u64,
}

impl Default for AudioConfig {
  fn default() -> Self {
    Self {
      whisper_model: "base".to_string(),
      language: "auto".to_string(),
      max_buffered_transcript_bytes: 8 * 1024 * 1024,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RateLimitConfig {
  /// Tokens refilled per second, per registrable domain.
  pub per_domain: f64,
  /// Bucket capacity; 1 means strict 1 rps with no burst.
  pub capacity: u32,
  pub idle_gc_secs: u64,
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self {
      per_domain: 1.0,
      capacity: 1,
      idle_gc_secs: 300,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct JobConcurrencyConfig {
  pub crawl: usize,
  pub transcribe: usize,
  pub ingest: usize,
}

impl Default for JobConcurrencyConfig {
  fn default() -> Self {
    Self {
      crawl: 3,
      transcribe: 2,
      ingest: 5,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
  /// Postgres connection string.
  pub database_url: String,
  pub log_level: String,

  #[serde(default)]
  pub embedding: EmbeddingConfig,
  #[serde(default)]
  pub search: SearchConfig,
  #[serde(default)]
  pub chunk: ChunkConfig,
  #[serde(default)]
  pub crawl: CrawlConfig,
  #[serde(default)]
  pub audio: AudioConfig,
  #[serde(default)]
  pub rate_limit: RateLimitConfig,
  #[serde(default)]
  pub job_concurrency: JobConcurrencyConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: "postgres://localhost/amelia".to_string(),
      log_level: "INFO".to_string(),
      embedding: EmbeddingConfig::default(),
      search: SearchConfig::default(),
      chunk: ChunkConfig::default(),
      crawl: CrawlConfig::default(),
      audio: AudioConfig::default(),
      rate_limit: RateLimitConfig::default(),
      job_concurrency: JobConcurrencyConfig::default(),
    }
  }
}

impl Config {
  /// Project-relative config path, checked before the user config.
  pub fn project_config_path(project_path: &Path) -> PathBuf {
    project_path.join(".amelia").join("config.toml")
  }

  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("AMELIA_CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("amelia").join("config.toml"));
    }
    dirs::config_dir().map(|p| p.join("amelia").join("config.toml"))
  }

  /// Load project config, overlaid on user config, overlaid by environment
  /// variables. Every layer is parsed with `deny_unknown_fields`; an unknown
  /// key anywhere is a hard error rather than silently ignored.
  pub fn load_for_project(project_path: &Path) -> Result<Self, ConfigError> {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    if let Some(user_path) = Self::user_config_path() {
      merge_file(&mut merged, &user_path)?;
    }
    merge_file(&mut merged, &Self::project_config_path(project_path))?;

    let mut config: Config = merged.try_into().map_err(ConfigError::Parse)?;
    config.apply_env_overrides();
    Ok(config)
  }

  fn apply_env_overrides(&mut self) {
    if let Ok(url) = std::env::var("AMELIA_DATABASE_URL") {
      self.database_url = url;
    }
    if let Ok(level) = std::env::var("AMELIA_LOG_LEVEL") {
      self.log_level = level;
    }
    if let Ok(level) = std::env::var("RUST_LOG") {
      self.log_level = level;
    }
  }
}

fn merge_file(into: &mut toml::Value, path: &Path) -> Result<(), ConfigError> {
  if !path.exists() {
    return Ok(());
  }
  let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
  let parsed: toml::Value = toml::from_str(&content).map_err(ConfigError::Toml)?;
  merge_toml(into, parsed);
  Ok(())
}

/// Deep-merges `overlay` into `base`, overlay winning on key conflicts.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
  match (base, overlay) {
    (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
      for (key, value) in overlay_table {
        match base_table.get_mut(&key) {
          Some(existing) => merge_toml(existing, value),
          None => {
            base_table.insert(key, value);
          }
        }
      }
    }
    (base, overlay) => *base = overlay,
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("io: {0}")]
  Io(std::io::Error),
  #[error("toml parse: {0}")]
  Toml(toml::de::Error),
  #[error("config parse: {0}")]
  Parse(toml::de::Error),
}

pub fn default_data_dir() -> Option<PathBuf> {
  if let Ok(path) = std::env::var("AMELIA_DATA_DIR") {
    return Some(PathBuf::from(path));
  }
  dirs::data_dir().map(|p| p.join("amelia"))
}

pub fn default_config_dir() -> Option<PathBuf> {
  Config::user_config_path().and_then(|p| p.parent().map(PathBuf::from))
}

pub fn default_cache_dir() -> Option<PathBuf> {
  if let Ok(path) = std::env::var("AMELIA_CACHE_DIR") {
    return Some(PathBuf::from(path));
  }
  dirs::cache_dir().map(|p| p.join("amelia"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_matches_spec_defaults() {
    let config = Config::default();
    assert_eq!(config.embedding.batch_size, 32);
    assert_eq!(config.search.default_n_results, 5);
    assert_eq!(config.search.max_n_results, 50);
    assert_eq!(config.chunk.default_chunk_size, 1000);
    assert_eq!(config.chunk.chunk_overlap, 200);
    assert_eq!(config.job_concurrency.crawl, 3);
    assert_eq!(config.job_concurrency.transcribe, 2);
    assert_eq!(config.job_concurrency.ingest, 5);
  }

  #[test]
  fn load_for_project_falls_back_to_defaults_when_no_files_exist() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_for_project(dir.path()).unwrap();
    assert_eq!(config.crawl.max_depth, 3);
  }

  #[test]
  fn project_config_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".amelia")).unwrap();
    std::fs::write(
      dir.path().join(".amelia/config.toml"),
      "database_url = \"postgres://x/y\"\n[crawl]\nmax_depth = 5\n",
    )
    .unwrap();
    let config = Config::load_for_project(dir.path()).unwrap();
    assert_eq!(config.database_url, "postgres://x/y");
    assert_eq!(config.crawl.max_depth, 5);
    assert_eq!(config.crawl.max_pages, 1000);
  }

  #[test]
  fn rejects_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".amelia")).unwrap();
    std::fs::write(dir.path().join(".amelia/config.toml"), "bogus_key = 1\n").unwrap();
    assert!(Config::load_for_project(dir.path()).is_err());
  }
}

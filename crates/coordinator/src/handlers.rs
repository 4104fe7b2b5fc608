use std::sync::Arc;

use amelia_core::{Job, JobType};
use amelia_crawl::{CrawlJobConfig, Fetcher, RateLimitConfig};
use amelia_db::Store;
use amelia_embedding::EmbeddingProvider;
use amelia_ingest::{AsrProvider, ChunkerConfig, MediaInspector, Pipeline, TranscriptionPipeline};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::CoordinatorError;
use crate::requests::{CrawlRequest, IngestRequest};

/// External collaborators a job handler needs, gathered in one place so
/// [`crate::dispatch::Coordinator`] can build it once and clone the `Arc`s
/// into each spawned job.
#[derive(Clone)]
pub struct Collaborators {
  pub store: Store,
  pub embedder: Arc<dyn EmbeddingProvider>,
  pub fetcher: Arc<dyn Fetcher>,
  pub asr: Arc<dyn AsrProvider>,
  pub inspector: Arc<dyn MediaInspector>,
  pub chunker_config: ChunkerConfig,
  pub rate_limit_config: RateLimitConfig,
}

/// Runs one dispatched job to completion, reporting progress back through
/// `amelia_db::jobs::update_progress` as it goes. Returns the metadata blob
/// to persist with `amelia_db::jobs::complete`.
pub async fn execute(collaborators: &Collaborators, job: &Job, cancel: CancellationToken) -> Result<serde_json::Value, CoordinatorError> {
  match job.job_type {
    JobType::Ingest => run_ingest(collaborators, job, cancel).await,
    JobType::Crawl => run_crawl(collaborators, job, cancel).await,
    JobType::Transcribe => run_transcribe(collaborators, job).await,
  }
}

async fn run_ingest(collaborators: &Collaborators, job: &Job, cancel: CancellationToken) -> Result<serde_json::Value, CoordinatorError> {
  let request: IngestRequest = serde_json::from_value(job.metadata.clone())?;
  let files = amelia_ingest::discover(&request.paths, request.recursive, &request.file_patterns)?;

  let pipeline = Pipeline::new(collaborators.store.clone(), collaborators.embedder.clone(), collaborators.chunker_config.clone());
  let transcription = TranscriptionPipeline::new(
    collaborators.store.clone(),
    collaborators.embedder.clone(),
    collaborators.asr.clone(),
    collaborators.inspector.clone(),
    collaborators.chunker_config.clone(),
  );
  let language_hint = request.transcription_language.as_deref().unwrap_or("auto");

  let total = files.len() as i32;
  let mut processed = 0i32;
  let mut outcomes = Vec::with_capacity(files.len());

  for file in &files {
    if cancel.is_cancelled() {
      return Err(CoordinatorError::Ingest(amelia_ingest::IngestError::Cancelled));
    }

    let result = if amelia_ingest::is_supported_audio(&file.path) {
      transcription
        .ingest_audio(&file.path, language_hint, &job.collection)
        .await
    } else {
      pipeline.ingest_file(&file.path, &file.file_type, &job.collection).await
    };

    match result {
      Ok(outcome) => outcomes.push(serde_json::json!({ "path": file.path.to_string_lossy(), "outcome": format!("{outcome:?}") })),
      Err(e) => {
        warn!(path = %file.path.display(), error = %e, "file ingestion failed");
        outcomes.push(serde_json::json!({ "path": file.path.to_string_lossy(), "error": e.to_string() }));
      }
    }

    processed += 1;
    let progress = if total == 0 { 100 } else { processed * 100 / total };
    amelia_db::jobs::update_progress(&collaborators.store, job.id, progress, processed).await?;
  }

  Ok(serde_json::json!({ "files_processed": processed, "outcomes": outcomes }))
}

async fn run_crawl(collaborators: &Collaborators, job: &Job, cancel: CancellationToken) -> Result<serde_json::Value, CoordinatorError> {
  let request: CrawlRequest = serde_json::from_value(job.metadata.clone())?;

  let seed_kind = amelia_crawl::classify(&request.url);
  let seed_urls = match seed_kind {
    amelia_crawl::SeedKind::Sitemap | amelia_crawl::SeedKind::LlmsTxt => {
      let opts = amelia_crawl::FetchOptions {
        js_enabled: false,
        timeout: std::time::Duration::from_secs(30),
        user_agent: "amelia-crawler/0.1".to_string(),
      };
      let response = collaborators.fetcher.fetch(&request.url, &opts).await?;
      if seed_kind == amelia_crawl::SeedKind::Sitemap {
        amelia_crawl::expand_sitemap(&response.html)
      } else {
        amelia_crawl::expand_llms_txt(&response.html)
      }
    }
    amelia_crawl::SeedKind::Page => vec![request.url.clone()],
  };

  for seed in &seed_urls {
    let normalized = amelia_crawl::normalize(seed).map_err(amelia_crawl::CrawlError::from)?;
    let entry = amelia_core::CrawlQueueEntry::new_seed(normalized, job.collection.clone(), request.max_depth);
    amelia_db::crawl_queue::insert_if_absent(&collaborators.store, &entry).await?;
  }

  let config = CrawlJobConfig {
    collection: job.collection.clone(),
    max_depth: if request.follow_links { request.max_depth } else { 0 },
    max_pages: request.max_pages,
    include_patterns: request.include_patterns.clone(),
    exclude_patterns: request.exclude_patterns.clone(),
    pool_size: request.batch_size,
    js_enabled: request.js_enabled,
    respect_robots_txt: request.respect_robots_txt,
    user_agent: "amelia-crawler/0.1".to_string(),
    fetch_timeout: std::time::Duration::from_secs(30),
  };

  let pages_crawled = amelia_crawl::run(
    collaborators.store.clone(),
    collaborators.fetcher.clone(),
    collaborators.embedder.clone(),
    config,
    collaborators.rate_limit_config.clone(),
    cancel,
  )
  .await?;

  Ok(serde_json::json!({ "pages_crawled": pages_crawled }))
}

async fn run_transcribe(collaborators: &Collaborators, job: &Job) -> Result<serde_json::Value, CoordinatorError> {
  let request: IngestRequest = serde_json::from_value(job.metadata.clone())?;
  let transcription = TranscriptionPipeline::new(
    collaborators.store.clone(),
    collaborators.embedder.clone(),
    collaborators.asr.clone(),
    collaborators.inspector.clone(),
    collaborators.chunker_config.clone(),
  );
  let language_hint = request.transcription_language.as_deref().unwrap_or("auto");

  let mut outcomes = Vec::with_capacity(request.paths.len());
  for raw in &request.paths {
    let path = std::path::PathBuf::from(raw);
    let outcome = transcription.ingest_audio(&path, language_hint, &job.collection).await?;
    outcomes.push(serde_json::json!({ "path": raw, "outcome": format!("{outcome:?}") }));
  }

  Ok(serde_json::json!({ "outcomes": outcomes }))
}

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use amelia_core::{Chunk, ChunkMetadata, Collection, CrawlQueueEntry, CrawledUrl, Document, Embedding};
use amelia_db::Store;
use amelia_embedding::EmbeddingProvider;
use amelia_ingest::{ChunkerConfig, chunk_markdown, content_hash};
use tracing::{info, warn};

use crate::error::CrawlError;
use crate::fetcher::{FetchOptions, Fetcher};
use crate::rate_limit::HostRateLimiter;
use crate::robots::RobotsCache;
use crate::url_norm::{normalize, registrable_domain};

#[derive(Debug, Clone)]
pub struct CrawlJobConfig {
  pub collection: Collection,
  pub max_depth: i32,
  pub max_pages: i32,
  pub include_patterns: Vec<String>,
  pub exclude_patterns: Vec<String>,
  pub pool_size: usize,
  pub js_enabled: bool,
  pub respect_robots_txt: bool,
  pub user_agent: String,
  pub fetch_timeout: Duration,
}

impl From<&amelia_core::config::CrawlConfig> for CrawlJobConfig {
  fn from(c: &amelia_core::config::CrawlConfig) -> Self {
    Self {
      collection: amelia_core::Collection::new(amelia_core::DEFAULT_COLLECTION).expect("default collection is valid"),
      max_depth: c.max_depth,
      max_pages: c.max_pages,
      include_patterns: Vec::new(),
      exclude_patterns: Vec::new(),
      pool_size: c.pool_size,
      js_enabled: c.js_enabled,
      respect_robots_txt: c.respect_robots_txt,
      user_agent: c.user_agent.clone(),
      fetch_timeout: Duration::from_secs(c.fetch_timeout_secs),
    }
  }
}

fn passes_filters(url: &str, config: &CrawlJobConfig) -> bool {
  if config.exclude_patterns.iter().any(|p| url.contains(p.as_str())) {
    return false;
  }
  config.include_patterns.is_empty() || config.include_patterns.iter().any(|p| url.contains(p.as_str()))
}

/// Drives up to `config.pool_size` workers claiming `crawl_queue` rows for
/// `config.collection` until none remain eligible, `max_pages` is reached,
/// or `cancel` fires.
pub async fn run(
  store: Store,
  fetcher: Arc<dyn Fetcher>,
  embedder: Arc<dyn EmbeddingProvider>,
  config: CrawlJobConfig,
  rate_limit_config: crate::rate_limit::RateLimitConfig,
  cancel: tokio_util::sync::CancellationToken,
) -> Result<i32, CrawlError> {
  let rate_limiter = HostRateLimiter::new(rate_limit_config);
  let robots = Arc::new(RobotsCache::new(fetcher.clone(), config.user_agent.clone()));
  let processed = Arc::new(AtomicI32::new(0));
  let config = Arc::new(config);

  let mut handles = Vec::new();
  for _ in 0..config.pool_size.max(1) {
    let store = store.clone();
    let fetcher = fetcher.clone();
    let embedder = embedder.clone();
    let rate_limiter = rate_limiter.clone();
    let robots = robots.clone();
    let processed = processed.clone();
    let config = config.clone();
    let cancel = cancel.clone();

    handles.push(tokio::spawn(async move {
      worker_loop(store, fetcher, embedder, rate_limiter, robots, config, processed, cancel).await
    }));
  }

  for handle in handles {
    let _ = handle.await;
  }

  Ok(processed.load(Ordering::Relaxed))
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
  store: Store,
  fetcher: Arc<dyn Fetcher>,
  embedder: Arc<dyn EmbeddingProvider>,
  rate_limiter: Arc<HostRateLimiter>,
  robots: Arc<RobotsCache>,
  config: Arc<CrawlJobConfig>,
  processed: Arc<AtomicI32>,
  cancel: tokio_util::sync::CancellationToken,
) {
  loop {
    if cancel.is_cancelled() || processed.load(Ordering::Relaxed) >= config.max_pages {
      return;
    }

    let claimed = tokio::select! {
      _ = cancel.cancelled() => return,
      result = amelia_db::crawl_queue::claim_next(&store, &config.collection) => result,
    };

    let entry = match claimed {
      Ok(Some(entry)) => entry,
      Ok(None) => return,
      Err(e) => {
        warn!(error = %e, "crawl queue claim failed");
        return;
      }
    };

    match process_one(&store, &*fetcher, &*embedder, &rate_limiter, &robots, &config, &entry).await {
      Ok(true) => {
        processed.fetch_add(1, Ordering::Relaxed);
      }
      Ok(false) => {}
      Err(e) => {
        warn!(url = %entry.url, error = %e, "crawl of url failed");
        let _ = amelia_db::crawl_queue::mark_failed(&store, entry.id, &e.to_string()).await;
      }
    }
  }
}

/// Processes one claimed queue row per §4.4 steps 2-7. Returns `true` if the
/// page counted toward `processed_items`.
async fn process_one(
  store: &Store,
  fetcher: &dyn Fetcher,
  embedder: &dyn EmbeddingProvider,
  rate_limiter: &HostRateLimiter,
  robots: &RobotsCache,
  config: &CrawlJobConfig,
  entry: &CrawlQueueEntry,
) -> Result<bool, CrawlError> {
  let normalized = normalize(&entry.url)?;

  if amelia_db::crawl_queue::is_crawled(store, &config.collection, &normalized).await? {
    amelia_db::crawl_queue::mark_completed(store, entry.id).await?;
    return Ok(false);
  }

  if config.respect_robots_txt && robots.is_disallowed(&normalized).await {
    amelia_db::crawl_queue::mark_skipped(store, entry.id).await?;
    return Ok(false);
  }

  let host = registrable_domain(&normalized).unwrap_or_default();
  rate_limiter.acquire(&host).await;

  let opts = FetchOptions {
    js_enabled: config.js_enabled,
    timeout: config.fetch_timeout,
    user_agent: config.user_agent.clone(),
  };
  let response = fetcher.fetch(&normalized, &opts).await?;

  if response.status_code >= 500 {
    return Err(CrawlError::Fetch(format!("status {}", response.status_code)));
  }

  amelia_db::crawl_queue::record_crawled(
    store,
    &CrawledUrl::new(normalized.clone(), config.collection.clone(), Some(response.status_code as i32)),
  )
  .await?;

  let main_content = fetcher.extract_main_content(&response.html);
  publish_web_document(store, embedder, &config.collection, &normalized, &main_content).await?;

  if entry.depth + 1 <= entry.max_depth {
    let links = fetcher.extract_links(&response.html, &response.final_url);
    for link in links {
      let Ok(link_normalized) = normalize(&link) else { continue };
      if registrable_domain(&link_normalized) != registrable_domain(&normalized) {
        continue;
      }
      if !passes_filters(&link_normalized, config) {
        continue;
      }
      let discovered = CrawlQueueEntry::new_discovered(
        link_normalized,
        config.collection.clone(),
        entry.depth + 1,
        entry.max_depth,
        normalized.clone(),
        entry.seed_url.clone(),
      );
      amelia_db::crawl_queue::insert_if_absent(store, &discovered).await?;
    }
  }

  amelia_db::crawl_queue::mark_completed(store, entry.id).await?;
  Ok(true)
}

/// Runs §4.2 steps 3-5 against a web-sourced document: hash, version
/// decide, chunk, embed, publish transactionally.
async fn publish_web_document(
  store: &Store,
  embedder: &dyn EmbeddingProvider,
  collection: &Collection,
  url: &str,
  content: &str,
) -> Result<(), CrawlError> {
  let hash = content_hash(content);
  let existing = amelia_db::documents::find_by_source_url(store, collection, url).await?;

  if let Some(doc) = &existing {
    if doc.content_hash == hash {
      return Ok(());
    }
  }

  let chunker_config = ChunkerConfig::default();
  let drafts = chunk_markdown(content, &chunker_config);
  let texts: Vec<&str> = drafts.iter().map(|d| d.content.as_str()).collect();
  let vectors = if texts.is_empty() { Vec::new() } else { embedder.embed_batch(&texts).await? };

  let document_id = match &existing {
    Some(doc) => doc.id,
    None => amelia_core::DocumentId::new(),
  };

  let chunks: Vec<Chunk> = drafts
    .iter()
    .enumerate()
    .map(|(i, draft)| Chunk::new(document_id, i as i32, draft.content.clone(), draft.headers.clone(), ChunkMetadata::default()))
    .collect();

  let embeddings: Result<Vec<Embedding>, amelia_core::Error> = chunks
    .iter()
    .zip(vectors.into_iter())
    .map(|(chunk, vector)| Embedding::new(chunk.id, vector, embedder.model_id()))
    .collect();
  let embeddings = embeddings?;

  let mut tx = store.pool.begin().await.map_err(amelia_db::DbError::from)?;

  match existing {
    Some(mut doc) => {
      amelia_db::documents::delete_chunks(&mut tx, doc.id).await?;
      doc.apply_update(hash);
      amelia_db::documents::apply_update(&mut tx, &doc).await?;
    }
    None => {
      let title = url.to_string();
      let doc = Document::new_web(collection.clone(), url.to_string(), title, hash);
      amelia_db::documents::insert(&mut tx, &doc).await?;
    }
  }

  for chunk in &chunks {
    amelia_db::chunks::insert(&mut tx, chunk).await?;
  }
  for embedding in &embeddings {
    amelia_db::embeddings::insert(&mut tx, embedding).await?;
  }

  tx.commit().await.map_err(amelia_db::DbError::from)?;
  info!(url, "published web document");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> CrawlJobConfig {
    CrawlJobConfig {
      collection: Collection::new("c").unwrap(),
      max_depth: 3,
      max_pages: 100,
      include_patterns: vec![],
      exclude_patterns: vec![".pdf".to_string()],
      pool_size: 5,
      js_enabled: false,
      respect_robots_txt: true,
      user_agent: "amelia-crawler/0.1".to_string(),
      fetch_timeout: Duration::from_secs(30),
    }
  }

  #[test]
  fn filters_reject_excluded_substrings() {
    let config = config();
    assert!(!passes_filters("https://x.test/doc.pdf", &config));
    assert!(passes_filters("https://x.test/doc.html", &config));
  }

  #[test]
  fn empty_include_patterns_allow_everything() {
    let config = config();
    assert!(passes_filters("https://x.test/anything", &config));
  }
}

use std::sync::Arc;

use amelia_core::Collection;
use amelia_db::Store;
use amelia_embedding::EmbeddingProvider;

use crate::error::SearchError;
use crate::rerank::CrossEncoder;
use crate::rrf;
use crate::strategy::resolve_auto;
use crate::types::{Filters, Hit, Strategy};

#[derive(Debug, Clone)]
pub struct SearchConfig {
  pub alpha: f64,
  pub enable_reranking: bool,
  pub rerank_max_k: usize,
}

impl From<&amelia_core::config::SearchConfig> for SearchConfig {
  fn from(c: &amelia_core::config::SearchConfig) -> Self {
    Self {
      alpha: 0.5,
      enable_reranking: c.enable_reranking,
      rerank_max_k: 20,
    }
  }
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      alpha: 0.5,
      enable_reranking: false,
      rerank_max_k: 20,
    }
  }
}

pub struct SearchEngine {
  store: Store,
  embedder: Arc<dyn EmbeddingProvider>,
  reranker: Option<Arc<dyn CrossEncoder>>,
  config: SearchConfig,
}

impl SearchEngine {
  pub fn new(store: Store, embedder: Arc<dyn EmbeddingProvider>, config: SearchConfig) -> Self {
    Self {
      store,
      embedder,
      reranker: None,
      config,
    }
  }

  pub fn with_reranker(mut self, reranker: Arc<dyn CrossEncoder>) -> Self {
    self.reranker = Some(reranker);
    self
  }

  pub async fn vector_search(&self, query: &str, k: i64, collection: &Collection, filters: &Filters) -> Result<Vec<Hit>, SearchError> {
    let vector = self.embedder.embed(query).await?;
    let rows = amelia_db::search::vector_search(&self.store, collection, &vector, k, &filters.into()).await?;
    Ok(rows.into_iter().map(Hit::from).collect())
  }

  pub async fn bm25_search(&self, query: &str, k: i64, collection: &Collection, filters: &Filters) -> Result<Vec<Hit>, SearchError> {
    let rows = amelia_db::search::bm25_search(&self.store, collection, query, k, &filters.into()).await?;
    Ok(rows.into_iter().map(Hit::from).collect())
  }

  /// Runs both rankings with `k' = 3k` candidates and fuses by RRF.
  pub async fn hybrid_search(&self, query: &str, k: i64, collection: &Collection, filters: &Filters) -> Result<Vec<Hit>, SearchError> {
    let expanded = k * 3;
    let vector = self.embedder.embed(query).await?;
    let (vector_rows, bm25_rows) = tokio::try_join!(
      amelia_db::search::vector_search(&self.store, collection, &vector, expanded, &filters.into()),
      amelia_db::search::bm25_search(&self.store, collection, query, expanded, &filters.into()),
    )?;
    let vector_hits: Vec<Hit> = vector_rows.into_iter().map(Hit::from).collect();
    let bm25_hits: Vec<Hit> = bm25_rows.into_iter().map(Hit::from).collect();
    Ok(rrf::fuse(vector_hits, bm25_hits, self.config.alpha, k as usize))
  }

  pub async fn rerank(&self, query: &str, candidates: Vec<Hit>, top_k: usize) -> Result<Vec<Hit>, SearchError> {
    match &self.reranker {
      Some(reranker) => crate::rerank::rerank(reranker.as_ref(), query, candidates, top_k).await,
      None => {
        let mut candidates = candidates;
        candidates.truncate(top_k);
        Ok(candidates)
      }
    }
  }

  /// Resolves `strategy`, runs it, optionally reranks, and reports back the
  /// strategy that was actually used.
  pub async fn search(
    &self,
    query: &str,
    k: i64,
    collection: &Collection,
    strategy: Strategy,
    filters: &Filters,
  ) -> Result<(Vec<Hit>, Strategy), SearchError> {
    if query.trim().is_empty() {
      return Err(SearchError::EmptyQuery);
    }

    let resolved = match strategy {
      Strategy::Auto => resolve_auto(query),
      other => other,
    };

    let mut hits = match resolved {
      Strategy::Vector => self.vector_search(query, k, collection, filters).await?,
      Strategy::Hybrid | Strategy::Contextual => self.hybrid_search(query, k, collection, filters).await?,
      Strategy::Auto => unreachable!("resolved above"),
    };

    if self.config.enable_reranking && self.reranker.is_some() && k <= self.config.rerank_max_k as i64 {
      hits = self.rerank(query, hits, k as usize).await?;
    }

    Ok((hits, resolved))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_alpha_is_balanced() {
    assert_eq!(SearchConfig::default().alpha, 0.5);
  }
}

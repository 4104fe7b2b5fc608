use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
  Pending,
  InProgress,
  Completed,
  Failed,
  Skipped,
}

/// A URL pending or completed crawl within a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlQueueEntry {
  pub id: uuid::Uuid,
  pub url: String,
  pub collection: Collection,
  pub depth: i32,
  pub max_depth: i32,
  pub priority: i32,
  pub parent_url: Option<String>,
  pub seed_url: String,
  pub retry_count: i32,
  pub last_attempt_at: Option<DateTime<Utc>>,
  pub last_error: Option<String>,
  pub status: CrawlStatus,
  pub discovered_at: DateTime<Utc>,
}

impl CrawlQueueEntry {
  pub fn new_seed(url: String, collection: Collection, max_depth: i32) -> Self {
    let now = Utc::now();
    Self {
      id: uuid::Uuid::now_v7(),
      url: url.clone(),
      collection,
      depth: 0,
      max_depth,
      priority: 0,
      parent_url: None,
      seed_url: url,
      retry_count: 0,
      last_attempt_at: None,
      last_error: None,
      status: CrawlStatus::Pending,
      discovered_at: now,
    }
  }

  pub fn new_discovered(
    url: String,
    collection: Collection,
    depth: i32,
    max_depth: i32,
    parent_url: String,
    seed_url: String,
  ) -> Self {
    Self {
      id: uuid::Uuid::now_v7(),
      url,
      collection,
      depth,
      max_depth,
      priority: 0,
      parent_url: Some(parent_url),
      seed_url,
      retry_count: 0,
      last_attempt_at: None,
      last_error: None,
      status: CrawlStatus::Pending,
      discovered_at: Utc::now(),
    }
  }
}

/// Dedup key `(url, collection)`: once present, the normalized URL is never
/// re-crawled for that collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledUrl {
  pub url: String,
  pub collection: Collection,
  pub crawled_at: DateTime<Utc>,
  pub status_code: Option<i32>,
}

impl CrawledUrl {
  pub fn new(url: String, collection: Collection, status_code: Option<i32>) -> Self {
    Self {
      url,
      collection,
      crawled_at: Utc::now(),
      status_code,
    }
  }
}

/// Per-row retry backoff window used by the selection query:
/// `last_attempt_at < now - interval(2^retry_count seconds)`.
pub fn retry_backoff_seconds(retry_count: i32) -> i64 {
  1i64.checked_shl(retry_count.max(0) as u32).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn retry_backoff_doubles() {
    assert_eq!(retry_backoff_seconds(0), 1);
    assert_eq!(retry_backoff_seconds(1), 2);
    assert_eq!(retry_backoff_seconds(3), 8);
  }

  #[test]
  fn seed_entry_starts_at_depth_zero() {
    let e = CrawlQueueEntry::new_seed("http://h.test/".into(), Collection::new("c").unwrap(), 3);
    assert_eq!(e.depth, 0);
    assert_eq!(e.status, CrawlStatus::Pending);
    assert!(e.parent_url.is_none());
  }
}

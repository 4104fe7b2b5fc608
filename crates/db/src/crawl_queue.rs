use amelia_core::{Collection, CrawlQueueEntry, CrawlStatus, CrawledUrl};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::connection::{DbError, Result, Store};

#[derive(sqlx::FromRow)]
struct CrawlQueueRow {
  id: Uuid,
  url: String,
  collection: String,
  depth: i32,
  max_depth: i32,
  priority: i32,
  parent_url: Option<String>,
  seed_url: String,
  retry_count: i32,
  last_attempt_at: Option<DateTime<Utc>>,
  last_error: Option<String>,
  status: String,
  discovered_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<CrawlStatus> {
  Ok(match s {
    "pending" => CrawlStatus::Pending,
    "in_progress" => CrawlStatus::InProgress,
    "completed" => CrawlStatus::Completed,
    "failed" => CrawlStatus::Failed,
    "skipped" => CrawlStatus::Skipped,
    other => return Err(DbError::NotFound(format!("invalid crawl status: {other}"))),
  })
}

pub fn status_str(status: CrawlStatus) -> &'static str {
  match status {
    CrawlStatus::Pending => "pending",
    CrawlStatus::InProgress => "in_progress",
    CrawlStatus::Completed => "completed",
    CrawlStatus::Failed => "failed",
    CrawlStatus::Skipped => "skipped",
  }
}

impl TryFrom<CrawlQueueRow> for CrawlQueueEntry {
  type Error = DbError;

  fn try_from(row: CrawlQueueRow) -> Result<Self> {
    let status = parse_status(&row.status)?;
    let collection = Collection::new(row.collection).map_err(|e| DbError::NotFound(e.to_string()))?;
    Ok(CrawlQueueEntry {
      id: row.id,
      url: row.url,
      collection,
      depth: row.depth,
      max_depth: row.max_depth,
      priority: row.priority,
      parent_url: row.parent_url,
      seed_url: row.seed_url,
      retry_count: row.retry_count,
      last_attempt_at: row.last_attempt_at,
      last_error: row.last_error,
      status,
      discovered_at: row.discovered_at,
    })
  }
}

pub async fn insert_if_absent(store: &Store, entry: &CrawlQueueEntry) -> Result<bool> {
  let result = sqlx::query(
    "INSERT INTO crawl_queue
       (id, url, collection, depth, max_depth, priority, parent_url, seed_url,
        retry_count, status, discovered_at)
     VALUES ($1,$2,$3,$4,$5,$6,$7,$8,0,'pending',$9)
     ON CONFLICT (collection, url) DO NOTHING",
  )
  .bind(entry.id)
  .bind(&entry.url)
  .bind(entry.collection.as_str())
  .bind(entry.depth)
  .bind(entry.max_depth)
  .bind(entry.priority)
  .bind(&entry.parent_url)
  .bind(&entry.seed_url)
  .bind(entry.discovered_at)
  .execute(&store.pool)
  .await?;
  Ok(result.rows_affected() == 1)
}

/// The literal selection query from the spec's crawl pipeline section: it
/// co-implements per-row retry backoff and the per-domain circuit breaker in
/// a single statement. Deliberately not expressed through a query builder.
const SELECTION_QUERY: &str = "
  SELECT q.* FROM crawl_queue q
  WHERE q.collection = $1
    AND q.status = 'pending'
    AND q.depth <= q.max_depth
    AND (q.last_attempt_at IS NULL
         OR q.last_attempt_at < now() - (power(2, q.retry_count) || ' seconds')::interval)
    AND NOT EXISTS (
      SELECT 1 FROM crawl_queue f
      WHERE domain_of(f.url) = domain_of(q.url)
        AND f.collection = q.collection
        AND f.status = 'failed'
        AND f.last_attempt_at > now() - interval '5 minutes'
      GROUP BY domain_of(f.url)
      HAVING count(*) >= 10
    )
  ORDER BY q.priority DESC, q.discovered_at ASC
  LIMIT 1
  FOR UPDATE SKIP LOCKED
";

/// Selects and atomically claims the next eligible row by transitioning it
/// `pending → in_progress` within the same transaction, so callers see a
/// lock they already hold.
pub async fn claim_next(store: &Store, collection: &Collection) -> Result<Option<CrawlQueueEntry>> {
  let mut tx = store.pool.begin().await?;
  let row = sqlx::query_as::<_, CrawlQueueRow>(SELECTION_QUERY)
    .bind(collection.as_str())
    .fetch_optional(&mut *tx)
    .await?;

  let Some(row) = row else {
    tx.commit().await?;
    return Ok(None);
  };

  sqlx::query("UPDATE crawl_queue SET status = 'in_progress', last_attempt_at = now() WHERE id = $1")
    .bind(row.id)
    .execute(&mut *tx)
    .await?;
  tx.commit().await?;

  CrawlQueueEntry::try_from(row).map(Some)
}

pub async fn mark_completed(store: &Store, id: Uuid) -> Result<()> {
  sqlx::query("UPDATE crawl_queue SET status = 'completed' WHERE id = $1")
    .bind(id)
    .execute(&store.pool)
    .await?;
  Ok(())
}

pub async fn mark_skipped(store: &Store, id: Uuid) -> Result<()> {
  sqlx::query("UPDATE crawl_queue SET status = 'skipped' WHERE id = $1")
    .bind(id)
    .execute(&store.pool)
    .await?;
  Ok(())
}

pub async fn mark_failed(store: &Store, id: Uuid, error: &str) -> Result<()> {
  sqlx::query(
    "UPDATE crawl_queue SET status = 'failed', retry_count = retry_count + 1,
       last_attempt_at = now(), last_error = $2 WHERE id = $1",
  )
  .bind(id)
  .bind(error)
  .execute(&store.pool)
  .await?;
  Ok(())
}

/// Crash recovery: resets in-progress rows back to pending for a collection.
pub async fn reset_in_progress(store: &Store, collection: &Collection) -> Result<u64> {
  let result = sqlx::query("UPDATE crawl_queue SET status = 'pending' WHERE collection = $1 AND status = 'in_progress'")
    .bind(collection.as_str())
    .execute(&store.pool)
    .await?;
  Ok(result.rows_affected())
}

pub async fn has_pending_or_in_progress(store: &Store, collection: &Collection) -> Result<bool> {
  let count: i64 = sqlx::query_scalar(
    "SELECT count(*) FROM crawl_queue WHERE collection = $1 AND status IN ('pending', 'in_progress')",
  )
  .bind(collection.as_str())
  .fetch_one(&store.pool)
  .await?;
  Ok(count > 0)
}

pub async fn is_crawled(store: &Store, collection: &Collection, url: &str) -> Result<bool> {
  let count: i64 = sqlx::query_scalar("SELECT count(*) FROM crawled_urls WHERE collection = $1 AND url = $2")
    .bind(collection.as_str())
    .bind(url)
    .fetch_one(&store.pool)
    .await?;
  Ok(count > 0)
}

pub async fn record_crawled(store: &Store, entry: &CrawledUrl) -> Result<()> {
  sqlx::query(
    "INSERT INTO crawled_urls (url, collection, crawled_at, status_code)
       VALUES ($1,$2,$3,$4) ON CONFLICT (collection, url) DO NOTHING",
  )
  .bind(&entry.url)
  .bind(entry.collection.as_str())
  .bind(entry.crawled_at)
  .bind(entry.status_code)
  .execute(&store.pool)
  .await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_round_trips() {
    for s in [
      CrawlStatus::Pending,
      CrawlStatus::InProgress,
      CrawlStatus::Completed,
      CrawlStatus::Failed,
      CrawlStatus::Skipped,
    ] {
      assert_eq!(parse_status(status_str(s)).unwrap(), s);
    }
  }
}

use amelia_core::{Collection, Job, JobId, JobStatus, JobType};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::connection::{DbError, Result, Store};

#[derive(sqlx::FromRow)]
struct JobRow {
  id: Uuid,
  job_type: String,
  collection: String,
  status: String,
  progress: i32,
  total_items: Option<i32>,
  processed_items: i32,
  error_message: Option<String>,
  metadata: serde_json::Value,
  retry_count: i32,
  max_retries: i32,
  next_run_at: DateTime<Utc>,
  last_retry_at: Option<DateTime<Utc>>,
  backoff_delay: Option<i32>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
  completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
  type Error = DbError;

  fn try_from(row: JobRow) -> Result<Self> {
    let job_type = row
      .job_type
      .parse::<JobType>()
      .map_err(|e| DbError::NotFound(format!("invalid job_type in row: {e}")))?;
    let status = parse_status(&row.status)?;
    let collection = Collection::new(row.collection).map_err(|e| DbError::NotFound(e.to_string()))?;
    Ok(Job {
      id: JobId::from_uuid(row.id),
      job_type,
      collection,
      status,
      progress: row.progress,
      total_items: row.total_items,
      processed_items: row.processed_items,
      error_message: row.error_message,
      metadata: row.metadata,
      retry_count: row.retry_count,
      max_retries: row.max_retries,
      next_run_at: row.next_run_at,
      last_retry_at: row.last_retry_at,
      backoff_delay: row.backoff_delay,
      created_at: row.created_at,
      updated_at: row.updated_at,
      completed_at: row.completed_at,
    })
  }
}

fn parse_status(s: &str) -> Result<JobStatus> {
  Ok(match s {
    "pending" => JobStatus::Pending,
    "running" => JobStatus::Running,
    "completed" => JobStatus::Completed,
    "failed" => JobStatus::Failed,
    "paused" => JobStatus::Paused,
    other => return Err(DbError::NotFound(format!("invalid job status: {other}"))),
  })
}

/// `submit`: inserts a `pending` row, `retry_count=0`, `max_retries=3`.
pub async fn submit(store: &Store, job: &Job) -> Result<JobId> {
  sqlx::query(
    "INSERT INTO jobs
       (id, job_type, collection, status, progress, total_items, processed_items,
        metadata, retry_count, max_retries, next_run_at, created_at, updated_at)
     VALUES ($1,$2,$3,'pending',0,$4,0,$5,0,$6,$7,$8,$8)",
  )
  .bind(job.id.as_uuid())
  .bind(job.job_type.as_str())
  .bind(job.collection.as_str())
  .bind(job.total_items)
  .bind(&job.metadata)
  .bind(job.max_retries)
  .bind(job.next_run_at)
  .bind(job.created_at)
  .execute(&store.pool)
  .await?;
  Ok(job.id)
}

pub async fn status(store: &Store, id: JobId) -> Result<Job> {
  let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
    .bind(id.as_uuid())
    .fetch_optional(&store.pool)
    .await?
    .ok_or_else(|| DbError::NotFound(format!("job {id}")))?;
  Job::try_from(row)
}

/// Selects pending, due jobs of one type up to `limit`, ordered oldest-due
/// first. Does not itself transition status — callers CAS each row with
/// `try_start`.
pub async fn select_dispatchable(store: &Store, job_type: JobType, limit: i64) -> Result<Vec<Job>> {
  let rows = sqlx::query_as::<_, JobRow>(
    "SELECT * FROM jobs WHERE job_type = $1::job_type AND status = 'pending' AND next_run_at <= now()
       ORDER BY next_run_at ASC LIMIT $2",
  )
  .bind(job_type.as_str())
  .bind(limit)
  .fetch_all(&store.pool)
  .await?;
  rows.into_iter().map(Job::try_from).collect()
}

/// Compare-and-set `pending → running`; returns `true` if this caller won
/// the race (prevents double-dispatch across controller ticks).
pub async fn try_start(store: &Store, id: JobId) -> Result<bool> {
  let result = sqlx::query("UPDATE jobs SET status = 'running', updated_at = now() WHERE id = $1 AND status = 'pending'")
    .bind(id.as_uuid())
    .execute(&store.pool)
    .await?;
  Ok(result.rows_affected() == 1)
}

pub async fn update_progress(store: &Store, id: JobId, progress: i32, processed_items: i32) -> Result<()> {
  sqlx::query("UPDATE jobs SET progress = $2, processed_items = $3, updated_at = now() WHERE id = $1")
    .bind(id.as_uuid())
    .bind(progress)
    .bind(processed_items)
    .execute(&store.pool)
    .await?;
  Ok(())
}

pub async fn complete(store: &Store, id: JobId, metadata: serde_json::Value) -> Result<()> {
  sqlx::query(
    "UPDATE jobs SET status = 'completed', progress = 100, completed_at = now(),
       updated_at = now(), metadata = $2 WHERE id = $1",
  )
  .bind(id.as_uuid())
  .bind(metadata)
  .execute(&store.pool)
  .await?;
  Ok(())
}

/// Applies the retry/backoff step: increments `retry_count`; if still under
/// `max_retries`, reschedules with `next_run_at = now + backoff`, else marks
/// terminally `failed`.
pub async fn fail_or_retry(store: &Store, id: JobId, error: &str) -> Result<()> {
  let job = status(store, id).await?;
  let retry_count = job.retry_count + 1;
  if retry_count <= job.max_retries {
    let backoff = amelia_core::backoff_seconds(retry_count);
    sqlx::query(
      "UPDATE jobs SET status = 'pending', retry_count = $2, backoff_delay = $3,
         next_run_at = now() + ($3 || ' seconds')::interval, last_retry_at = now(),
         error_message = $4, updated_at = now() WHERE id = $1",
    )
    .bind(id.as_uuid())
    .bind(retry_count)
    .bind(backoff as i32)
    .bind(error)
    .execute(&store.pool)
    .await?;
  } else {
    sqlx::query("UPDATE jobs SET status = 'failed', retry_count = $2, error_message = $3, updated_at = now() WHERE id = $1")
      .bind(id.as_uuid())
      .bind(retry_count)
      .bind(error)
      .execute(&store.pool)
      .await?;
  }
  Ok(())
}

/// `cancel`: transitions a non-terminal job to `failed` with a cancellation
/// message. No-ops on already-terminal jobs.
pub async fn cancel(store: &Store, id: JobId) -> Result<()> {
  sqlx::query(
    "UPDATE jobs SET status = 'failed', error_message = 'cancelled', updated_at = now()
       WHERE id = $1 AND status NOT IN ('completed', 'failed')",
  )
  .bind(id.as_uuid())
  .execute(&store.pool)
  .await?;
  Ok(())
}

/// Resets jobs interrupted by a process crash: `running` rows are reset to
/// `pending` (if retries remain) or `failed` with an "interrupted" message.
/// Returns the ids of jobs that were crawl jobs, so the caller can also
/// reset their `crawl_queue` rows.
pub async fn recover(store: &Store) -> Result<Vec<JobId>> {
  let interrupted = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE status = 'running'")
    .fetch_all(&store.pool)
    .await?;

  let mut crawl_job_ids = Vec::new();
  for row in interrupted {
    let job = Job::try_from(row)?;
    if job.job_type == JobType::Crawl {
      crawl_job_ids.push(job.id);
    }
    if job.retry_count < job.max_retries {
      let backoff = amelia_core::backoff_seconds(job.retry_count + 1);
      sqlx::query(
        "UPDATE jobs SET status = 'pending', next_run_at = now() + ($2 || ' seconds')::interval,
           updated_at = now() WHERE id = $1",
      )
      .bind(job.id.as_uuid())
      .bind(backoff as i32)
      .execute(&store.pool)
      .await?;
    } else {
      sqlx::query("UPDATE jobs SET status = 'failed', error_message = 'interrupted', updated_at = now() WHERE id = $1")
        .bind(job.id.as_uuid())
        .execute(&store.pool)
        .await?;
    }
  }
  Ok(crawl_job_ids)
}


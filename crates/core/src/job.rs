use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::ids::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
  Ingest,
  Crawl,
  Transcribe,
}

impl JobType {
  pub fn as_str(&self) -> &'static str {
    match self {
      JobType::Ingest => "ingest",
      JobType::Crawl => "crawl",
      JobType::Transcribe => "transcribe",
    }
  }
}

impl std::str::FromStr for JobType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "ingest" => Ok(JobType::Ingest),
      "crawl" => Ok(JobType::Crawl),
      "transcribe" => Ok(JobType::Transcribe),
      other => Err(format!("unknown job type: {other}")),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
  Pending,
  Running,
  Completed,
  Failed,
  Paused,
}

impl JobStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, JobStatus::Completed | JobStatus::Failed)
  }
}

/// A unit of asynchronous work dispatched by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
  pub id: JobId,
  pub job_type: JobType,
  pub collection: Collection,
  pub status: JobStatus,

  /// 0-100.
  pub progress: i32,
  pub total_items: Option<i32>,
  pub processed_items: i32,
  pub error_message: Option<String>,

  /// Request envelope needed to resume, plus per-item outcome summaries.
  pub metadata: serde_json::Value,

  pub retry_count: i32,
  pub max_retries: i32,
  pub next_run_at: DateTime<Utc>,
  pub last_retry_at: Option<DateTime<Utc>>,
  pub backoff_delay: Option<i32>,

  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
  pub fn new(job_type: JobType, collection: Collection, metadata: serde_json::Value) -> Self {
    let now = Utc::now();
    Self {
      id: JobId::new(),
      job_type,
      collection,
      status: JobStatus::Pending,
      progress: 0,
      total_items: None,
      processed_items: 0,
      error_message: None,
      metadata,
      retry_count: 0,
      max_retries: 3,
      next_run_at: now,
      last_retry_at: None,
      backoff_delay: None,
      created_at: now,
      updated_at: now,
      completed_at: None,
    }
  }
}

/// `min(60, 2^(retry_count-1))` seconds, per the coordinator's dispatch loop.
/// `retry_count` is expected to be ≥ 1; a value of 0 yields a one-second delay.
pub fn backoff_seconds(retry_count: i32) -> i64 {
  let exponent = retry_count.saturating_sub(1).max(0);
  let delay = 1i64.checked_shl(exponent as u32).unwrap_or(i64::MAX);
  delay.min(60)
}

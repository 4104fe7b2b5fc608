use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use amelia_core::{Job, JobId, JobType};
use amelia_core::config::JobConcurrencyConfig;
use amelia_db::Store;
use tokio::sync::{Mutex, Semaphore, broadcast};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoordinatorError;
use crate::handlers::{self, Collaborators};

const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Single-threaded control loop: on every tick it selects due jobs per type
/// up to that type's free semaphore permits, CAS-claims each with
/// `try_start`, and spawns its execution. One coordinator per store.
pub struct Coordinator {
  store: Store,
  collaborators: Collaborators,
  concurrency: JobConcurrencyConfig,
  shutdown_rx: broadcast::Receiver<()>,
  running: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
}

impl Coordinator {
  pub fn new(store: Store, collaborators: Collaborators, concurrency: JobConcurrencyConfig, shutdown_rx: broadcast::Receiver<()>) -> Self {
    Self {
      store,
      collaborators,
      concurrency,
      shutdown_rx,
      running: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Cheap handle for submitting/inspecting/cancelling jobs, independent of
  /// the dispatch loop itself. `run(self)` consumes the `Coordinator`; callers
  /// that need to keep submitting jobs while the loop runs in its own task
  /// should take a `handle()` before calling `run`.
  pub fn handle(&self) -> JobControl {
    JobControl {
      store: self.store.clone(),
      running: self.running.clone(),
    }
  }

  /// Resets jobs interrupted by a prior crash before the loop starts
  /// dispatching new work: `running` jobs go back to `pending` (or
  /// terminally `failed` once out of retries), and any of those that were
  /// crawl jobs also get their `crawl_queue` rows reset to `pending`.
  pub async fn recover(&self) -> Result<(), CoordinatorError> {
    let interrupted_crawls = amelia_db::jobs::recover(&self.store).await?;
    for job_id in interrupted_crawls {
      let job = amelia_db::jobs::status(&self.store, job_id).await?;
      amelia_db::crawl_queue::reset_in_progress(&self.store, &job.collection).await?;
    }
    Ok(())
  }

  pub async fn run(mut self) {
    let semaphores = JobSemaphores::new(&self.concurrency);
    let mut timer = interval(POLL_INTERVAL);

    loop {
      tokio::select! {
        _ = timer.tick() => {
          self.dispatch_tick(&semaphores).await;
        }
        _ = self.shutdown_rx.recv() => {
          debug!("coordinator received shutdown signal");
          self.cancel_all().await;
          break;
        }
      }
    }
  }

  async fn dispatch_tick(&self, semaphores: &JobSemaphores) {
    for job_type in [JobType::Crawl, JobType::Transcribe, JobType::Ingest] {
      let permits = semaphores.available(job_type);
      if permits == 0 {
        continue;
      }

      let due = match amelia_db::jobs::select_dispatchable(&self.store, job_type, permits as i64).await {
        Ok(jobs) => jobs,
        Err(e) => {
          warn!(job_type = job_type.as_str(), error = %e, "failed to select dispatchable jobs");
          continue;
        }
      };

      for job in due {
        let permit = match semaphores.try_acquire(job_type) {
          Some(permit) => permit,
          None => break,
        };

        match amelia_db::jobs::try_start(&self.store, job.id).await {
          Ok(true) => {}
          Ok(false) => continue,
          Err(e) => {
            warn!(job_id = %job.id, error = %e, "try_start failed");
            continue;
          }
        }

        self.spawn_job(job, permit).await;
      }
    }
  }

  async fn spawn_job(&self, job: Job, permit: tokio::sync::OwnedSemaphorePermit) {
    let store = self.store.clone();
    let collaborators = self.collaborators.clone();
    let cancel = CancellationToken::new();
    let job_id = job.id;

    self.running.lock().await.insert(job_id, cancel.clone());
    let running = self.running.clone();

    tokio::spawn(async move {
      let _permit = permit;
      info!(job_id = %job_id, job_type = job.job_type.as_str(), "dispatching job");

      let result = handlers::execute(&collaborators, &job, cancel).await;
      match result {
        Ok(metadata) => {
          if let Err(e) = amelia_db::jobs::complete(&store, job_id, metadata).await {
            warn!(job_id = %job_id, error = %e, "failed to mark job completed");
          }
        }
        Err(e) => {
          warn!(job_id = %job_id, error = %e, "job failed");
          if let Err(e) = amelia_db::jobs::fail_or_retry(&store, job_id, &e.to_string()).await {
            warn!(job_id = %job_id, error = %e, "failed to record job failure");
          }
        }
      }

      running.lock().await.remove(&job_id);
    });
  }

  async fn cancel_all(&self) {
    let running = self.running.lock().await;
    for token in running.values() {
      token.cancel();
    }
  }
}

/// Cloneable handle for submitting, polling, and cancelling jobs without
/// owning the dispatch loop. Shares the `running` cancellation-token map with
/// whichever `Coordinator` produced it, so `cancel()` reaches jobs the loop
/// is currently executing.
#[derive(Clone)]
pub struct JobControl {
  store: Store,
  running: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
}

impl JobControl {
  pub async fn submit(&self, job: Job) -> Result<JobId, CoordinatorError> {
    Ok(amelia_db::jobs::submit(&self.store, &job).await?)
  }

  pub async fn status(&self, id: JobId) -> Result<Job, CoordinatorError> {
    Ok(amelia_db::jobs::status(&self.store, id).await?)
  }

  /// Cancels a job's database row and, if it is currently executing on this
  /// process, signals its [`CancellationToken`] so the running handler can
  /// unwind cooperatively.
  pub async fn cancel(&self, id: JobId) -> Result<(), CoordinatorError> {
    amelia_db::jobs::cancel(&self.store, id).await?;
    if let Some(token) = self.running.lock().await.get(&id) {
      token.cancel();
    }
    Ok(())
  }
}

struct JobSemaphores {
  crawl: Arc<Semaphore>,
  transcribe: Arc<Semaphore>,
  ingest: Arc<Semaphore>,
}

impl JobSemaphores {
  fn new(config: &JobConcurrencyConfig) -> Self {
    Self {
      crawl: Arc::new(Semaphore::new(config.crawl)),
      transcribe: Arc::new(Semaphore::new(config.transcribe)),
      ingest: Arc::new(Semaphore::new(config.ingest)),
    }
  }

  fn semaphore(&self, job_type: JobType) -> &Arc<Semaphore> {
    match job_type {
      JobType::Crawl => &self.crawl,
      JobType::Transcribe => &self.transcribe,
      JobType::Ingest => &self.ingest,
    }
  }

  fn available(&self, job_type: JobType) -> usize {
    self.semaphore(job_type).available_permits()
  }

  fn try_acquire(&self, job_type: JobType) -> Option<tokio::sync::OwnedSemaphorePermit> {
    self.semaphore(job_type).clone().try_acquire_owned().ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn semaphores_start_at_configured_capacity() {
    let config = JobConcurrencyConfig::default();
    let semaphores = JobSemaphores::new(&config);
    assert_eq!(semaphores.available(JobType::Crawl), 3);
    assert_eq!(semaphores.available(JobType::Transcribe), 2);
    assert_eq!(semaphores.available(JobType::Ingest), 5);
  }

  #[test]
  fn acquiring_reduces_availability() {
    let config = JobConcurrencyConfig::default();
    let semaphores = JobSemaphores::new(&config);
    let _permit = semaphores.try_acquire(JobType::Ingest).unwrap();
    assert_eq!(semaphores.available(JobType::Ingest), 4);
  }
}

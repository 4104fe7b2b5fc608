use crate::router::Router;
use crate::server::{Server, ShutdownHandle};
use crate::tools::ToolHandler;
use amelia_core::config::{Config, EmbeddingDevice};
use amelia_coordinator::{Collaborators, Coordinator};
use amelia_crawl::HttpFetcher;
use amelia_db::Store;
use amelia_embedding::{Device, EmbeddingProvider, HttpEmbeddingProvider};
use amelia_ingest::{HttpAsrProvider, HttpMediaInspector};
use amelia_search::{SearchConfig, SearchEngine};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum LifecycleError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("store error: {0}")]
  Store(#[from] amelia_db::DbError),
  #[error("coordinator error: {0}")]
  Coordinator(#[from] amelia_coordinator::CoordinatorError),
  #[error("Server error: {0}")]
  Server(#[from] crate::server::ServerError),
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
  /// Socket path for IPC
  pub socket_path: PathBuf,
  /// Idle timeout in seconds before auto-shutdown
  pub idle_timeout_secs: u64,
  /// Core configuration (store connection, embedding, search, crawl, ...)
  pub core: Config,
}

impl Default for DaemonConfig {
  fn default() -> Self {
    Self {
      socket_path: crate::server::default_socket_path(),
      idle_timeout_secs: 1800,
      core: Config::default(),
    }
  }
}

/// Builds the embedding provider named by configuration. Amelia talks to a
/// single self-hosted embedding server over HTTP; device and batch size are
/// the only tunables.
fn create_embedding_provider(config: &Config) -> Arc<dyn EmbeddingProvider> {
  let device = match config.embedding.device {
    EmbeddingDevice::Cpu => Device::Cpu,
    EmbeddingDevice::Cuda => Device::Cuda,
  };
  Arc::new(HttpEmbeddingProvider::new().with_device(device).with_batch_size(config.embedding.batch_size))
}

/// Daemon lifecycle manager
pub struct Daemon {
  config: DaemonConfig,
  shutdown: Option<ShutdownHandle>,
  coordinator_shutdown_tx: Option<broadcast::Sender<()>>,
}

impl Daemon {
  pub fn new(config: DaemonConfig) -> Self {
    Self {
      config,
      shutdown: None,
      coordinator_shutdown_tx: None,
    }
  }

  /// Run the daemon
  pub async fn run(&mut self) -> Result<(), LifecycleError> {
    info!("Starting Amelia daemon");
    info!("Socket: {:?}", self.config.socket_path);

    let store = Store::connect(&self.config.core.database_url).await?;

    let embedder = create_embedding_provider(&self.config.core);
    info!(
      "Using embedding provider: {} ({}, {} dims)",
      embedder.name(),
      embedder.model_id(),
      embedder.dimensions()
    );
    if embedder.is_available().await {
      info!("Embedding provider is available");
    } else {
      warn!("Embedding provider is not available - falling back to text search");
    }

    let fetcher = Arc::new(HttpFetcher::default());
    let asr = Arc::new(HttpAsrProvider::new().with_model(self.config.core.audio.whisper_model.as_str()));
    let inspector = Arc::new(HttpMediaInspector::new("http://localhost:8089"));

    let collaborators = Collaborators {
      store: store.clone(),
      embedder: embedder.clone(),
      fetcher,
      asr,
      inspector,
      chunker_config: (&self.config.core.chunk).into(),
      rate_limit_config: (&self.config.core.rate_limit).into(),
    };

    let (coordinator_shutdown_tx, coordinator_shutdown_rx) = broadcast::channel(1);
    self.coordinator_shutdown_tx = Some(coordinator_shutdown_tx.clone());

    let coordinator = Coordinator::new(
      store.clone(),
      collaborators,
      self.config.core.job_concurrency.clone(),
      coordinator_shutdown_rx,
    );
    coordinator.recover().await?;
    let jobs = coordinator.handle();
    tokio::spawn(coordinator.run());

    let search_config = SearchConfig::from(&self.config.core.search);
    let search = Arc::new(SearchEngine::new(store.clone(), embedder, search_config));

    let tool_handler = Arc::new(ToolHandler::new(jobs, search, store));
    let router = Arc::new(Router::new(tool_handler));

    let server = Server::with_socket_path(Arc::clone(&router), self.config.socket_path.clone());
    let shutdown = server.shutdown_handle();
    self.shutdown = Some(shutdown.clone());
    router.set_shutdown_handle(shutdown.clone()).await;

    let shutdown_clone = shutdown.clone();
    let coordinator_tx = coordinator_shutdown_tx;
    tokio::spawn(async move {
      if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        return;
      }
      info!("Received ctrl-c, shutting down...");
      let _ = coordinator_tx.send(());
      shutdown_clone.shutdown();
    });

    server.run().await?;
    info!("Daemon shutdown complete");

    Ok(())
  }

  /// Shutdown the daemon
  pub fn shutdown(&self) {
    if let Some(ref shutdown) = self.shutdown {
      shutdown.shutdown();
    }
    if let Some(ref tx) = self.coordinator_shutdown_tx {
      let _ = tx.send(());
    }
  }
}

/// Data directory for daemon logs and other on-disk state: `$XDG_DATA_HOME/amelia`
/// or `~/.local/share/amelia` if unset.
pub fn default_data_dir() -> PathBuf {
  dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("amelia")
}

/// Check if daemon is already running
pub fn is_running(socket_path: &std::path::Path) -> bool {
  std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Get the PID file path
pub fn pid_file_path() -> PathBuf {
  if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
    PathBuf::from(runtime_dir).join("amelia.pid")
  } else {
    let uid = std::process::id();
    PathBuf::from(format!("/tmp/amelia-{}.pid", uid))
  }
}

/// Write PID file
pub fn write_pid_file() -> Result<(), std::io::Error> {
  let pid_path = pid_file_path();
  std::fs::write(&pid_path, std::process::id().to_string())
}

/// Remove PID file
pub fn remove_pid_file() {
  let pid_path = pid_file_path();
  let _ = std::fs::remove_file(pid_path);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config() {
    let config = DaemonConfig::default();
    assert!(!config.socket_path.to_string_lossy().is_empty());
    assert_eq!(config.idle_timeout_secs, 1800);
  }

  #[test]
  fn test_is_running_no_socket() {
    let dir = tempfile::TempDir::new().unwrap();
    let socket_path = dir.path().join("nonexistent.sock");
    assert!(!is_running(&socket_path));
  }
}

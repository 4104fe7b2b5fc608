use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use amelia_daemon::{Client, Daemon, DaemonConfig, Request, default_data_dir, default_socket_path, is_running};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "amelia")]
#[command(about = "Local-first document retrieval: ingest, crawl, and search")]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Start the daemon in the foreground
  Daemon,
  /// Stop a running daemon
  Stop,
  /// Check whether the daemon is running
  Status,
  /// Ingest local files or directories
  Ingest {
    /// Files or directories to ingest
    paths: Vec<String>,
    /// Recurse into directories
    #[arg(short, long)]
    recursive: bool,
    /// Glob patterns to restrict ingestion to (repeatable)
    #[arg(long = "pattern")]
    file_patterns: Vec<String>,
    /// Target collection
    #[arg(short, long, default_value = "default")]
    collection: String,
    /// Forced transcription language for audio/video files (ISO 639-1)
    #[arg(long)]
    language: Option<String>,
  },
  /// Recursively crawl a website
  Crawl {
    url: String,
    #[arg(short, long, default_value = "default")]
    collection: String,
    #[arg(long, default_value = "3")]
    max_depth: i32,
    #[arg(long, default_value = "1000")]
    max_pages: i32,
    /// Fetch only the seed page, ignoring links it contains
    #[arg(long)]
    no_follow_links: bool,
    #[arg(long = "exclude")]
    exclude_patterns: Vec<String>,
    #[arg(long = "include")]
    include_patterns: Vec<String>,
    #[arg(long, default_value = "5")]
    batch_size: usize,
    /// Skip JavaScript rendering when fetching pages
    #[arg(long)]
    no_js: bool,
    /// Ignore robots.txt
    #[arg(long)]
    ignore_robots: bool,
  },
  /// Search a collection
  Search {
    query: String,
    #[arg(short = 'n', long, default_value = "5")]
    n_results: i64,
    #[arg(short, long, default_value = "default")]
    collection: String,
    /// auto, vector, hybrid, or contextual
    #[arg(long, default_value = "auto")]
    strategy: String,
    /// Restrict to this source type: local, web, or audio
    #[arg(long)]
    source_type: Option<String>,
    #[arg(long)]
    file_type: Option<String>,
    #[arg(long)]
    domain: Option<String>,
    #[arg(long)]
    language: Option<String>,
    /// Print the raw JSON response
    #[arg(long)]
    json: bool,
  },
  /// List or remove indexed sources
  #[command(subcommand)]
  Sources(SourcesCommand),
  /// Poll the status of a previously submitted job
  Job { job_id: String },
  /// Print collection statistics
  Stats {
    #[arg(short, long, default_value = "default")]
    collection: String,
  },
}

#[derive(Subcommand)]
enum SourcesCommand {
  /// List indexed sources
  List {
    #[arg(short, long, default_value = "default")]
    collection: String,
    /// all, local, web, or audio
    #[arg(long, default_value = "all")]
    source_type: String,
    #[arg(long, default_value = "100")]
    limit: i64,
  },
  /// Remove a source and its chunks
  Remove {
    #[arg(short, long, default_value = "default")]
    collection: String,
    #[arg(long)]
    source_path: Option<String>,
    #[arg(long)]
    source_url: Option<String>,
  },
}

#[allow(dead_code)]
fn log_file_path() -> std::path::PathBuf {
  default_data_dir().join("amelia.log")
}

/// Console-only logging for one-shot CLI commands.
fn init_cli_logging() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
    .init();
}

/// Console + daily rolling file logging for the long-running daemon process.
/// Returns the guard that must be kept alive for the duration of the program.
fn init_daemon_logging() -> Option<WorkerGuard> {
  let log_dir = default_data_dir();
  if std::fs::create_dir_all(&log_dir).is_err() {
    init_cli_logging();
    return None;
  }

  let file_appender = tracing_appender::rolling::daily(&log_dir, "amelia.log");
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
  let console_layer = tracing_subscriber::fmt::layer().with_target(true).with_ansi(true);
  let file_layer = tracing_subscriber::fmt::layer().with_target(true).with_ansi(false).with_writer(file_writer);

  tracing_subscriber::registry().with(env_filter).with(console_layer).with(file_layer).init();

  Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let _guard = match &cli.command {
    Commands::Daemon => init_daemon_logging(),
    _ => {
      init_cli_logging();
      None
    }
  };

  match cli.command {
    Commands::Daemon => cmd_daemon().await,
    Commands::Stop => cmd_stop().await,
    Commands::Status => cmd_status().await,
    Commands::Ingest {
      paths,
      recursive,
      file_patterns,
      collection,
      language,
    } => cmd_ingest(paths, recursive, file_patterns, &collection, language.as_deref()).await,
    Commands::Crawl {
      url,
      collection,
      max_depth,
      max_pages,
      no_follow_links,
      exclude_patterns,
      include_patterns,
      batch_size,
      no_js,
      ignore_robots,
    } => {
      cmd_crawl(
        &url,
        &collection,
        max_depth,
        max_pages,
        !no_follow_links,
        exclude_patterns,
        include_patterns,
        batch_size,
        !no_js,
        !ignore_robots,
      )
      .await
    }
    Commands::Search {
      query,
      n_results,
      collection,
      strategy,
      source_type,
      file_type,
      domain,
      language,
      json,
    } => {
      cmd_search(
        &query,
        n_results,
        &collection,
        &strategy,
        source_type.as_deref(),
        file_type.as_deref(),
        domain.as_deref(),
        language.as_deref(),
        json,
      )
      .await
    }
    Commands::Sources(SourcesCommand::List { collection, source_type, limit }) => {
      cmd_sources_list(&collection, &source_type, limit).await
    }
    Commands::Sources(SourcesCommand::Remove { collection, source_path, source_url }) => {
      cmd_sources_remove(&collection, source_path.as_deref(), source_url.as_deref()).await
    }
    Commands::Job { job_id } => cmd_job_status(&job_id).await,
    Commands::Stats { collection } => cmd_stats(&collection).await,
  }
}

async fn cmd_daemon() -> Result<()> {
  let cwd = std::env::current_dir().unwrap_or_else(|_| ".".into());
  let core = amelia_core::config::Config::load_for_project(&cwd).unwrap_or_default();
  let config = DaemonConfig { core, ..DaemonConfig::default() };
  let mut daemon = Daemon::new(config);

  info!("Starting Amelia daemon");
  daemon.run().await.context("Failed to run daemon")?;

  Ok(())
}

async fn cmd_stop() -> Result<()> {
  let socket_path = default_socket_path();
  if !is_running(&socket_path) {
    println!("Daemon is not running");
    return Ok(());
  }

  let mut client = Client::connect_to(&socket_path).await.context("Failed to connect to daemon")?;
  let request = Request { id: Some(serde_json::json!(1)), method: "shutdown".to_string(), params: serde_json::json!({}) };
  let response = client.request(request).await.context("Failed to send shutdown")?;
  if let Some(err) = response.error {
    error!("Shutdown error: {}", err.message);
    std::process::exit(1);
  }
  println!("Daemon shutting down");
  Ok(())
}

async fn cmd_status() -> Result<()> {
  let socket_path = default_socket_path();
  if !is_running(&socket_path) {
    println!("Daemon is not running");
    return Ok(());
  }

  let mut client = Client::connect_to(&socket_path).await.context("Failed to connect to daemon")?;
  let request = Request { id: Some(serde_json::json!(1)), method: "status".to_string(), params: serde_json::json!({}) };
  let response = client.request(request).await.context("Failed to query status")?;
  if let Some(result) = response.result {
    println!("{}", serde_json::to_string_pretty(&result)?);
  }
  Ok(())
}

async fn connected_client() -> Result<Client> {
  let socket_path = default_socket_path();
  if !is_running(&socket_path) {
    error!("Daemon is not running. Start it with: amelia daemon");
    std::process::exit(1);
  }
  Client::connect_to(&socket_path).await.context("Failed to connect to daemon")
}

fn print_result(response: amelia_daemon::Response) -> Result<()> {
  if let Some(err) = response.error {
    error!("{}", err.message);
    std::process::exit(1);
  }
  if let Some(result) = response.result {
    println!("{}", serde_json::to_string_pretty(&result)?);
  }
  Ok(())
}

async fn cmd_ingest(paths: Vec<String>, recursive: bool, file_patterns: Vec<String>, collection: &str, language: Option<&str>) -> Result<()> {
  if paths.is_empty() {
    anyhow::bail!("at least one path is required");
  }
  let mut client = connected_client().await?;
  let request = Request {
    id: Some(serde_json::json!(1)),
    method: "ingest_documents".to_string(),
    params: serde_json::json!({
        "paths": paths,
        "recursive": recursive,
        "file_patterns": file_patterns,
        "collection": collection,
        "transcription_language": language,
    }),
  };
  let response = client.request(request).await.context("Failed to submit ingest job")?;
  print_result(response)
}

#[allow(clippy::too_many_arguments)]
async fn cmd_crawl(
  url: &str,
  collection: &str,
  max_depth: i32,
  max_pages: i32,
  follow_links: bool,
  exclude_patterns: Vec<String>,
  include_patterns: Vec<String>,
  batch_size: usize,
  js_enabled: bool,
  respect_robots_txt: bool,
) -> Result<()> {
  let mut client = connected_client().await?;
  let request = Request {
    id: Some(serde_json::json!(1)),
    method: "crawl_website".to_string(),
    params: serde_json::json!({
        "url": url,
        "collection": collection,
        "max_depth": max_depth,
        "max_pages": max_pages,
        "follow_links": follow_links,
        "exclude_patterns": exclude_patterns,
        "include_patterns": include_patterns,
        "batch_size": batch_size,
        "js_enabled": js_enabled,
        "respect_robots_txt": respect_robots_txt,
    }),
  };
  let response = client.request(request).await.context("Failed to submit crawl job")?;
  print_result(response)
}

#[allow(clippy::too_many_arguments)]
async fn cmd_search(
  query: &str,
  n_results: i64,
  collection: &str,
  strategy: &str,
  source_type: Option<&str>,
  file_type: Option<&str>,
  domain: Option<&str>,
  language: Option<&str>,
  json_output: bool,
) -> Result<()> {
  let mut client = connected_client().await?;
  let request = Request {
    id: Some(serde_json::json!(1)),
    method: "search_documents".to_string(),
    params: serde_json::json!({
        "query": query,
        "n_results": n_results,
        "collection": collection,
        "strategy": strategy,
        "filters": {
            "source_type": source_type,
            "file_type": file_type,
            "domain": domain,
            "language": language,
        },
    }),
  };
  let response = client.request(request).await.context("Failed to search")?;

  if let Some(err) = response.error {
    error!("Search error: {}", err.message);
    std::process::exit(1);
  }

  let Some(result) = response.result else {
    return Ok(());
  };

  if json_output {
    println!("{}", serde_json::to_string_pretty(&result)?);
    return Ok(());
  }

  let strategy_used = result.get("strategy_used").and_then(|v| v.as_str()).unwrap_or("?");
  let hits = result.get("results").and_then(|v| v.as_array()).cloned().unwrap_or_default();

  if hits.is_empty() {
    println!("No results for: {} (strategy: {})", query, strategy_used);
    return Ok(());
  }

  println!("{} result(s), strategy: {}\n", hits.len(), strategy_used);
  for (i, hit) in hits.iter().enumerate() {
    let source = hit
      .get("source_path")
      .and_then(|v| v.as_str())
      .or_else(|| hit.get("source_url").and_then(|v| v.as_str()))
      .unwrap_or("?");
    let score = hit.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0);
    println!("{}. [{:.3}] {}", i + 1, score, source);
    if let Some(content) = hit.get("content").and_then(|v| v.as_str()) {
      let preview = if content.len() > 200 { format!("{}...", &content[..200]) } else { content.to_string() };
      println!("   {}", preview.replace('\n', "\n   "));
    }
    println!();
  }

  Ok(())
}

async fn cmd_sources_list(collection: &str, source_type: &str, limit: i64) -> Result<()> {
  let mut client = connected_client().await?;
  let request = Request {
    id: Some(serde_json::json!(1)),
    method: "list_sources".to_string(),
    params: serde_json::json!({ "collection": collection, "source_type": source_type, "limit": limit }),
  };
  let response = client.request(request).await.context("Failed to list sources")?;
  print_result(response)
}

async fn cmd_sources_remove(collection: &str, source_path: Option<&str>, source_url: Option<&str>) -> Result<()> {
  if source_path.is_none() && source_url.is_none() {
    anyhow::bail!("one of --source-path or --source-url is required");
  }
  let mut client = connected_client().await?;
  let request = Request {
    id: Some(serde_json::json!(1)),
    method: "remove_source".to_string(),
    params: serde_json::json!({ "collection": collection, "source_path": source_path, "source_url": source_url }),
  };
  let response = client.request(request).await.context("Failed to remove source")?;
  print_result(response)
}

async fn cmd_job_status(job_id: &str) -> Result<()> {
  let mut client = connected_client().await?;
  let request = Request { id: Some(serde_json::json!(1)), method: "job_status".to_string(), params: serde_json::json!({ "job_id": job_id }) };
  let response = client.request(request).await.context("Failed to query job status")?;
  print_result(response)
}

async fn cmd_stats(collection: &str) -> Result<()> {
  let mut client = connected_client().await?;
  let request = Request { id: Some(serde_json::json!(1)), method: "get_statistics".to_string(), params: serde_json::json!({ "collection": collection }) };
  let response = client.request(request).await.context("Failed to fetch statistics")?;
  print_result(response)
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn cli_command_tree_is_valid() {
    Cli::command().debug_assert();
  }

  #[test]
  fn ingest_parses_repeated_patterns_and_recursive_flag() {
    let cli = Cli::parse_from(["amelia", "ingest", "a.pdf", "b/", "-r", "--pattern", "*.md", "--pattern", "*.txt", "-c", "docs"]);
    let Commands::Ingest { paths, recursive, file_patterns, collection, language } = cli.command else {
      panic!("expected Ingest");
    };
    assert_eq!(paths, vec!["a.pdf", "b/"]);
    assert!(recursive);
    assert_eq!(file_patterns, vec!["*.md", "*.txt"]);
    assert_eq!(collection, "docs");
    assert_eq!(language, None);
  }

  #[test]
  fn search_defaults_match_the_tool_contract() {
    let cli = Cli::parse_from(["amelia", "search", "how do I configure crawling"]);
    let Commands::Search { n_results, collection, strategy, json, .. } = cli.command else {
      panic!("expected Search");
    };
    assert_eq!(n_results, 5);
    assert_eq!(collection, "default");
    assert_eq!(strategy, "auto");
    assert!(!json);
  }

  #[test]
  fn crawl_defaults_match_the_tool_contract() {
    let cli = Cli::parse_from(["amelia", "crawl", "https://example.com"]);
    let Commands::Crawl { max_depth, max_pages, no_follow_links, batch_size, no_js, ignore_robots, .. } = cli.command else {
      panic!("expected Crawl");
    };
    assert_eq!(max_depth, 3);
    assert_eq!(max_pages, 1000);
    assert_eq!(batch_size, 5);
    assert!(!no_follow_links);
    assert!(!no_js);
    assert!(!ignore_robots);
  }
}

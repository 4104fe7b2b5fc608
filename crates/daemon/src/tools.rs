use std::sync::Arc;

use amelia_core::{Collection, DEFAULT_COLLECTION, Job, JobType, SourceType};
use amelia_coordinator::{CrawlRequest, IngestRequest, JobControl};
use amelia_db::Store;
use amelia_search::{Filters, SearchEngine, Strategy};
use serde::Deserialize;
use tracing::warn;

use crate::router::{Request, Response};

/// Handler for the six tools exposed by the daemon's JSON-RPC surface.
/// Long-running tools (`ingest_documents`, `crawl_website`) enqueue a job
/// with the coordinator and return immediately; `search_documents`,
/// `list_sources`, `remove_source` and `get_statistics` read the store
/// directly and answer synchronously.
pub struct ToolHandler {
  jobs: JobControl,
  search: Arc<SearchEngine>,
  store: Store,
}

impl ToolHandler {
  pub fn new(jobs: JobControl, search: Arc<SearchEngine>, store: Store) -> Self {
    Self { jobs, search, store }
  }
}

fn parse_collection(request_id: &Option<serde_json::Value>, raw: &str) -> Result<Collection, Response> {
  Collection::new(raw).map_err(|e| Response::error(request_id.clone(), -32602, &format!("invalid collection: {e}")))
}

impl ToolHandler {
  pub async fn ingest_documents(&self, request: Request) -> Response {
    let args: IngestRequest = match serde_json::from_value(request.params.clone()) {
      Ok(a) => a,
      Err(e) => return Response::error(request.id, -32602, &format!("invalid params: {e}")),
    };

    if args.paths.is_empty() {
      return Response::error(request.id, -32602, "paths must not be empty");
    }

    let collection = match parse_collection(&request.id, &args.collection) {
      Ok(c) => c,
      Err(r) => return r,
    };

    let discovered = match amelia_ingest::discover(&args.paths, args.recursive, &args.file_patterns) {
      Ok(files) => files,
      Err(e) => return Response::error(request.id, -32602, &format!("invalid path: {e}")),
    };

    let metadata = match serde_json::to_value(&args) {
      Ok(v) => v,
      Err(e) => return Response::error(request.id, -32000, &format!("failed to encode job: {e}")),
    };

    let job = Job::new(JobType::Ingest, collection, metadata);
    match self.jobs.submit(job).await {
      Ok(job_id) => Response::success(
        request.id,
        serde_json::json!({ "job_id": job_id.to_string(), "accepted_count": discovered.len() }),
      ),
      Err(e) => Response::error(request.id, -32000, &format!("failed to submit job: {e}")),
    }
  }

  pub async fn crawl_website(&self, request: Request) -> Response {
    let args: CrawlRequest = match serde_json::from_value(request.params.clone()) {
      Ok(a) => a,
      Err(e) => return Response::error(request.id, -32602, &format!("invalid params: {e}")),
    };

    if url::Url::parse(&args.url).is_err() {
      return Response::error(request.id, -32602, "malformed URL");
    }

    let collection = match parse_collection(&request.id, &args.collection) {
      Ok(c) => c,
      Err(r) => return r,
    };

    let metadata = match serde_json::to_value(&args) {
      Ok(v) => v,
      Err(e) => return Response::error(request.id, -32000, &format!("failed to encode job: {e}")),
    };

    let job = Job::new(JobType::Crawl, collection, metadata);
    match self.jobs.submit(job).await {
      Ok(job_id) => Response::success(request.id, serde_json::json!({ "job_id": job_id.to_string() })),
      Err(e) => Response::error(request.id, -32000, &format!("failed to submit job: {e}")),
    }
  }

  pub async fn search_documents(&self, request: Request) -> Response {
    #[derive(Deserialize)]
    struct Args {
      query: String,
      #[serde(default = "default_n_results")]
      n_results: i64,
      collection: String,
      #[serde(default)]
      strategy: Strategy,
      #[serde(default)]
      filters: Filters,
    }
    fn default_n_results() -> i64 {
      5
    }

    let args: Args = match serde_json::from_value(request.params.clone()) {
      Ok(a) => a,
      Err(e) => return Response::error(request.id, -32602, &format!("invalid params: {e}")),
    };

    if args.query.trim().is_empty() {
      return Response::error(request.id, -32602, "empty query");
    }

    let collection = match parse_collection(&request.id, &args.collection) {
      Ok(c) => c,
      Err(r) => return r,
    };

    match self.search.search(&args.query, args.n_results, &collection, args.strategy, &args.filters).await {
      Ok((hits, strategy_used)) => Response::success(
        request.id,
        serde_json::json!({ "results": hits, "strategy_used": strategy_used }),
      ),
      Err(e) => {
        warn!(error = %e, "search_documents failed");
        Response::error(request.id, -32000, &e.to_string())
      }
    }
  }

  pub async fn list_sources(&self, request: Request) -> Response {
    #[derive(Deserialize)]
    struct Args {
      collection: String,
      #[serde(default)]
      source_type: Option<String>,
      #[serde(default = "default_limit")]
      limit: i64,
    }
    fn default_limit() -> i64 {
      100
    }

    let args: Args = match serde_json::from_value(request.params.clone()) {
      Ok(a) => a,
      Err(e) => return Response::error(request.id, -32602, &format!("invalid params: {e}")),
    };

    let collection = match parse_collection(&request.id, &args.collection) {
      Ok(c) => c,
      Err(r) => return r,
    };

    let source_type = match args.source_type.as_deref() {
      None | Some("all") => None,
      Some(other) => match other.parse::<SourceType>() {
        Ok(t) => Some(t),
        Err(e) => return Response::error(request.id, -32602, &format!("invalid source_type: {e}")),
      },
    };

    match amelia_db::documents::list(&self.store, &collection, source_type, args.limit).await {
      Ok(docs) => Response::success(request.id, serde_json::json!(docs)),
      Err(e) => Response::error(request.id, -32000, &e.to_string()),
    }
  }

  pub async fn remove_source(&self, request: Request) -> Response {
    #[derive(Deserialize)]
    struct Args {
      #[serde(default)]
      source_path: Option<String>,
      #[serde(default)]
      source_url: Option<String>,
      collection: String,
    }

    let args: Args = match serde_json::from_value(request.params.clone()) {
      Ok(a) => a,
      Err(e) => return Response::error(request.id, -32602, &format!("invalid params: {e}")),
    };

    if args.source_path.is_none() && args.source_url.is_none() {
      return Response::error(request.id, -32602, "one of source_path or source_url is required");
    }

    let collection = match parse_collection(&request.id, &args.collection) {
      Ok(c) => c,
      Err(r) => return r,
    };

    match amelia_db::documents::remove_by_source(&self.store, &collection, args.source_path.as_deref(), args.source_url.as_deref()).await {
      Ok(removed_count) if removed_count == 0 => Response::error(request.id, -32000, "not found"),
      Ok(removed_count) => Response::success(request.id, serde_json::json!({ "removed_count": removed_count })),
      Err(e) => Response::error(request.id, -32000, &e.to_string()),
    }
  }

  /// Polls the status of a job previously returned by `ingest_documents` or
  /// `crawl_website`. Not part of the six-tool table; exposed so callers can
  /// follow up on a `job_id` without reaching into the store directly.
  pub async fn job_status(&self, request: Request) -> Response {
    #[derive(Deserialize)]
    struct Args {
      job_id: String,
    }

    let args: Args = match serde_json::from_value(request.params.clone()) {
      Ok(a) => a,
      Err(e) => return Response::error(request.id, -32602, &format!("invalid params: {e}")),
    };

    let job_id = match args.job_id.parse() {
      Ok(id) => id,
      Err(e) => return Response::error(request.id, -32602, &format!("invalid job_id: {e}")),
    };

    match self.jobs.status(job_id).await {
      Ok(job) => Response::success(request.id, serde_json::json!(job)),
      Err(e) => Response::error(request.id, -32000, &e.to_string()),
    }
  }

  pub async fn get_statistics(&self, request: Request) -> Response {
    #[derive(Deserialize)]
    struct Args {
      #[serde(default = "default_collection")]
      collection: String,
    }
    fn default_collection() -> String {
      DEFAULT_COLLECTION.to_string()
    }

    let args: Args = match serde_json::from_value(request.params.clone()) {
      Ok(a) => a,
      Err(e) => return Response::error(request.id, -32602, &format!("invalid params: {e}")),
    };

    let collection = match parse_collection(&request.id, &args.collection) {
      Ok(c) => c,
      Err(r) => return r,
    };

    match amelia_db::stats::get_statistics(&self.store, &collection).await {
      Ok(stats) => Response::success(request.id, serde_json::json!(stats)),
      Err(e) => Response::error(request.id, -32000, &e.to_string()),
    }
  }
}

use crate::server::ShutdownHandle;
use crate::tools::ToolHandler;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// JSON-RPC style request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
  #[serde(default)]
  pub id: Option<serde_json::Value>,
  pub method: String,
  #[serde(default)]
  pub params: serde_json::Value,
}

/// JSON-RPC style response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
  pub code: i32,
  pub message: String,
}

impl Response {
  pub fn success(id: Option<serde_json::Value>, result: serde_json::Value) -> Self {
    Self {
      id,
      result: Some(result),
      error: None,
    }
  }

  pub fn error(id: Option<serde_json::Value>, code: i32, message: &str) -> Self {
    Self {
      id,
      result: None,
      error: Some(RpcError {
        code,
        message: message.to_string(),
      }),
    }
  }
}

/// Request router for the daemon
pub struct Router {
  tool_handler: Arc<ToolHandler>,
  shutdown_handle: Arc<Mutex<Option<ShutdownHandle>>>,
}

impl Router {
  pub fn new(tool_handler: Arc<ToolHandler>) -> Self {
    Self {
      tool_handler,
      shutdown_handle: Arc::new(Mutex::new(None)),
    }
  }

  /// Set the shutdown handle (called after server is created)
  pub async fn set_shutdown_handle(&self, handle: ShutdownHandle) {
    let mut guard = self.shutdown_handle.lock().await;
    *guard = Some(handle);
  }

  /// Handle an incoming request
  pub async fn handle(&self, request: Request) -> Response {
    debug!("Handling request: {}", request.method);

    match request.method.as_str() {
      "ping" => Response::success(request.id, serde_json::json!("pong")),
      "status" => self.handle_status(request).await,
      "shutdown" => self.handle_shutdown(request).await,

      "ingest_documents" => self.tool_handler.ingest_documents(request).await,
      "crawl_website" => self.tool_handler.crawl_website(request).await,
      "search_documents" => self.tool_handler.search_documents(request).await,
      "list_sources" => self.tool_handler.list_sources(request).await,
      "remove_source" => self.tool_handler.remove_source(request).await,
      "get_statistics" => self.tool_handler.get_statistics(request).await,
      "job_status" => self.tool_handler.job_status(request).await,

      _ => {
        warn!("Unknown method: {}", request.method);
        Response::error(request.id, -32601, &format!("Method not found: {}", request.method))
      }
    }
  }

  async fn handle_status(&self, request: Request) -> Response {
    let status = serde_json::json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    });
    Response::success(request.id, status)
  }

  async fn handle_shutdown(&self, request: Request) -> Response {
    info!("Shutdown requested via RPC");
    let guard = self.shutdown_handle.lock().await;
    if let Some(ref handle) = *guard {
      handle.shutdown();
      Response::success(request.id, serde_json::json!({"status": "shutting_down"}))
    } else {
      Response::error(request.id, -32000, "Shutdown handle not available")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_response_success() {
    let response = Response::success(Some(serde_json::json!(1)), serde_json::json!("test"));
    assert!(response.result.is_some());
    assert!(response.error.is_none());
  }

  #[test]
  fn test_response_error() {
    let response = Response::error(Some(serde_json::json!(1)), -1, "test error");
    assert!(response.result.is_none());
    assert!(response.error.is_some());
    assert_eq!(response.error.as_ref().unwrap().code, -1);
  }
}

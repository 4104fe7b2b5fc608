use crate::provider::{Device, validate_dimensions};
use crate::{EmbeddingError, EmbeddingProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "http://localhost:8088";
const DEFAULT_MODEL: &str = "amelia-embed-1024";
const DEFAULT_BATCH_SIZE: usize = 32;

/// Talks to a local or self-hosted embedding server over HTTP. One POST per
/// batch: `{model, device, input: [text...]}` -> `{embeddings: [[f32; 1024]]}`.
/// Requests larger than `batch_size` are chunked client-side.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
  client: reqwest::Client,
  base_url: String,
  model: String,
  device: Device,
  batch_size: usize,
}

impl HttpEmbeddingProvider {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: DEFAULT_BASE_URL.to_string(),
      model: DEFAULT_MODEL.to_string(),
      device: Device::Cpu,
      batch_size: DEFAULT_BATCH_SIZE,
    }
  }

  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.base_url = url.into();
    self
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  pub fn with_device(mut self, device: Device) -> Self {
    self.device = device;
    self
  }

  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size.max(1);
    self
  }

  fn embeddings_url(&self) -> String {
    format!("{}/embed", self.base_url)
  }

  fn health_url(&self) -> String {
    format!("{}/health", self.base_url)
  }

  async fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let request = EmbeddingRequest {
      model: &self.model,
      device: self.device,
      input: texts,
    };

    debug!("embedding {} texts ({:?})", texts.len(), self.device);

    let response = self.client.post(self.embeddings_url()).json(&request).send().await?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      warn!("embedding request failed: {} - {}", status, body);
      return Err(EmbeddingError::ProviderError(format!("provider returned {status}: {body}")));
    }

    let result: EmbeddingResponse = response.json().await?;
    validate_dimensions(&result.embeddings)?;
    Ok(result.embeddings)
  }
}

impl Default for HttpEmbeddingProvider {
  fn default() -> Self {
    Self::new()
  }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  device: Device,
  input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
  fn name(&self) -> &str {
    "http"
  }

  fn model_id(&self) -> &str {
    &self.model
  }

  async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let mut vectors = self.embed_chunk(&[text]).await?;
    vectors.pop().ok_or_else(|| EmbeddingError::ProviderError("empty response".to_string()))
  }

  async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if texts.is_empty() {
      return Ok(Vec::new());
    }

    let mut out = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(self.batch_size) {
      out.extend(self.embed_chunk(chunk).await?);
    }
    Ok(out)
  }

  async fn is_available(&self) -> bool {
    matches!(self.client.get(self.health_url()).send().await, Ok(resp) if resp.status().is_success())
  }
}

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CrawlError;

#[derive(Debug, Clone)]
pub struct FetchOptions {
  pub js_enabled: bool,
  pub timeout: Duration,
  pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
  pub status_code: u16,
  pub html: String,
  pub final_url: String,
}

/// External crawling collaborator: HTTP (or JS-rendering) fetch plus HTML
/// content/link extraction. Left abstract so a headless-browser backend can
/// be substituted for `js_enabled` fetches without touching the pipeline.
#[async_trait]
pub trait Fetcher: Send + Sync {
  async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<FetchResponse, CrawlError>;
  fn extract_main_content(&self, html: &str) -> String;
  fn extract_links(&self, html: &str, base_url: &str) -> Vec<String>;
}

/// Plain `reqwest`-backed fetcher. Does not perform JS rendering; a
/// browser-automation-backed `Fetcher` is expected to be substituted when
/// `js_enabled` crawls are required.
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl Default for HttpFetcher {
  fn default() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

#[async_trait]
impl Fetcher for HttpFetcher {
  async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<FetchResponse, CrawlError> {
    let response = self
      .client
      .get(url)
      .header("User-Agent", &opts.user_agent)
      .timeout(opts.timeout)
      .send()
      .await
      .map_err(|e| CrawlError::Fetch(e.to_string()))?;

    let status_code = response.status().as_u16();
    let final_url = response.url().to_string();
    let html = response.text().await.map_err(|e| CrawlError::Fetch(e.to_string()))?;

    Ok(FetchResponse {
      status_code,
      html,
      final_url,
    })
  }

  fn extract_main_content(&self, html: &str) -> String {
    strip_tags(html)
  }

  fn extract_links(&self, html: &str, base_url: &str) -> Vec<String> {
    extract_hrefs(html)
      .into_iter()
      .filter_map(|href| url::Url::parse(base_url).ok()?.join(&href).ok())
      .map(|u| u.to_string())
      .collect()
  }
}

/// Strips tags and collapses whitespace. A fuller implementation would use
/// a proper readability/boilerplate-removal pass; this keeps the pipeline
/// self-contained against the `Fetcher` interface the spec describes.
fn strip_tags(html: &str) -> String {
  let mut out = String::with_capacity(html.len());
  let mut in_tag = false;
  let mut in_script_or_style = false;
  let lower = html.to_lowercase();
  let bytes = html.as_bytes();
  let mut i = 0;
  while i < bytes.len() {
    if lower[i..].starts_with("<script") || lower[i..].starts_with("<style") {
      in_script_or_style = true;
    }
    if lower[i..].starts_with("</script>") || lower[i..].starts_with("</style>") {
      in_script_or_style = false;
    }
    match bytes[i] {
      b'<' => in_tag = true,
      b'>' => in_tag = false,
      _ if !in_tag && !in_script_or_style => out.push(bytes[i] as char),
      _ => {}
    }
    i += 1;
  }
  out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_hrefs(html: &str) -> Vec<String> {
  let mut hrefs = Vec::new();
  let lower = html.to_lowercase();
  let mut search_from = 0;
  while let Some(pos) = lower[search_from..].find("href=") {
    let start = search_from + pos + "href=".len();
    if start >= html.len() {
      break;
    }
    let quote = html.as_bytes()[start];
    if quote == b'"' || quote == b'\'' {
      if let Some(end) = html[start + 1..].find(quote as char) {
        hrefs.push(html[start + 1..start + 1 + end].to_string());
        search_from = start + 1 + end;
        continue;
      }
    }
    search_from = start;
  }
  hrefs
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strip_tags_removes_markup_and_scripts() {
    let html = "<html><head><script>var x = 1;</script></head><body><p>Hello <b>world</b></p></body></html>";
    assert_eq!(strip_tags(html), "Hello world");
  }

  #[test]
  fn extract_hrefs_finds_all_links() {
    let html = r#"<a href="/a">A</a><a href='https://x.test/b'>B</a>"#;
    assert_eq!(extract_hrefs(html), vec!["/a".to_string(), "https://x.test/b".to_string()]);
  }
}

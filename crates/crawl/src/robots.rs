use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use url::Url;

use crate::fetcher::{FetchOptions, Fetcher};

/// Fetched once per host and cached for the job's lifetime.
pub struct RobotsCache {
  fetcher: Arc<dyn Fetcher>,
  user_agent: String,
  rules: Mutex<HashMap<String, Vec<String>>>,
}

impl RobotsCache {
  pub fn new(fetcher: Arc<dyn Fetcher>, user_agent: String) -> Self {
    Self {
      fetcher,
      user_agent,
      rules: Mutex::new(HashMap::new()),
    }
  }

  /// True if `url` is disallowed by the matching host's robots.txt.
  pub async fn is_disallowed(&self, url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
      return false;
    };
    let Some(host) = parsed.host_str() else {
      return false;
    };
    let host = host.to_string();

    let disallows = {
      let cached = self.rules.lock().await.get(&host).cloned();
      match cached {
        Some(rules) => rules,
        None => {
          let fetched = self.fetch_rules(&parsed).await;
          self.rules.lock().await.insert(host.clone(), fetched.clone());
          fetched
        }
      }
    };

    let path = parsed.path();
    disallows.iter().any(|prefix| !prefix.is_empty() && path.starts_with(prefix.as_str()))
  }

  async fn fetch_rules(&self, url: &Url) -> Vec<String> {
    let robots_url = format!("{}://{}/robots.txt", url.scheme(), url.host_str().unwrap_or_default());
    let opts = FetchOptions {
      js_enabled: false,
      timeout: Duration::from_secs(10),
      user_agent: self.user_agent.clone(),
    };
    match self.fetcher.fetch(&robots_url, &opts).await {
      Ok(response) if response.status_code < 400 => parse_disallow_rules(&response.html, &self.user_agent),
      _ => Vec::new(),
    }
  }
}

/// Minimal robots.txt parser: collects `Disallow:` prefixes under a
/// matching `User-agent:` block (exact match or `*`).
fn parse_disallow_rules(body: &str, user_agent: &str) -> Vec<String> {
  let mut rules = Vec::new();
  let mut applies = false;
  let user_agent = user_agent.to_lowercase();

  for line in body.lines() {
    let line = line.split('#').next().unwrap_or("").trim();
    if line.is_empty() {
      continue;
    }
    let Some((key, value)) = line.split_once(':') else {
      continue;
    };
    let key = key.trim().to_lowercase();
    let value = value.trim();

    match key.as_str() {
      "user-agent" => {
        applies = value == "*" || user_agent.contains(&value.to_lowercase());
      }
      "disallow" if applies => {
        rules.push(value.to_string());
      }
      _ => {}
    }
  }

  rules
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_wildcard_disallow_rules() {
    let body = "User-agent: *\nDisallow: /admin\nDisallow: /private\n";
    let rules = parse_disallow_rules(body, "amelia-crawler/0.1");
    assert_eq!(rules, vec!["/admin".to_string(), "/private".to_string()]);
  }

  #[test]
  fn ignores_rules_for_other_agents() {
    let body = "User-agent: othercrawler\nDisallow: /secret\n";
    let rules = parse_disallow_rules(body, "amelia-crawler/0.1");
    assert!(rules.is_empty());
  }

  #[test]
  fn handles_comments_and_blank_lines() {
    let body = "# comment\n\nUser-agent: *\n# another comment\nDisallow: /x\n";
    let rules = parse_disallow_rules(body, "amelia-crawler/0.1");
    assert_eq!(rules, vec!["/x".to_string()]);
  }
}

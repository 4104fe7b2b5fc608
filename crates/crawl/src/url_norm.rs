use url::Url;

/// Normalizes a URL per the crawl pipeline's dedup rules: lowercase scheme
/// and host, drop the fragment, strip a trailing `/` from the path (except
/// root), sort query parameters by key.
pub fn normalize(raw: &str) -> Result<String, url::ParseError> {
  let mut url = Url::parse(raw)?;

  let _ = url.set_scheme(&url.scheme().to_lowercase());
  if let Some(host) = url.host_str() {
    let lowered = host.to_lowercase();
    let _ = url.set_host(Some(&lowered));
  }
  url.set_fragment(None);

  let path = url.path().to_string();
  if path.len() > 1 && path.ends_with('/') {
    url.set_path(path.trim_end_matches('/'));
  }

  let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
  pairs.sort_by(|a, b| a.0.cmp(&b.0));
  if pairs.is_empty() {
    url.set_query(None);
  } else {
    url.query_pairs_mut().clear().extend_pairs(&pairs);
  }

  Ok(url.to_string())
}

/// Registrable host used for rate limiting, robots caching, and
/// same-domain link filtering. Falls back to the full host when no simple
/// `sub.domain.tld` split applies.
pub fn registrable_domain(raw: &str) -> Option<String> {
  let url = Url::parse(raw).ok()?;
  url.host_str().map(|h| h.to_lowercase())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lowercases_scheme_and_host() {
    assert_eq!(normalize("HTTPS://Example.COM/path").unwrap(), "https://example.com/path");
  }

  #[test]
  fn drops_fragment() {
    assert_eq!(normalize("https://example.com/path#section").unwrap(), "https://example.com/path");
  }

  #[test]
  fn strips_trailing_slash_except_root() {
    assert_eq!(normalize("https://example.com/path/").unwrap(), "https://example.com/path");
    assert_eq!(normalize("https://example.com/").unwrap(), "https://example.com/");
  }

  #[test]
  fn sorts_query_parameters() {
    assert_eq!(
      normalize("https://example.com/path?b=2&a=1").unwrap(),
      "https://example.com/path?a=1&b=2"
    );
  }

  #[test]
  fn registrable_domain_is_lowercased() {
    assert_eq!(registrable_domain("https://Example.COM/x").unwrap(), "example.com");
  }
}

/// Classification of a crawl seed URL before recursion begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
  Sitemap,
  LlmsTxt,
  Page,
}

pub fn classify(url: &str) -> SeedKind {
  let lower = url.to_lowercase();
  if lower.ends_with("llms.txt") {
    SeedKind::LlmsTxt
  } else if lower.ends_with("sitemap.xml") || lower.contains("sitemap_index") {
    SeedKind::Sitemap
  } else {
    SeedKind::Page
  }
}

/// Extracts `<loc>...</loc>` entries from a sitemap XML body.
pub fn expand_sitemap(xml: &str) -> Vec<String> {
  let mut urls = Vec::new();
  let mut rest = xml;
  while let Some(start) = rest.find("<loc>") {
    let after = &rest[start + "<loc>".len()..];
    let Some(end) = after.find("</loc>") else { break };
    urls.push(after[..end].trim().to_string());
    rest = &after[end + "</loc>".len()..];
  }
  urls
}

/// `llms.txt` is a flat markdown link list; extract `[title](url)` targets.
pub fn expand_llms_txt(text: &str) -> Vec<String> {
  let mut urls = Vec::new();
  for line in text.lines() {
    let Some(paren_start) = line.find('(') else { continue };
    let Some(paren_end) = line[paren_start..].find(')') else { continue };
    let candidate = &line[paren_start + 1..paren_start + paren_end];
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
      urls.push(candidate.to_string());
    }
  }
  urls
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifies_sitemap_and_llms_and_page() {
    assert_eq!(classify("https://x.test/sitemap.xml"), SeedKind::Sitemap);
    assert_eq!(classify("https://x.test/llms.txt"), SeedKind::LlmsTxt);
    assert_eq!(classify("https://x.test/docs"), SeedKind::Page);
  }

  #[test]
  fn expand_sitemap_extracts_locs() {
    let xml = "<urlset><url><loc>https://x.test/a</loc></url><url><loc>https://x.test/b</loc></url></urlset>";
    assert_eq!(expand_sitemap(xml), vec!["https://x.test/a".to_string(), "https://x.test/b".to_string()]);
  }

  #[test]
  fn expand_llms_txt_extracts_markdown_links() {
    let text = "# Docs\n\n- [Getting Started](https://x.test/start)\n- [API](https://x.test/api)\n";
    assert_eq!(
      expand_llms_txt(text),
      vec!["https://x.test/start".to_string(), "https://x.test/api".to_string()]
    );
  }
}

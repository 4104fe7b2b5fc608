use regex::Regex;
use std::sync::LazyLock;

use crate::types::Strategy;

static ACRONYM_OR_MIXED_CASE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[A-Z]{2,}|\b[a-z]+[A-Z][A-Za-z]*\b").expect("valid regex"));
static QUOTED_PHRASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]+""#).expect("valid regex"));

/// Resolves `strategy="auto"` per the documented heuristic:
/// - acronym/mixed-case tokens or a quoted phrase → hybrid (BM25 enabled)
/// - query length ≥ 12 words → hybrid
/// - otherwise vector
///
/// Reranking is layered on afterward by the caller when configured and
/// `k <= 20`; it is not part of this resolution.
pub fn resolve_auto(query: &str) -> Strategy {
  if ACRONYM_OR_MIXED_CASE.is_match(query) || QUOTED_PHRASE.is_match(query) {
    return Strategy::Hybrid;
  }
  if query.split_whitespace().count() >= 12 {
    return Strategy::Hybrid;
  }
  Strategy::Vector
}

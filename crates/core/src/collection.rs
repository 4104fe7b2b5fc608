use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Name of a logical grouping of documents. Collections partition the document
/// store the way a project partitions a repository: search and ingestion
/// operations are scoped to one collection at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collection(String);

impl Collection {
  pub const MAX_LEN: usize = 200;

  pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
    let name = name.into();
    if name.is_empty() {
      return Err(ValidationError::missing("collection"));
    }
    if name.len() > Self::MAX_LEN {
      return Err(ValidationError::too_long("collection", Self::MAX_LEN));
    }
    if !name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
    {
      return Err(ValidationError::invalid_type("collection", "[a-zA-Z0-9-_./]+"));
    }
    Ok(Self(name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for Collection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl std::str::FromStr for Collection {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::new(s)
  }
}

pub const DEFAULT_COLLECTION: &str = "default";

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_empty_and_oversized_names() {
    assert!(Collection::new("").is_err());
    assert!(Collection::new("a".repeat(Collection::MAX_LEN + 1)).is_err());
  }

  #[test]
  fn rejects_disallowed_characters() {
    assert!(Collection::new("docs space").is_err());
  }

  #[test]
  fn accepts_paths_and_dashes() {
    assert!(Collection::new("team-docs/runbooks.v2").is_ok());
  }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
  ($name:ident) => {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct $name(Uuid);

    impl $name {
      pub fn new() -> Self {
        Self(Uuid::now_v7())
      }

      pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
      }

      pub fn as_uuid(&self) -> Uuid {
        self.0
      }
    }

    impl Default for $name {
      fn default() -> Self {
        Self::new()
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
      }
    }

    impl std::str::FromStr for $name {
      type Err = uuid::Error;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
      }
    }
  };
}

uuid_id!(DocumentId);
uuid_id!(ChunkId);
uuid_id!(EmbeddingId);
uuid_id!(JobId);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roundtrips_through_display_and_parse() {
    let id = DocumentId::new();
    let parsed: DocumentId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
  }

  #[test]
  fn ids_are_time_ordered() {
    let a = JobId::new();
    let b = JobId::new();
    assert!(a.as_uuid().get_version_num() == 7);
    assert_ne!(a, b);
  }
}

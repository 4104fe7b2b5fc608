use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum Error {
  #[error("not found: {entity} {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("validation: {0}")]
  Validation(String),

  #[error("configuration: {0}")]
  Configuration(String),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<ValidationError> for Error {
  fn from(e: ValidationError) -> Self {
    Error::Validation(e.to_string())
  }
}

/// The error taxonomy every crate's error type classifies into, so the
/// coordinator can decide retry-vs-terminal without knowing the concrete
/// error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// Network timeout, 5xx, model-load timeout: retryable via the
  /// coordinator's backoff.
  TransientExternal,
  /// Unknown/unreadable file, malformed URL, corrupt audio: non-retryable,
  /// recorded and skipped.
  PermanentInput,
  /// Unrecognized language config, embedding dimension mismatch, missing
  /// collaborator: fatal to the affected job.
  ConfigurationError,
  /// Constraint violation, deadlock: retried a small bounded count before
  /// escalating to `TransientExternal` handling.
  StoreError,
  /// Not an error; clean teardown.
  Cancellation,
}

impl FailureKind {
  pub fn is_retryable(&self) -> bool {
    matches!(self, FailureKind::TransientExternal | FailureKind::StoreError)
  }
}

pub trait Classify {
  fn kind(&self) -> FailureKind;
}

impl Classify for Error {
  fn kind(&self) -> FailureKind {
    match self {
      Error::NotFound { .. } => FailureKind::PermanentInput,
      Error::Validation(_) => FailureKind::PermanentInput,
      Error::Configuration(_) => FailureKind::ConfigurationError,
      Error::Io(_) => FailureKind::TransientExternal,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn configuration_errors_are_not_retryable() {
    assert!(!FailureKind::ConfigurationError.is_retryable());
    assert!(FailureKind::TransientExternal.is_retryable());
  }

  #[test]
  fn not_found_classifies_as_permanent_input() {
    let err = Error::NotFound {
      entity: "document",
      id: "abc".into(),
    };
    assert_eq!(err.kind(), FailureKind::PermanentInput);
  }
}

pub mod http;
pub mod mock;
pub mod provider;
pub mod resilient;

pub use http::HttpEmbeddingProvider;
pub use mock::MockEmbeddingProvider;
pub use provider::{Device, EmbeddingError, EmbeddingProvider, validate_dimensions};
pub use resilient::{ResilientProvider, RetryConfig, is_retryable_error, wrap_resilient, wrap_resilient_arc};

pub mod engine;
pub mod error;
pub mod rerank;
pub mod rrf;
pub mod strategy;
pub mod types;

pub use engine::{SearchConfig, SearchEngine};
pub use error::SearchError;
pub use rerank::CrossEncoder;
pub use strategy::resolve_auto;
pub use types::{Filters, Hit, Strategy};

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod requests;

pub use dispatch::{Coordinator, JobControl};
pub use error::CoordinatorError;
pub use handlers::Collaborators;
pub use requests::{CrawlRequest, IngestRequest};

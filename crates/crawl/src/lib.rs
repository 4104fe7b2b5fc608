pub mod error;
pub mod fetcher;
pub mod pipeline;
pub mod rate_limit;
pub mod robots;
pub mod seed;
pub mod url_norm;

pub use error::CrawlError;
pub use fetcher::{FetchOptions, FetchResponse, Fetcher, HttpFetcher};
pub use pipeline::{CrawlJobConfig, run};
pub use rate_limit::{HostRateLimiter, RateLimitConfig};
pub use robots::RobotsCache;
pub use seed::{SeedKind, classify, expand_llms_txt, expand_sitemap};
pub use url_norm::{normalize, registrable_domain};

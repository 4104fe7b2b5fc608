//! Stable structured-logging field names, shared across crates so log
//! aggregation can filter consistently regardless of which subsystem emitted
//! the event.

pub const JOB_ID: &str = "job_id";
pub const JOB_TYPE: &str = "job_type";
pub const COLLECTION: &str = "collection";
pub const DURATION_MS: &str = "duration_ms";
pub const COMPONENT: &str = "component";
pub const OP: &str = "op";

pub const DOCUMENT_ID: &str = "document_id";
pub const CHUNK_COUNT: &str = "chunk_count";
pub const URL: &str = "url";
pub const DOMAIN: &str = "domain";
pub const RETRY_COUNT: &str = "retry_count";

pub const RRF_K: &str = "rrf_k";
pub const FUSION_METHOD: &str = "fusion_method";
pub const FTS_WEIGHT: &str = "fts_weight";
pub const SEMANTIC_WEIGHT: &str = "semantic_weight";

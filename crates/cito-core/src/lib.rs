//! Citation set resolution
//!
//! This crate ties the identifier and CSL layers together:
//! - [`Citations`]: the per-document citation pipeline
//! - [`RetrieverRegistry`]: routing of standard ids to metadata sources
//! - Per-source rate limiting
//! - Error tallying for soft-fail runs

pub mod citations;
pub mod rate_limit;
pub mod reporting;
pub mod retrieve;

pub use citations::{Citations, ResolvedCitations};
pub use rate_limit::RateLimiter;
pub use reporting::{log_at, ErrorTally};
pub use retrieve::{RetrieveError, Retriever, RetrieverRegistry};

//! Metadata retrieval contract
//!
//! Retrievers live outside this crate (HTTP clients for Crossref, NCBI,
//! and so on). The core only needs a function from a standardized
//! accession to raw CSL-JSON, plus enough error structure to log and
//! skip. The [`RetrieverRegistry`] routes citekeys by standard prefix and
//! applies each retriever's own rate limit.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use cito_citekeys::CiteKey;
use cito_csl::CslItem;

use crate::rate_limit::RateLimiter;

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("no retriever registered for {standard_id:?} (prefix {prefix:?})")]
    NoRetriever { prefix: String, standard_id: String },

    #[error("network failure retrieving {standard_id:?}: {message}")]
    Network { standard_id: String, message: String },

    #[error("upstream source has no record for {standard_id:?}")]
    NotFound { standard_id: String },

    #[error("malformed upstream metadata for {standard_id:?}: {message}")]
    Malformed { standard_id: String, message: String },
}

/// One metadata source, keyed by the standard prefix it serves.
pub trait Retriever {
    /// Fetch raw CSL-JSON for a standardized accession.
    fn retrieve(&self, standard_accession: &str) -> Result<Value, RetrieveError>;

    /// Calls-per-second ceiling imposed by the upstream API, if any.
    fn max_calls_per_second(&self) -> Option<usize> {
        None
    }
}

struct Registered {
    retriever: Box<dyn Retriever>,
    limiter: Option<RateLimiter>,
}

/// Routes citekeys to retrievers by standard prefix.
#[derive(Default)]
pub struct RetrieverRegistry {
    retrievers: HashMap<String, Registered>,
}

impl RetrieverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a retriever for a standard prefix, replacing any previous
    /// registration for that prefix.
    pub fn register(&mut self, standard_prefix: &str, retriever: Box<dyn Retriever>) {
        let limiter = retriever
            .max_calls_per_second()
            .map(|calls| RateLimiter::new(calls, Duration::from_secs(1)));
        self.retrievers.insert(
            standard_prefix.to_string(),
            Registered { retriever, limiter },
        );
    }

    /// Retrieve raw metadata for a citekey as an unsanitized CSL item.
    ///
    /// Unresolvable prefixes (`raw`, `tag`) and unregistered prefixes
    /// fail with [`RetrieveError::NoRetriever`]; their items must come
    /// from manual references instead.
    pub fn retrieve(&self, citekey: &CiteKey) -> Result<CslItem, RetrieveError> {
        let no_retriever = || RetrieveError::NoRetriever {
            prefix: citekey.standard_prefix().to_string(),
            standard_id: citekey.standard_id().to_string(),
        };
        if !citekey.is_resolvable() {
            return Err(no_retriever());
        }
        let registered = self
            .retrievers
            .get(citekey.standard_prefix())
            .ok_or_else(no_retriever)?;
        if let Some(limiter) = &registered.limiter {
            limiter.acquire();
        }
        let raw = registered.retriever.retrieve(citekey.standard_accession())?;
        match raw {
            Value::Object(fields) => Ok(CslItem::new(fields)),
            other => Err(RetrieveError::Malformed {
                standard_id: citekey.standard_id().to_string(),
                message: format!("expected a JSON object, got {other}"),
            }),
        }
    }
}

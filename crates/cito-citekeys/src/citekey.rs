//! Citation key parsing and standardization
//!
//! A [`CiteKey`] carries one citation through its whole lifecycle:
//!
//! ```text
//! input_id -> dealiased_id -> (prefix, accession)
//!          -> (standard_prefix, standard_accession) -> standard_id -> short_id
//! ```
//!
//! Parsing and standardization happen eagerly at construction, so a
//! successfully built key can always answer its derived forms. The short id
//! is memoized on first access since most keys never need it.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;

use crate::handlers::{self, Handler, PANDOC_XNOS_PREFIXES};
use crate::short_id::shorten_citekey;

#[derive(Debug, Error)]
pub enum CiteKeyError {
    #[error("citekey is empty or whitespace-only")]
    Empty,

    #[error("citekey {input_id:?} has a blank prefix before ':'")]
    BlankPrefix { input_id: String },

    #[error("citekey {input_id:?} has a blank accession after ':'")]
    BlankAccession { input_id: String },
}

/// One citation request, parsed and standardized.
#[derive(Debug, Clone)]
pub struct CiteKey {
    input_id: String,
    dealiased_id: String,
    prefix: String,
    prefix_lower: String,
    accession: String,
    standard_prefix: String,
    standard_accession: String,
    standard_id: String,
    short_id: OnceLock<String>,
}

impl CiteKey {
    /// Build a citekey without alias substitution.
    pub fn new(input_id: &str) -> Result<Self, CiteKeyError> {
        Self::with_aliases(input_id, &HashMap::new())
    }

    /// Build a citekey, expanding `input_id` through `aliases` first.
    ///
    /// A leading `@` citation-marker sigil is stripped before anything else.
    /// Ids whose prefix has no registered handler fall back to pattern
    /// inference against the whole id, and finally to `raw:`, so that
    /// manually backed references still flow through the pipeline.
    pub fn with_aliases(
        input_id: &str,
        aliases: &HashMap<String, String>,
    ) -> Result<Self, CiteKeyError> {
        Self::with_options(input_id, aliases, true)
    }

    /// Like [`CiteKey::with_aliases`], with pattern inference for
    /// unprefixed ids caller-disableable. Without inference such ids go
    /// straight to `raw:`.
    pub fn with_options(
        input_id: &str,
        aliases: &HashMap<String, String>,
        infer_prefix: bool,
    ) -> Result<Self, CiteKeyError> {
        let input_id = input_id.trim().trim_start_matches('@').to_string();
        if input_id.is_empty() {
            return Err(CiteKeyError::Empty);
        }

        let dealiased_id = aliases.get(&input_id).cloned().unwrap_or_else(|| input_id.clone());

        let (mut prefix, mut accession) = match dealiased_id.split_once(':') {
            Some((prefix, accession)) => {
                if prefix.is_empty() {
                    return Err(CiteKeyError::BlankPrefix { input_id });
                }
                if accession.is_empty() {
                    return Err(CiteKeyError::BlankAccession { input_id });
                }
                (prefix.to_string(), accession.to_string())
            }
            None => (String::new(), String::new()),
        };
        let mut prefix_lower = prefix.to_lowercase();

        let (standard_prefix, standard_accession) =
            if let Some(handler) = handlers::get_handler(&prefix_lower) {
                handler.standardize(&prefix_lower, &accession)
            } else if PANDOC_XNOS_PREFIXES.contains(&prefix_lower.as_str()) {
                // Pseudo-citations pass through untouched. They are filtered
                // out before any stage that needs a real standard id.
                (prefix_lower.clone(), accession.clone())
            } else {
                let inferred = if infer_prefix {
                    handlers::infer_prefix(&dealiased_id)
                } else {
                    None
                };
                match inferred
                    .and_then(|inferred| handlers::get_handler(inferred).map(|h| (inferred, h)))
                {
                    Some((inferred, handler)) => {
                        // An inferred key behaves exactly as if the user had
                        // prefixed it: the whole dealiased id is the accession
                        // and the handler stays attached for inspection and
                        // retrieval.
                        prefix = inferred.to_string();
                        prefix_lower = inferred.to_string();
                        accession = dealiased_id.clone();
                        handler.standardize(inferred, &dealiased_id)
                    }
                    None => ("raw".to_string(), dealiased_id.clone()),
                }
            };
        let standard_id = format!("{standard_prefix}:{standard_accession}");

        Ok(Self {
            input_id,
            dealiased_id,
            prefix,
            prefix_lower,
            accession,
            standard_prefix,
            standard_accession,
            standard_id,
            short_id: OnceLock::new(),
        })
    }

    pub fn input_id(&self) -> &str {
        &self.input_id
    }

    pub fn dealiased_id(&self) -> &str {
        &self.dealiased_id
    }

    /// Input prefix with its original casing, or the inferred prefix for a
    /// bare id. Empty when the id had no `:` and nothing could be inferred.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn prefix_lower(&self) -> &str {
        &self.prefix_lower
    }

    /// Accession as written in the input. For an inferred prefix this is
    /// the whole dealiased id. Empty when neither applies.
    pub fn accession(&self) -> &str {
        &self.accession
    }

    pub fn standard_prefix(&self) -> &str {
        &self.standard_prefix
    }

    pub fn standard_accession(&self) -> &str {
        &self.standard_accession
    }

    /// Canonical `prefix:accession` form. Keys that standardize equal refer
    /// to the same work.
    pub fn standard_id(&self) -> &str {
        &self.standard_id
    }

    /// Hash-derived bibliography identifier, computed on first access.
    pub fn short_id(&self) -> &str {
        self.short_id.get_or_init(|| shorten_citekey(&self.standard_id))
    }

    fn handler(&self) -> Option<&'static Handler> {
        handlers::get_handler(&self.prefix_lower)
    }

    /// Whether the input prefix has a registered handler.
    pub fn is_handled_prefix(&self) -> bool {
        self.handler().is_some()
    }

    /// Whether the standard id can be routed to a metadata retriever.
    pub fn is_resolvable(&self) -> bool {
        self.handler().map(|handler| handler.resolvable).unwrap_or(false)
    }

    /// Whether this is a pandoc-xnos cross-reference, not a citation.
    ///
    /// Only the all-lowercase form counts. With `log_case_warning`, a
    /// case variant like `Fig:` logs a style warning but still returns
    /// false, leaving the key to the unhandled-prefix filter.
    pub fn is_pandoc_xnos_prefix(&self, log_case_warning: bool) -> bool {
        if PANDOC_XNOS_PREFIXES.contains(&self.prefix.as_str()) {
            return true;
        }
        if log_case_warning && PANDOC_XNOS_PREFIXES.contains(&self.prefix_lower.as_str()) {
            tracing::warn!(
                "pandoc-xnos prefixes should be all lowercase. Should {:?} use {:?} rather than {:?}?",
                self.input_id,
                self.prefix_lower,
                self.prefix
            );
        }
        false
    }

    /// Check the accession for syntax problems.
    ///
    /// Returns `None` when the key looks well formed or has no handler to
    /// judge it, otherwise a short diagnostic. Never fails.
    pub fn inspect(&self) -> Option<String> {
        self.handler().and_then(|handler| handler.inspect(self))
    }

    /// All identifier forms of this key, deduplicated, most raw first.
    pub fn all_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::with_capacity(4);
        for id in [
            self.input_id.as_str(),
            self.dealiased_id.as_str(),
            self.standard_id.as_str(),
            self.short_id(),
        ] {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

impl fmt::Display for CiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input_id)
    }
}

/// Two keys are the same logical request only when both the original
/// string and its alias-expanded form match. Bibliographic grouping uses
/// `standard_id` instead.
impl PartialEq for CiteKey {
    fn eq(&self, other: &Self) -> bool {
        self.input_id == other.input_id && self.dealiased_id == other.dealiased_id
    }
}

impl Eq for CiteKey {}

impl std::hash::Hash for CiteKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.input_id.hash(state);
        self.dealiased_id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigil_and_whitespace_stripped() {
        let citekey = CiteKey::new(" @doi:10.1038/nbt.3780 ").unwrap();
        assert_eq!(citekey.input_id(), "doi:10.1038/nbt.3780");
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(CiteKey::new("   "), Err(CiteKeyError::Empty)));
        assert!(matches!(CiteKey::new("@"), Err(CiteKeyError::Empty)));
    }

    #[test]
    fn test_blank_parts_rejected() {
        assert!(matches!(
            CiteKey::new(":10.1038/nbt.3780"),
            Err(CiteKeyError::BlankPrefix { .. })
        ));
        assert!(matches!(
            CiteKey::new("doi:"),
            Err(CiteKeyError::BlankAccession { .. })
        ));
    }

    #[test]
    fn test_dealiasing() {
        let mut aliases = HashMap::new();
        aliases.insert("tag:meta-review".to_string(), "doi:10.7717/peerj.4375".to_string());
        let citekey = CiteKey::with_aliases("tag:meta-review", &aliases).unwrap();
        assert_eq!(citekey.input_id(), "tag:meta-review");
        assert_eq!(citekey.dealiased_id(), "doi:10.7717/peerj.4375");
        assert_eq!(citekey.standard_id(), "doi:10.7717/peerj.4375");
    }

    #[test]
    fn test_prefix_inference() {
        let citekey = CiteKey::new("10.1038/nbt.3780").unwrap();
        assert_eq!(citekey.standard_id(), "doi:10.1038/nbt.3780");
        let citekey = CiteKey::new("PMC4304851").unwrap();
        assert_eq!(citekey.standard_id(), "pmc:PMC4304851");
    }

    #[test]
    fn test_inferred_keys_keep_their_handler() {
        let citekey = CiteKey::new("10.1038/nbt.3780").unwrap();
        assert_eq!(citekey.prefix(), "doi");
        assert_eq!(citekey.prefix_lower(), "doi");
        assert_eq!(citekey.accession(), "10.1038/nbt.3780");
        assert!(citekey.is_handled_prefix());
        assert!(citekey.is_resolvable());
        assert!(citekey.inspect().is_none());
        // Raw fallback keys stay handlerless.
        let citekey = CiteKey::new("my-manuscript-note").unwrap();
        assert!(!citekey.is_handled_prefix());
        assert_eq!(citekey.accession(), "");
    }

    #[test]
    fn test_inference_disabled() {
        let aliases = HashMap::new();
        let citekey = CiteKey::with_options("10.1038/nbt.3780", &aliases, false).unwrap();
        assert_eq!(citekey.standard_id(), "raw:10.1038/nbt.3780");
    }

    #[test]
    fn test_raw_fallback() {
        let citekey = CiteKey::new("DOID:14330").unwrap();
        assert_eq!(citekey.standard_id(), "raw:DOID:14330");
        assert!(!citekey.is_resolvable());
        let citekey = CiteKey::new("my-manuscript-note").unwrap();
        assert_eq!(citekey.standard_id(), "raw:my-manuscript-note");
    }

    #[test]
    fn test_pandoc_xnos() {
        let citekey = CiteKey::new("fig:plot1").unwrap();
        assert!(citekey.is_pandoc_xnos_prefix(false));
        assert!(!citekey.is_handled_prefix());
        assert!(citekey.inspect().is_none());
        // Case variants are a style warning, not a pseudo-citation.
        assert!(!CiteKey::new("Fig:plot1").unwrap().is_pandoc_xnos_prefix(true));
    }

    #[test]
    fn test_equality_is_input_and_dealiased() {
        let a = CiteKey::new("doi:10/b6vnmd").unwrap();
        let b = CiteKey::new("doi:10/b6vnmd").unwrap();
        let c = CiteKey::new("DOI:10/b6vnmd").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.standard_id(), c.standard_id());
    }

    #[test]
    fn test_all_ids() {
        let citekey = CiteKey::new("doi:10.5061/DRYAD.q447c/1").unwrap();
        assert_eq!(
            citekey.all_ids(),
            vec![
                "doi:10.5061/DRYAD.q447c/1",
                "doi:10.5061/dryad.q447c/1",
                "kQFQ8EaO",
            ]
        );
    }
}

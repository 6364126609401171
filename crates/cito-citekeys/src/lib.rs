//! Citation key parsing, standardization, and short-id hashing
//!
//! This crate provides the identifier layer of the citation pipeline:
//! - Citekey parsing with alias expansion and prefix inference
//! - A registry of citation-source handlers (DOI, PubMed, arXiv, ...)
//! - Accession standardization and syntax inspection
//! - Deterministic short ids via a 6-byte BLAKE2b digest in base62
//! - Citekey extraction from manuscript text
//! - URL to persistent-identifier citekey conversion

pub mod citekey;
pub mod extractors;
pub mod handlers;
pub mod isbn;
pub mod short_id;
pub mod url_citekey;

pub use citekey::{CiteKey, CiteKeyError};
pub use extractors::extract_citekeys;
pub use handlers::{get_handler, infer_prefix, is_handled_prefix, Handler, PANDOC_XNOS_PREFIXES};
pub use isbn::{is_valid_isbn, to_isbn13};
pub use short_id::shorten_citekey;
pub use url_citekey::url_to_citekey;

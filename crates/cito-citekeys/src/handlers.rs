//! Prefix registry for citation sources
//!
//! Each supported source prefix maps to one [`Handler`]: a struct of data
//! and function pointers covering syntax inspection and accession
//! standardization. The registry is a static table built at compile time;
//! prefix matching is case-insensitive while canonical prefixes stay
//! lowercase.

use lazy_static::lazy_static;
use regex::Regex;

use crate::citekey::CiteKey;
use crate::isbn;

/// Cross-reference namespaces (pandoc-fignos/tablenos/eqnos) that share the
/// `@` citation marker syntax but are not bibliographic citations.
pub const PANDOC_XNOS_PREFIXES: &[&str] = &["fig", "tbl", "eq"];

lazy_static! {
    static ref DOI_PATTERN: Regex = Regex::new(r"^10\.[0-9]{4,9}/\S+$").unwrap();
    static ref SHORTDOI_PATTERN: Regex = Regex::new(r"^10/[a-zA-Z0-9]+$").unwrap();
    static ref PUBMED_PATTERN: Regex = Regex::new(r"^[1-9][0-9]{0,7}$").unwrap();
    static ref PMC_PATTERN: Regex = Regex::new(r"^PMC[0-9]+$").unwrap();
    static ref WIKIDATA_PATTERN: Regex = Regex::new(r"^Q[0-9]+$").unwrap();
    // https://arxiv.org/help/arxiv_identifier
    static ref ARXIV_PATTERN: Regex =
        Regex::new(r"^([0-9]{4}\.[0-9]{4,5}|[a-z\-]+(\.[A-Z]{2})?/[0-9]{7})(v[0-9]+)?$").unwrap();
}

/// One registered citation source.
pub struct Handler {
    /// Canonical lowercase prefix used in standard ids.
    pub standard_prefix: &'static str,
    /// Recognized input prefixes (matched case-insensitively).
    pub prefixes: &'static [&'static str],
    /// Whether accessions of this source can be routed to a retriever.
    /// `raw` and `tag` citekeys are valid syntactically but must be backed
    /// by manually supplied reference data.
    pub resolvable: bool,
    inspect: fn(&CiteKey) -> Option<String>,
    standardize: fn(prefix_lower: &str, accession: &str) -> String,
}

impl Handler {
    /// Inspect a citekey's accession for potential problems.
    ///
    /// Returns `None` when the accession looks well formed, otherwise a
    /// short human-readable diagnostic. Never fails.
    pub fn inspect(&self, citekey: &CiteKey) -> Option<String> {
        (self.inspect)(citekey)
    }

    /// Standardize an accession, returning `(standard_prefix, standard_accession)`.
    pub fn standardize(&self, prefix_lower: &str, accession: &str) -> (String, String) {
        (
            self.standard_prefix.to_string(),
            (self.standardize)(prefix_lower, accession),
        )
    }
}

fn inspect_ok(_citekey: &CiteKey) -> Option<String> {
    None
}

fn standardize_passthrough(_prefix_lower: &str, accession: &str) -> String {
    accession.to_string()
}

fn inspect_doi(citekey: &CiteKey) -> Option<String> {
    let identifier = citekey.accession();
    if identifier.starts_with("10.") {
        // https://www.crossref.org/blog/dois-and-matching-regular-expressions/
        if !DOI_PATTERN.is_match(identifier) {
            return Some(
                "Identifier does not conform to the DOI regex. Double check the DOI.".to_string(),
            );
        }
    } else if identifier.starts_with("10/") {
        // shortDOI, see http://shortdoi.org
        if !SHORTDOI_PATTERN.is_match(identifier) {
            return Some(
                "Identifier does not conform to the shortDOI regex. Double check the shortDOI."
                    .to_string(),
            );
        }
    } else {
        return Some("DOIs must start with '10.' (or '10/' for shortDOIs).".to_string());
    }
    None
}

fn standardize_doi(_prefix_lower: &str, accession: &str) -> String {
    // DOIs are case-insensitive by specification.
    accession.to_lowercase()
}

fn inspect_pubmed(citekey: &CiteKey) -> Option<String> {
    let identifier = citekey.accession();
    // https://www.nlm.nih.gov/bsd/mms/medlineelements.html#pmid
    if identifier.starts_with("PMC") {
        return Some(format!(
            "PubMed Identifiers should start with digits rather than PMC. \
             Should {:?} switch the citation source to 'pmc'?",
            citekey.dealiased_id()
        ));
    }
    if !PUBMED_PATTERN.is_match(identifier) {
        return Some("PubMed Identifiers should be 1-8 digits with no leading zeros.".to_string());
    }
    None
}

fn inspect_pmc(citekey: &CiteKey) -> Option<String> {
    let identifier = citekey.accession();
    // https://www.nlm.nih.gov/bsd/mms/medlineelements.html#pmc
    if !identifier.starts_with("PMC") {
        return Some("PubMed Central Identifiers must start with 'PMC'.".to_string());
    }
    if !PMC_PATTERN.is_match(identifier) {
        return Some(
            "Identifier does not conform to the PMCID regex. Double check the PMCID.".to_string(),
        );
    }
    None
}

fn inspect_arxiv(citekey: &CiteKey) -> Option<String> {
    let identifier = citekey.accession();
    if !ARXIV_PATTERN.is_match(identifier) {
        return Some(
            "arXiv identifiers must conform to syntax described at \
             https://arxiv.org/help/arxiv_identifier."
                .to_string(),
        );
    }
    None
}

fn inspect_isbn(citekey: &CiteKey) -> Option<String> {
    let identifier = citekey.accession();
    if !isbn::is_valid_isbn(identifier) {
        return Some("identifier violates the ISBN syntax".to_string());
    }
    None
}

fn standardize_isbn(_prefix_lower: &str, accession: &str) -> String {
    isbn::to_isbn13(accession)
}

fn inspect_wikidata(citekey: &CiteKey) -> Option<String> {
    let identifier = citekey.accession();
    // https://www.wikidata.org/wiki/Wikidata:Identifiers
    if !identifier.starts_with('Q') {
        return Some("Wikidata item IDs must start with 'Q'.".to_string());
    }
    if !WIKIDATA_PATTERN.is_match(identifier) {
        return Some(
            "Identifier does not conform to the Wikidata regex. Double check the entity ID."
                .to_string(),
        );
    }
    None
}

fn standardize_url(prefix_lower: &str, accession: &str) -> String {
    // When the input prefix was the URL scheme itself, the scheme is part
    // of the URL and must be reconstituted into the accession.
    match prefix_lower {
        "http" | "https" => format!("{prefix_lower}:{accession}"),
        _ => accession.to_string(),
    }
}

static HANDLERS: &[Handler] = &[
    Handler {
        standard_prefix: "doi",
        prefixes: &["doi", "shortdoi"],
        resolvable: true,
        inspect: inspect_doi,
        standardize: standardize_doi,
    },
    Handler {
        standard_prefix: "pubmed",
        prefixes: &["pubmed", "pmid"],
        resolvable: true,
        inspect: inspect_pubmed,
        standardize: standardize_passthrough,
    },
    Handler {
        standard_prefix: "pmc",
        prefixes: &["pmc", "pmcid"],
        resolvable: true,
        inspect: inspect_pmc,
        standardize: standardize_passthrough,
    },
    Handler {
        standard_prefix: "arxiv",
        prefixes: &["arxiv"],
        resolvable: true,
        inspect: inspect_arxiv,
        standardize: standardize_passthrough,
    },
    Handler {
        standard_prefix: "isbn",
        prefixes: &["isbn"],
        resolvable: true,
        inspect: inspect_isbn,
        standardize: standardize_isbn,
    },
    Handler {
        standard_prefix: "wikidata",
        prefixes: &["wikidata"],
        resolvable: true,
        inspect: inspect_wikidata,
        standardize: standardize_passthrough,
    },
    Handler {
        standard_prefix: "url",
        prefixes: &["url", "http", "https"],
        resolvable: true,
        inspect: inspect_ok,
        standardize: standardize_url,
    },
    Handler {
        standard_prefix: "raw",
        prefixes: &["raw"],
        resolvable: false,
        inspect: inspect_ok,
        standardize: standardize_passthrough,
    },
    Handler {
        standard_prefix: "tag",
        prefixes: &["tag"],
        resolvable: false,
        inspect: inspect_ok,
        standardize: standardize_passthrough,
    },
];

/// Look up the handler for a lowercase prefix.
pub fn get_handler(prefix_lower: &str) -> Option<&'static Handler> {
    HANDLERS
        .iter()
        .find(|handler| handler.prefixes.contains(&prefix_lower))
}

/// Whether a lowercase prefix has a registered handler.
pub fn is_handled_prefix(prefix_lower: &str) -> bool {
    get_handler(prefix_lower).is_some()
}

/// Infer the citation source for an id that lacks a recognized prefix.
///
/// Tries source accession patterns against the whole id, so bare
/// identifiers like `10.1038/nbt.3780` or `1407.3561v1` still resolve.
/// Returns the inferred standard prefix, or `None` when no pattern matches.
pub fn infer_prefix(id: &str) -> Option<&'static str> {
    if DOI_PATTERN.is_match(id) || SHORTDOI_PATTERN.is_match(id) {
        return Some("doi");
    }
    if ARXIV_PATTERN.is_match(id) {
        return Some("arxiv");
    }
    if PMC_PATTERN.is_match(id) {
        return Some("pmc");
    }
    if WIKIDATA_PATTERN.is_match(id) {
        return Some("wikidata");
    }
    None
}

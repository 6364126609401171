//! Conversion of well-known URLs to persistent-identifier citekeys
//!
//! Many landing-page URLs embed a persistent identifier that makes a far
//! better citation than the URL itself. This module recognizes a handful of
//! high-traffic hosts and rewrites their URLs to `doi:`, `pmid:`, `pmcid:`,
//! `wikidata:` or `arxiv:` citekeys, falling back to `url:` otherwise.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::citekey::CiteKey;

lazy_static! {
    // bioRxiv ids are either unversioned numeric ids or dated ids like
    // 2019.12.11.872580, both at least six trailing digits.
    static ref BIORXIV_ID: Regex =
        Regex::new(r"/(([0-9]{4}\.[0-9]{2}\.[0-9]{2}\.)?[0-9]{6,})").unwrap();
}

/// Convert a URL to a citekey, preferring persistent identifiers.
///
/// Returns a `doi:`/`pmid:`/`pmcid:`/`wikidata:`/`arxiv:` citekey when the
/// URL is recognized and the extracted identifier passes inspection, and a
/// plain `url:` citekey otherwise. The output is always a parseable citekey.
pub fn url_to_citekey(url: &str) -> String {
    let citekey = recognize(url);
    let valid = citekey
        .as_deref()
        .and_then(|citekey| CiteKey::new(citekey).ok())
        .map(|citekey| citekey.inspect().is_none())
        .unwrap_or(false);
    if valid {
        citekey.unwrap_or_default()
    } else {
        format!("url:{url}")
    }
}

fn recognize(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let path = parsed.path();
    let levels: Vec<&str> = host.split('.').collect();

    let mut citekey = None;
    if levels.ends_with(&["doi", "org"]) {
        let doi = urlencoding::decode(path.trim_start_matches('/')).ok()?;
        citekey = Some(format!("doi:{doi}"));
    }
    if levels.len() >= 2 && levels[levels.len() - 2] == "sci-hub" {
        citekey = Some(format!("doi:{}", path.trim_start_matches('/')));
    }
    if levels.ends_with(&["biorxiv", "org"]) {
        if let Some(captures) = BIORXIV_ID.captures(path) {
            citekey = Some(format!("doi:10.1101/{}", &captures[1]));
        }
    }
    if host == "www.ncbi.nlm.nih.gov" {
        if path.starts_with("/pubmed/") {
            if let Some(pmid) = path.split('/').nth(2) {
                citekey = Some(format!("pmid:{pmid}"));
            }
        }
        if path.starts_with("/pmc/") {
            if let Some(pmcid) = path.split('/').nth(3) {
                citekey = Some(format!("pmcid:{pmcid}"));
            }
        }
    }
    if levels.ends_with(&["wikidata", "org"]) && path.starts_with("/wiki/") {
        if let Some(entity) = path.split('/').nth(2) {
            citekey = Some(format!("wikidata:{entity}"));
        }
    }
    if levels.ends_with(&["arxiv", "org"]) {
        if let Some(arxiv_id) = path.splitn(3, '/').nth(2) {
            let arxiv_id = arxiv_id.strip_suffix(".pdf").unwrap_or(arxiv_id);
            citekey = Some(format!("arxiv:{arxiv_id}"));
        }
    }
    citekey
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://peerj.com/articles/705/", "url:https://peerj.com/articles/705/")]
    #[test_case("https://doi.org/10.1101/142760", "doi:10.1101/142760")]
    #[test_case("https://doi.org/10.7717%2Fpeerj.705", "doi:10.7717/peerj.705")]
    #[test_case("https://sci-hub.tw/10.7717/peerj.705", "doi:10.7717/peerj.705")]
    #[test_case(
        "https://www.biorxiv.org/content/10.1101/2019.12.11.872580v1",
        "doi:10.1101/2019.12.11.872580"
    )]
    #[test_case(
        "https://www.biorxiv.org/content/early/2017/08/31/142760",
        "doi:10.1101/142760"
    )]
    #[test_case("https://www.ncbi.nlm.nih.gov/pubmed/24159271", "pmid:24159271")]
    #[test_case(
        "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC4304851/",
        "pmcid:PMC4304851"
    )]
    #[test_case("https://www.wikidata.org/wiki/Q50051684", "wikidata:Q50051684")]
    #[test_case("https://arxiv.org/abs/1407.3561v1", "arxiv:1407.3561v1")]
    #[test_case("https://arxiv.org/pdf/1407.3561v1.pdf", "arxiv:1407.3561v1")]
    fn test_url_to_citekey(url: &str, expected: &str) {
        assert_eq!(url_to_citekey(url), expected);
    }

    #[test]
    fn test_invalid_extracted_identifier_falls_back_to_url() {
        // Wikidata path segment that is not a Q-id fails inspection.
        let url = "https://www.wikidata.org/wiki/Special:Random";
        assert_eq!(url_to_citekey(url), format!("url:{url}"));
    }
}

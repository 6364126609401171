//! Citation set management
//!
//! A [`Citations`] owns every citekey of one document and drives the
//! pipeline: dedupe, pseudo-citation and unhandled-prefix filtering,
//! manual-reference overrides, collision and duplicate checks, syntax
//! inspection, and finally resolution into a deduplicated bibliography.

use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{error, warn, Level};

use cito_citekeys::{CiteKey, CiteKeyError};
use cito_csl::{CslItem, CslItemError};

use crate::reporting::log_at;
use crate::retrieve::{RetrieveError, RetrieverRegistry};

const GENERATOR_NOTE: &str = concat!(
    "This CSL Item was generated by ",
    env!("CARGO_PKG_NAME"),
    " v",
    env!("CARGO_PKG_VERSION"),
    " from its persistent identifier (standard_id)."
);

#[derive(Debug, Error)]
enum GenerateError {
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),

    #[error(transparent)]
    Item(#[from] CslItemError),
}

/// The resolved bibliography for one citation set.
#[derive(Debug, Default)]
pub struct ResolvedCitations {
    /// One sanitized CSL item per distinct standard id that resolved.
    pub csl_items: Vec<CslItem>,
    /// Original input string to the id of its resolved item. Inputs whose
    /// group failed to resolve are absent.
    pub input_to_csl_id: IndexMap<String, String>,
}

impl ResolvedCitations {
    /// Render the bibliography as a pretty-printed CSL-JSON array.
    pub fn csl_json(&self) -> serde_json::Result<String> {
        let mut rendered = serde_json::to_string_pretty(&self.csl_items)?;
        rendered.push('\n');
        Ok(rendered)
    }
}

/// An ordered set of citations for one document.
pub struct Citations {
    citekeys: Vec<CiteKey>,
    manual_refs: IndexMap<String, CslItem>,
    /// Severity for per-group resolution failures.
    pub csl_item_failure_log_level: Level,
    /// Whether to prune resolved items against the CSL schema.
    pub prune_csl_items: bool,
    /// Sort the bibliography by standard id; otherwise keep first-seen
    /// input order. Either way items are deduplicated by standard id.
    pub sort_csl_items: bool,
}

impl Citations {
    pub fn new<I, S>(input_ids: I) -> Result<Self, CiteKeyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_aliases(input_ids, &HashMap::new())
    }

    /// Build from raw input strings, deduplicated with first-seen order
    /// preserved. Fails on the first malformed input.
    pub fn with_aliases<I, S>(
        input_ids: I,
        aliases: &HashMap<String, String>,
    ) -> Result<Self, CiteKeyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_options(input_ids, aliases, true)
    }

    /// Like [`Citations::with_aliases`], with citekey prefix inference
    /// caller-disableable.
    pub fn with_options<I, S>(
        input_ids: I,
        aliases: &HashMap<String, String>,
        infer_citekey_prefixes: bool,
    ) -> Result<Self, CiteKeyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = std::collections::HashSet::new();
        let mut citekeys = Vec::new();
        for input_id in input_ids {
            let input_id = input_id.as_ref();
            if !seen.insert(input_id.to_string()) {
                continue;
            }
            citekeys.push(CiteKey::with_options(input_id, aliases, infer_citekey_prefixes)?);
        }
        Ok(Self {
            citekeys,
            manual_refs: IndexMap::new(),
            csl_item_failure_log_level: Level::WARN,
            prune_csl_items: true,
            sort_csl_items: true,
        })
    }

    pub fn citekeys(&self) -> &[CiteKey] {
        &self.citekeys
    }

    pub fn manual_refs(&self) -> &IndexMap<String, CslItem> {
        &self.manual_refs
    }

    /// Remove pandoc-xnos pseudo-citations (`fig:`, `tbl:`, `eq:`) and
    /// return them. Removal is expected and silent; uppercase variants
    /// stay but log a style warning.
    pub fn filter_pandoc_xnos(&mut self) -> Vec<CiteKey> {
        let citekeys = std::mem::take(&mut self.citekeys);
        let (removed, kept): (Vec<_>, Vec<_>) = citekeys
            .into_iter()
            .partition(|citekey| citekey.is_pandoc_xnos_prefix(true));
        self.citekeys = kept;
        removed
    }

    /// Remove citekeys whose prefix has no registered handler and return
    /// them. `raw:` and `tag:` are handled and therefore kept.
    pub fn filter_unhandled(&mut self) -> Vec<CiteKey> {
        let citekeys = std::mem::take(&mut self.citekeys);
        let (removed, kept): (Vec<_>, Vec<_>) = citekeys
            .into_iter()
            .partition(|citekey| !citekey.is_handled_prefix());
        self.citekeys = kept;
        removed
    }

    /// Merge externally loaded reference items into the manual-overrides
    /// table, keyed by standard id. Later calls extend and update rather
    /// than replace. Items whose id cannot be standardized are skipped
    /// with a warning.
    pub fn load_manual_references(&mut self, csl_items: Vec<CslItem>, source: Option<&str>) {
        for mut csl_item in csl_items {
            csl_item.note_append_text("Loaded from an external bibliography file.");
            if let Some(source) = source {
                csl_item
                    .note_append_pairs(&[("source_bibliography".to_string(), source.to_string())]);
            }
            if let Err(error) = csl_item.standardize_id() {
                warn!(%error, "skipping manual reference without a usable id");
                continue;
            }
            let standard_id = csl_item.id().unwrap_or_default().to_string();
            self.manual_refs.insert(standard_id, csl_item);
        }
    }

    /// Group citekeys by a derived key, preserving first-occurrence order
    /// within and across groups unless `sort` is set.
    pub fn group_citekeys_by<'a, F>(&'a self, key: F, sort: bool) -> Vec<(String, Vec<&'a CiteKey>)>
    where
        F: Fn(&CiteKey) -> &str,
    {
        let mut groups: IndexMap<String, Vec<&CiteKey>> = IndexMap::new();
        for citekey in &self.citekeys {
            groups.entry(key(citekey).to_string()).or_default().push(citekey);
        }
        let mut groups: Vec<_> = groups.into_iter().collect();
        if sort {
            groups.sort_by(|a, b| a.0.cmp(&b.0));
        }
        groups
    }

    /// Log an error for every short id shared by multiple standard ids.
    /// Collisions are vanishingly rare but must be surfaced, never merged.
    pub fn check_collisions(&self) {
        for (short_id, citekeys) in self.group_citekeys_by(|citekey| citekey.short_id(), true) {
            let mut standard_ids: Vec<&str> =
                citekeys.iter().map(|citekey| citekey.standard_id()).collect();
            standard_ids.sort_unstable();
            standard_ids.dedup();
            if standard_ids.len() > 1 {
                error!(
                    "Hash collision: multiple standard_ids hashed to {short_id}: {standard_ids:?}"
                );
            }
        }
    }

    /// Warn when several distinct input ids refer to one standard id, so
    /// authors notice they cited the same work in different ways.
    pub fn check_multiple_input_ids(&self) {
        for (standard_id, citekeys) in self.group_citekeys_by(|citekey| citekey.standard_id(), true)
        {
            if citekeys.len() < 2 {
                continue;
            }
            let input_ids: Vec<&str> =
                citekeys.iter().map(|citekey| citekey.input_id()).collect();
            warn!(
                "Multiple citekey input_ids refer to the same standard_id {standard_id}: {input_ids:?}"
            );
        }
    }

    /// Inspect each unique (by dealiased id) citekey and combine the
    /// diagnostics into one report, optionally logged at `log_level`.
    pub fn inspect(&self, log_level: Option<Level>) -> String {
        let mut reports = Vec::new();
        for (dealiased_id, citekeys) in
            self.group_citekeys_by(|citekey| citekey.dealiased_id(), true)
        {
            let Some(citekey) = citekeys.first() else {
                continue;
            };
            if let Some(report) = citekey.inspect() {
                reports.push(format!("{dealiased_id} -- {report}"));
            }
        }
        let report = reports.join("\n");
        if !report.is_empty() {
            if let Some(level) = log_level {
                log_at(
                    level,
                    &format!(
                        "Inspection of dealiased citekeys revealed potential problems:\n{report}"
                    ),
                );
            }
        }
        report
    }

    /// Resolve the citation set into a bibliography.
    ///
    /// Citekeys are grouped by standard id and each group resolves once:
    /// from the manual-overrides table when present, otherwise through
    /// the registry followed by annotation, short-id assignment, and
    /// sanitization. A failing group is logged at the configured level
    /// and excluded; the remaining groups still resolve.
    pub fn get_csl_items(&self, registry: &RetrieverRegistry) -> ResolvedCitations {
        let mut resolved = ResolvedCitations::default();
        for (_standard_id, citekeys) in
            self.group_citekeys_by(|citekey| citekey.standard_id(), self.sort_csl_items)
        {
            let Some(representative) = citekeys.first() else {
                continue;
            };
            let Some(csl_item) = self.citekey_to_csl_item(representative, registry) else {
                continue;
            };
            let csl_id = csl_item.id().unwrap_or_default().to_string();
            for citekey in &citekeys {
                resolved
                    .input_to_csl_id
                    .insert(citekey.input_id().to_string(), csl_id.clone());
            }
            resolved.csl_items.push(csl_item);
        }
        resolved
    }

    fn citekey_to_csl_item(
        &self,
        citekey: &CiteKey,
        registry: &RetrieverRegistry,
    ) -> Option<CslItem> {
        if let Some(csl_item) = self.manual_refs.get(citekey.standard_id()) {
            return Some(csl_item.clone());
        }
        match self.generate_csl_item(citekey, registry) {
            Ok(csl_item) => Some(csl_item),
            Err(error) => {
                log_at(
                    self.csl_item_failure_log_level,
                    &format!(
                        "Generating a CSL item for {:?} failed: {error}",
                        citekey.standard_id()
                    ),
                );
                None
            }
        }
    }

    fn generate_csl_item(
        &self,
        citekey: &CiteKey,
        registry: &RetrieverRegistry,
    ) -> Result<CslItem, GenerateError> {
        let mut csl_item = registry.retrieve(citekey)?;
        csl_item.note_append_text(GENERATOR_NOTE);
        csl_item.note_append_pairs(&[(
            "standard_id".to_string(),
            citekey.standard_id().to_string(),
        )]);
        csl_item.set_id(citekey.short_id());
        csl_item.clean(self.prune_csl_items)?;
        Ok(csl_item)
    }

    /// Tab-separated table of every citekey's identifier forms.
    pub fn citekeys_tsv(&self) -> String {
        let mut tsv = String::from("input_id\tdealiased_id\tstandard_id\tshort_id\n");
        for citekey in &self.citekeys {
            tsv.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                citekey.input_id(),
                citekey.dealiased_id(),
                citekey.standard_id(),
                citekey.short_id()
            ));
        }
        tsv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_dedupes_preserving_order() {
        let citations =
            Citations::new(["doi:10/b6vnmd", "pmid:24159271", "doi:10/b6vnmd"]).unwrap();
        let input_ids: Vec<&str> =
            citations.citekeys().iter().map(|citekey| citekey.input_id()).collect();
        assert_eq!(input_ids, vec!["doi:10/b6vnmd", "pmid:24159271"]);
    }

    #[test]
    fn test_construction_rejects_malformed() {
        assert!(Citations::new(["doi:10/b6vnmd", ""]).is_err());
    }

    #[test]
    fn test_filter_pandoc_xnos() {
        let mut citations =
            Citations::new(["fig:plot", "doi:10/b6vnmd", "tbl:results", "eq:euler"]).unwrap();
        let removed = citations.filter_pandoc_xnos();
        assert_eq!(removed.len(), 3);
        assert_eq!(citations.citekeys().len(), 1);
        assert_eq!(citations.citekeys()[0].input_id(), "doi:10/b6vnmd");
    }

    #[test]
    fn test_filter_unhandled_keeps_raw_and_tag() {
        let mut citations =
            Citations::new(["raw:manual", "tag:alias", "Fig:plot", "doi:10/b6vnmd"]).unwrap();
        citations.filter_pandoc_xnos();
        let removed = citations.filter_unhandled();
        // "Fig:plot" is a case-variant pseudo-citation with no handler.
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].input_id(), "Fig:plot");
        assert_eq!(citations.citekeys().len(), 3);
    }

    #[test]
    fn test_group_citekeys_by_standard_id() {
        let citations =
            Citations::new(["pmid:24159271", "DOI:10/b6vnmd", "doi:10/b6vnmd"]).unwrap();
        let groups = citations.group_citekeys_by(|citekey| citekey.standard_id(), true);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "doi:10/b6vnmd");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "pubmed:24159271");
    }

    #[test]
    fn test_inspect_reports_problem_keys_only() {
        let citations = Citations::new(["doi:10/b6vnmd", "wikidata:P212"]).unwrap();
        let report = citations.inspect(None);
        assert!(report.contains("wikidata:P212"));
        assert!(!report.contains("b6vnmd"));
    }

    #[test]
    fn test_citekeys_tsv() {
        let citations = Citations::new(["pmid:24159271"]).unwrap();
        assert_eq!(
            citations.citekeys_tsv(),
            "input_id\tdealiased_id\tstandard_id\tshort_id\n\
             pmid:24159271\tpmid:24159271\tpubmed:24159271\t11sli93ov\n"
        );
    }
}

//! End-to-end tests of the citation pipeline with mock retrievers

use std::collections::HashMap;

use serde_json::{json, Value};

use cito_core::{Citations, RetrieveError, Retriever, RetrieverRegistry};
use cito_csl::CslItem;

struct ArxivFixture;

impl Retriever for ArxivFixture {
    fn retrieve(&self, standard_accession: &str) -> Result<Value, RetrieveError> {
        if standard_accession != "1407.3561v1" {
            return Err(RetrieveError::NotFound {
                standard_id: format!("arxiv:{standard_accession}"),
            });
        }
        Ok(json!({
            "type": "report",
            "title": "IPFS - Content Addressed, Versioned, P2P File System",
            "container-title": "arXiv",
            "author": [{"family": "Benet", "given": "Juan"}],
            "issued": {"date-parts": [[2014, 7, 14]]},
            "URL": "https://arxiv.org/abs/1407.3561v1",
            "number": "1407.3561v1",
        }))
    }
}

struct DoiFixture;

impl Retriever for DoiFixture {
    fn retrieve(&self, standard_accession: &str) -> Result<Value, RetrieveError> {
        Ok(json!({
            "type": "journal-article",
            "title": "Fixture article",
            "DOI": standard_accession,
            "subtype": "out-of-schema",
        }))
    }
}

struct FailingRetriever;

impl Retriever for FailingRetriever {
    fn retrieve(&self, standard_accession: &str) -> Result<Value, RetrieveError> {
        Err(RetrieveError::Network {
            standard_id: standard_accession.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

fn registry() -> RetrieverRegistry {
    let mut registry = RetrieverRegistry::new();
    registry.register("arxiv", Box::new(ArxivFixture));
    registry.register("doi", Box::new(DoiFixture));
    registry
}

#[test]
fn test_resolution_annotates_and_assigns_short_id() {
    let citations = Citations::new(["arxiv:1407.3561v1"]).unwrap();
    let resolved = citations.get_csl_items(&registry());
    assert_eq!(resolved.csl_items.len(), 1);
    let csl_item = &resolved.csl_items[0];
    assert_eq!(csl_item.id(), Some("16kozZ9Ys"));
    assert_eq!(csl_item.get_str("type"), Some("report"));
    assert_eq!(csl_item.get_str("container-title"), Some("arXiv"));
    assert_eq!(
        csl_item.note_dict().get("standard_id").map(String::as_str),
        Some("arxiv:1407.3561v1")
    );
    assert_eq!(
        resolved.input_to_csl_id.get("arxiv:1407.3561v1").map(String::as_str),
        Some("16kozZ9Ys")
    );
}

#[test]
fn test_equivalent_inputs_deduplicate_to_one_item() {
    let citations =
        Citations::new(["doi:10/b6vnmd", "DOI:10/B6VNMD", "doi:10/b6vnmd"]).unwrap();
    let resolved = citations.get_csl_items(&registry());
    assert_eq!(resolved.csl_items.len(), 1);
    // Both surviving distinct inputs map to the single item's id.
    assert_eq!(resolved.input_to_csl_id.len(), 2);
    let ids: Vec<&String> = resolved.input_to_csl_id.values().collect();
    assert_eq!(ids[0], ids[1]);
    // Schema pruning removed the out-of-schema field.
    assert!(resolved.csl_items[0].get("subtype").is_none());
}

#[test]
fn test_failed_group_excluded_others_resolve() {
    let mut registry = registry();
    registry.register("pubmed", Box::new(FailingRetriever));
    let citations = Citations::new(["pmid:24159271", "arxiv:1407.3561v1"]).unwrap();
    let resolved = citations.get_csl_items(&registry);
    assert_eq!(resolved.csl_items.len(), 1);
    assert_eq!(resolved.csl_items[0].id(), Some("16kozZ9Ys"));
    assert!(!resolved.input_to_csl_id.contains_key("pmid:24159271"));
}

#[test]
fn test_manual_reference_overrides_retrieval() {
    let mut citations = Citations::new(["raw:dongbo-manuscript"]).unwrap();
    citations.load_manual_references(
        vec![CslItem::from_value(json!({
            "id": "raw:dongbo-manuscript",
            "type": "manuscript",
            "title": "Unpublished manuscript",
        }))],
        Some("references.json"),
    );
    let resolved = citations.get_csl_items(&registry());
    assert_eq!(resolved.csl_items.len(), 1);
    let csl_item = &resolved.csl_items[0];
    // Manual references keep their standardized id and annotations.
    assert_eq!(csl_item.id(), Some("raw:dongbo-manuscript"));
    assert!(csl_item.note().contains("Loaded from an external bibliography file."));
    assert_eq!(
        csl_item.note_dict().get("source_bibliography").map(String::as_str),
        Some("references.json")
    );
    assert_eq!(
        resolved.input_to_csl_id.get("raw:dongbo-manuscript").map(String::as_str),
        Some("raw:dongbo-manuscript")
    );
}

#[test]
fn test_sorted_and_stable_ordering_modes() {
    let inputs = ["doi:10.7717/peerj.705", "arxiv:1407.3561v1"];
    let mut citations = Citations::new(inputs).unwrap();
    let resolved = citations.get_csl_items(&registry());
    let ids: Vec<Option<&str>> =
        resolved.csl_items.iter().map(|csl_item| csl_item.get_str("type")).collect();
    // Sorted mode orders by standard id: arxiv before doi.
    assert_eq!(ids, vec![Some("report"), Some("article-journal")]);

    citations.sort_csl_items = false;
    let resolved = citations.get_csl_items(&registry());
    let ids: Vec<Option<&str>> =
        resolved.csl_items.iter().map(|csl_item| csl_item.get_str("type")).collect();
    assert_eq!(ids, vec![Some("article-journal"), Some("report")]);
}

#[test]
fn test_full_pipeline_with_aliases_and_xnos() {
    let mut aliases = HashMap::new();
    aliases.insert("ipfs".to_string(), "arxiv:1407.3561v1".to_string());
    let mut citations =
        Citations::with_aliases(["@ipfs", "fig:plot1", "doi:10/b6vnmd"], &aliases).unwrap();
    let removed = citations.filter_pandoc_xnos();
    assert_eq!(removed.len(), 1);
    assert!(citations.filter_unhandled().is_empty());
    citations.check_collisions();
    citations.check_multiple_input_ids();
    assert_eq!(citations.inspect(None), "");
    let resolved = citations.get_csl_items(&registry());
    assert_eq!(resolved.csl_items.len(), 2);
    assert_eq!(
        resolved.input_to_csl_id.get("ipfs").map(String::as_str),
        Some("16kozZ9Ys")
    );
}

#[test]
fn test_inferred_prefix_survives_filtering_and_resolves() {
    let mut citations = Citations::new(["10.1038/nbt.3780"]).unwrap();
    assert!(citations.filter_unhandled().is_empty());
    let resolved = citations.get_csl_items(&registry());
    assert_eq!(resolved.csl_items.len(), 1);
    let csl_item = &resolved.csl_items[0];
    assert_eq!(csl_item.get_str("DOI"), Some("10.1038/nbt.3780"));
    assert_eq!(
        csl_item.note_dict().get("standard_id").map(String::as_str),
        Some("doi:10.1038/nbt.3780")
    );
    assert!(resolved.input_to_csl_id.contains_key("10.1038/nbt.3780"));
}

#[test]
fn test_csl_json_output_is_an_array() {
    let citations = Citations::new(["arxiv:1407.3561v1"]).unwrap();
    let resolved = citations.get_csl_items(&registry());
    let rendered = resolved.csl_json().unwrap();
    assert!(rendered.starts_with('['));
    assert!(rendered.ends_with("]\n"));
    let parsed: Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(1));
}

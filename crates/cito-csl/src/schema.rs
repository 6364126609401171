//! CSL-JSON data schema, v1.0.2
//!
//! A hand-modeled subset of the CSL-JSON data schema covering everything
//! the pruner needs: per-field type constraints, the closed `type`
//! vocabulary, name and date variable shapes, and `additionalProperties`
//! boundaries. Modeled directly rather than loaded from the upstream JSON
//! file so violation kinds are a closed set the repair dispatch can match
//! exhaustively.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde_json::Value;

/// JSON value categories used in `type` constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (JsonType::Boolean, Value::Bool(_))
                | (JsonType::Number, Value::Number(_))
                | (JsonType::String, Value::String(_))
                | (JsonType::Array, Value::Array(_))
                | (JsonType::Object, Value::Object(_))
        )
    }
}

/// One schema node.
#[derive(Debug)]
pub enum Schema {
    /// `type` constraint listing acceptable value categories.
    Primitive(Vec<JsonType>),
    /// Closed string vocabulary.
    Enum(Vec<&'static str>),
    Object {
        properties: HashMap<&'static str, Schema>,
        required: Vec<&'static str>,
        /// When false, keys outside `properties` are violations.
        additional_properties: bool,
    },
    Array {
        items: Box<Schema>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    /// Value must satisfy at least one branch.
    AnyOf(Vec<Schema>),
}

fn string() -> Schema {
    Schema::Primitive(vec![JsonType::String])
}

fn string_or_number() -> Schema {
    Schema::Primitive(vec![JsonType::String, JsonType::Number])
}

fn string_number_bool() -> Schema {
    Schema::Primitive(vec![JsonType::String, JsonType::Number, JsonType::Boolean])
}

fn array_of(items: Schema, min_items: Option<usize>, max_items: Option<usize>) -> Schema {
    Schema::Array {
        items: Box::new(items),
        min_items,
        max_items,
    }
}

fn object(
    properties: Vec<(&'static str, Schema)>,
    required: Vec<&'static str>,
    additional_properties: bool,
) -> Schema {
    Schema::Object {
        properties: properties.into_iter().collect(),
        required,
        additional_properties,
    }
}

const ITEM_TYPES: &[&str] = &[
    "article",
    "article-journal",
    "article-magazine",
    "article-newspaper",
    "bill",
    "book",
    "broadcast",
    "chapter",
    "dataset",
    "entry",
    "entry-dictionary",
    "entry-encyclopedia",
    "figure",
    "graphic",
    "interview",
    "legal_case",
    "legislation",
    "manuscript",
    "map",
    "motion_picture",
    "musical_score",
    "pamphlet",
    "paper-conference",
    "patent",
    "personal_communication",
    "post",
    "post-weblog",
    "report",
    "review",
    "review-book",
    "song",
    "speech",
    "thesis",
    "treaty",
    "webpage",
];

/// Fields holding an ordered list of names.
const NAME_FIELDS: &[&str] = &[
    "author",
    "collection-editor",
    "composer",
    "container-author",
    "director",
    "editor",
    "editorial-director",
    "illustrator",
    "interviewer",
    "original-author",
    "recipient",
    "reviewed-author",
    "translator",
];

/// Fields holding a date variable.
const DATE_FIELDS: &[&str] = &[
    "accessed",
    "container",
    "event-date",
    "issued",
    "original-date",
    "submitted",
];

/// Fields the schema types as string-or-number (ordinals, ranges).
const STRING_OR_NUMBER_FIELDS: &[&str] = &[
    "chapter-number",
    "citation-number",
    "collection-number",
    "edition",
    "first-reference-note-number",
    "issue",
    "number",
    "number-of-pages",
    "number-of-volumes",
    "page",
    "page-first",
    "version",
    "volume",
];

const STRING_FIELDS: &[&str] = &[
    "abstract",
    "annote",
    "archive",
    "archive_location",
    "archive-place",
    "authority",
    "call-number",
    "citation-label",
    "collection-title",
    "container-title",
    "container-title-short",
    "dimensions",
    "DOI",
    "event",
    "event-place",
    "genre",
    "ISBN",
    "ISSN",
    "journalAbbreviation",
    "jurisdiction",
    "keyword",
    "language",
    "locator",
    "medium",
    "note",
    "original-publisher",
    "original-publisher-place",
    "original-title",
    "PMCID",
    "PMID",
    "publisher",
    "publisher-place",
    "references",
    "reviewed-title",
    "scale",
    "section",
    "shortTitle",
    "source",
    "status",
    "title",
    "title-short",
    "URL",
    "year-suffix",
];

fn name_variable() -> Schema {
    Schema::AnyOf(vec![object(
        vec![
            ("family", string()),
            ("given", string()),
            ("dropping-particle", string()),
            ("non-dropping-particle", string()),
            ("suffix", string()),
            ("comma-suffix", string_number_bool()),
            ("static-ordering", string_number_bool()),
            ("literal", string()),
            ("parse-names", string_number_bool()),
        ],
        vec![],
        false,
    )])
}

fn date_variable() -> Schema {
    Schema::AnyOf(vec![object(
        vec![
            (
                "date-parts",
                array_of(
                    array_of(string_or_number(), Some(1), Some(3)),
                    Some(1),
                    Some(2),
                ),
            ),
            ("season", string_or_number()),
            ("circa", string_number_bool()),
            ("literal", string()),
            ("raw", string()),
        ],
        vec![],
        false,
    )])
}

fn csl_item_schema() -> Schema {
    let mut properties: Vec<(&'static str, Schema)> = vec![
        ("type", Schema::Enum(ITEM_TYPES.to_vec())),
        ("id", string_or_number()),
        ("categories", array_of(string(), None, None)),
        ("custom", Schema::Primitive(vec![JsonType::Object])),
    ];
    for field in NAME_FIELDS {
        properties.push((field, array_of(name_variable(), None, None)));
    }
    for field in DATE_FIELDS {
        properties.push((field, date_variable()));
    }
    for field in STRING_OR_NUMBER_FIELDS {
        properties.push((field, string_or_number()));
    }
    for field in STRING_FIELDS {
        properties.push((field, string()));
    }
    object(properties, vec!["type", "id"], false)
}

lazy_static! {
    /// Schema for one CSL item, shared across all validation passes.
    pub static ref CSL_ITEM_SCHEMA: Schema = csl_item_schema();
}

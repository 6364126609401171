//! CSL-JSON item modeling
//!
//! A [`CslItem`] wraps one CSL-JSON mapping and keeps it schema-conformant:
//! type vocabulary correction, id inference and standardization, and the
//! `clean` entry point that drives schema pruning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use cito_citekeys::{CiteKey, CiteKeyError};

use crate::prune::{remove_schema_errors, validate};

/// Upstream metadata sources use Crossref/DataCite type vocabulary, which
/// does not always match CSL's. Unmapped types pass through unchanged.
const TYPE_MAP: &[(&str, &str)] = &[
    ("journal-article", "article-journal"),
    ("book-chapter", "chapter"),
    ("posted-content", "manuscript"),
    ("proceedings-article", "paper-conference"),
    ("standard", "entry"),
    ("reference-entry", "entry"),
];

#[derive(Debug, Error)]
pub enum CslItemError {
    #[error(
        "cannot infer an id: item has no standard_citation field, standard_id note entry, or id"
    )]
    UninferableId,

    #[error("inferred id is not a usable citekey")]
    InvalidInferredId(#[from] CiteKeyError),

    #[error("item still violates the CSL schema after pruning: {violations:?}")]
    Unrepairable { violations: Vec<String> },
}

/// One bibliographic record as a CSL-JSON mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CslItem {
    pub fields: Map<String, Value>,
}

impl CslItem {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Parse from any JSON value. Non-object values yield an empty item.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// Overwrite the `id` field unconditionally.
    pub fn set_id(&mut self, id: &str) {
        self.insert("id", Value::String(id.to_string()));
    }

    /// Remap `type` through the fixed substitution table that corrects
    /// common upstream vocabulary mismatches.
    pub fn correct_invalid_type(&mut self) {
        if let Some(current) = self.get_str("type") {
            if let Some((_, corrected)) = TYPE_MAP.iter().find(|(from, _)| *from == current) {
                self.insert("type", Value::String((*corrected).to_string()));
            }
        }
    }

    /// Ensure `type` is present, defaulting to the catch-all `"entry"`.
    pub fn set_default_type(&mut self) {
        if !self.fields.contains_key("type") {
            self.insert("type", Value::String("entry".to_string()));
        }
    }

    /// Detect and set a non-empty `id`, or fail.
    ///
    /// Sources in order: a legacy `standard_citation` field (consumed), a
    /// `standard_id` note entry, then the existing `id`. Citekey prefix
    /// inference happens later, when the id is parsed as a [`CiteKey`].
    pub fn infer_id(&mut self) -> Result<(), CslItemError> {
        if let Some(standard_citation) =
            self.get_str("standard_citation").filter(|v| !v.is_empty()).map(str::to_string)
        {
            self.fields.shift_remove("standard_citation");
            self.set_id(&standard_citation);
            return Ok(());
        }
        if let Some(standard_id) =
            self.note_dict().get("standard_id").filter(|v| !v.is_empty()).cloned()
        {
            self.set_id(&standard_id);
            return Ok(());
        }
        if self.id().map(|id| !id.is_empty()).unwrap_or(false) {
            return Ok(());
        }
        Err(CslItemError::UninferableId)
    }

    /// Infer an id, standardize it, and record the transformation in the
    /// `note` field so the original identifiers survive round trips.
    pub fn standardize_id(&mut self) -> Result<(), CslItemError> {
        let original_id = self.id().map(str::to_string);
        self.infer_id()?;
        let original_standard_id = self.id().map(str::to_string).unwrap_or_default();
        let citekey = CiteKey::new(&original_standard_id)?;
        let standard_id = citekey.standard_id().to_string();

        let note_dict = self.note_dict();
        let mut add_to_note: Vec<(String, String)> = Vec::new();
        if let Some(original_id) = original_id {
            if original_id != standard_id
                && note_dict.get("original_id") != Some(&original_id)
            {
                add_to_note.push(("original_id".to_string(), original_id));
            }
        }
        if original_standard_id != standard_id
            && note_dict.get("original_standard_id") != Some(&original_standard_id)
        {
            add_to_note.push(("original_standard_id".to_string(), original_standard_id));
        }
        if note_dict.get("standard_id") != Some(&standard_id) {
            add_to_note.push(("standard_id".to_string(), standard_id.clone()));
        }
        self.note_append_pairs(&add_to_note);
        self.set_id(&standard_id);
        Ok(())
    }

    /// Sanitize the item in place.
    ///
    /// Corrects the `type` vocabulary, optionally prunes schema-violating
    /// fields, and guarantees a `type` is present afterwards. With
    /// `prune` set, any violation surviving the repair loop is an error.
    pub fn clean(&mut self, prune: bool) -> Result<(), CslItemError> {
        self.correct_invalid_type();
        if prune {
            remove_schema_errors(self);
        }
        self.set_default_type();
        if prune {
            let violations = validate(self);
            if !violations.is_empty() {
                return Err(CslItemError::Unrepairable {
                    violations: violations.iter().map(|v| v.to_string()).collect(),
                });
            }
        }
        Ok(())
    }
}

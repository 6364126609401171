//! Note field "cheater syntax"
//!
//! The CSL `note` field doubles as a key-value side channel for metadata
//! the strict schema cannot carry, such as `standard_id` and `original_id`.
//! Two encodings coexist: whole lines of the form `key: value` and inline
//! braced entries `{:key: value}`. Keys are limited to `[A-Z]+` or
//! `[-_a-z]+`; values must not contain newlines.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::item::CslItem;

lazy_static! {
    static ref NOTE_KEY: Regex = Regex::new(r"^([A-Z]+|[-_a-z]+)$").unwrap();
    static ref BRACED_ENTRY: Regex =
        Regex::new(r"\{:([A-Z]+|[-_a-z]+): *(.+?) *\}").unwrap();
    static ref LINE_ENTRY: Regex =
        Regex::new(r"(?m)^([A-Z]+|[-_a-z]+): *(.+?) *$").unwrap();
}

impl CslItem {
    /// Current note text, empty when absent or not a string.
    pub fn note(&self) -> String {
        self.get_str("note").unwrap_or_default().to_string()
    }

    fn set_note(&mut self, note: String) {
        if note.is_empty() {
            self.fields.shift_remove("note");
        } else {
            self.insert("note", Value::String(note));
        }
    }

    /// Append text to the note on a fresh line.
    ///
    /// Lines already present verbatim are skipped, so repeated annotation
    /// passes do not grow the note.
    pub fn note_append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut note = self.note();
        for line in text.split('\n') {
            if note.split('\n').any(|existing| existing == line) {
                continue;
            }
            if !note.is_empty() && !note.ends_with('\n') {
                note.push('\n');
            }
            note.push_str(line);
        }
        self.set_note(note);
    }

    /// Append key-value pairs in line-based cheater syntax.
    ///
    /// Pairs with an out-of-charset key or a newline in the value are
    /// dropped with a warning rather than written corrupted.
    pub fn note_append_pairs(&mut self, pairs: &[(String, String)]) {
        for (key, value) in pairs {
            if !NOTE_KEY.is_match(key) {
                warn!(key, "skipping note entry: key outside [A-Z]+ or [-_a-z]+");
                continue;
            }
            if value.contains('\n') {
                warn!(key, "skipping note entry: value contains a newline");
                continue;
            }
            self.note_append_text(&format!("{key}: {value}"));
        }
    }

    /// Parse the note's cheater-syntax entries into a mapping.
    ///
    /// Both encodings are read; braced entries override line-based ones,
    /// and later same-key entries override earlier ones.
    pub fn note_dict(&self) -> HashMap<String, String> {
        let note = self.note();
        let mut entries = HashMap::new();
        for captures in LINE_ENTRY.captures_iter(&note) {
            entries.insert(captures[1].to_string(), captures[2].to_string());
        }
        for captures in BRACED_ENTRY.captures_iter(&note) {
            entries.insert(captures[1].to_string(), captures[2].to_string());
        }
        entries
    }
}

//! CSL date-parts conversion
//!
//! CSL encodes dates as `{"date-parts": [[year, month, day]]}` with the
//! month and day optional. These helpers convert between that form and
//! ISO-style `YYYY-MM-DD` strings, truncating rather than guessing when
//! precision is missing.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::item::CslItem;

lazy_static! {
    static ref ISO_DATE: Regex =
        Regex::new(r"^(?P<year>[0-9]{4})(-(?P<month>1[0-2]|0[1-9]))?(-(?P<day>[0-3][0-9]))?").unwrap();
}

/// Parse an ISO-style date string into CSL date parts.
///
/// Precision tracks the input: `"2019"` gives `[2019]`, `"2019-12"` gives
/// `[2019, 12]`. Returns `None` for unparseable input.
pub fn date_to_date_parts(date: &str) -> Option<Vec<i64>> {
    let captures = ISO_DATE.captures(date.trim())?;
    let mut date_parts = Vec::with_capacity(3);
    for part in ["year", "month", "day"] {
        match captures.name(part) {
            Some(value) => match value.as_str().parse::<i64>() {
                Ok(number) => date_parts.push(number),
                Err(_) => break,
            },
            None => break,
        }
    }
    if date_parts.is_empty() {
        None
    } else {
        Some(date_parts)
    }
}

/// Render CSL date parts as `YYYY`, `YYYY-MM`, or `YYYY-MM-DD`.
pub fn date_parts_to_string(date_parts: &[Value]) -> Option<String> {
    if date_parts.is_empty() {
        return None;
    }
    let widths = [4usize, 2, 2];
    let mut rendered = Vec::new();
    for (part, width) in date_parts.iter().take(3).zip(widths) {
        let number = match part {
            Value::Number(number) => number.as_i64()?,
            Value::String(text) => text.parse::<i64>().ok()?,
            _ => return None,
        };
        rendered.push(format!("{number:0width$}"));
    }
    Some(rendered.join("-"))
}

impl CslItem {
    /// Read a date variable (like `issued`) back as an ISO-style string.
    ///
    /// With `fill`, missing month and day default to 1, so partial dates
    /// still produce a full `YYYY-MM-DD`.
    pub fn get_date(&self, variable: &str, fill: bool) -> Option<String> {
        let date_parts = self
            .get(variable)?
            .get("date-parts")?
            .get(0)?
            .as_array()?;
        let mut date_parts = date_parts.clone();
        if fill {
            while date_parts.len() < 3 {
                date_parts.push(json!(1));
            }
        }
        date_parts_to_string(&date_parts)
    }

    /// Set a date variable (like `issued`) from an ISO-style string.
    /// Unparseable dates leave the item untouched.
    pub fn set_date(&mut self, variable: &str, date: &str) {
        if let Some(date_parts) = date_to_date_parts(date) {
            self.insert(variable, json!({ "date-parts": [date_parts] }));
        }
    }
}

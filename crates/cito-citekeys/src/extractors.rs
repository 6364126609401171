//! Citekey extraction from manuscript text

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Body of an @-citation: starts and ends on safe characters so trailing
    // punctuation like "@doi:10/abc." does not swallow the period.
    static ref CITEKEY_BODY: Regex =
        Regex::new(r"@([a-zA-Z0-9][\w:.#$%&\-+?<>~/]*[a-zA-Z0-9/])").unwrap();
}

/// Extract citekeys (without the `@` sigil) from free text, in order of
/// appearance, duplicates included.
///
/// A match only counts when the `@` is not preceded by a word character,
/// so email addresses like `user@example.com` are not citations.
pub fn extract_citekeys(text: &str) -> Vec<&str> {
    CITEKEY_BODY
        .captures_iter(text)
        .filter(|captures| {
            let at_offset = captures.get(0).map(|m| m.start()).unwrap_or(0);
            !text[..at_offset]
                .chars()
                .next_back()
                .map(|ch| ch.is_alphanumeric() || ch == '_')
                .unwrap_or(false)
        })
        .filter_map(|captures| captures.get(1).map(|m| m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_citekeys() {
        let text = "As shown previously [@doi:10.7717/peerj.705; @pmid:24159271], \
                    and in @arxiv:1407.3561v1.";
        assert_eq!(
            extract_citekeys(text),
            vec!["doi:10.7717/peerj.705", "pmid:24159271", "arxiv:1407.3561v1"]
        );
    }

    #[test]
    fn test_emails_not_extracted() {
        assert_eq!(extract_citekeys("contact user@example.com for info"), Vec::<&str>::new());
    }

    #[test]
    fn test_trailing_punctuation_excluded() {
        assert_eq!(extract_citekeys("see @doi:10.1038/nbt.3780."), vec!["doi:10.1038/nbt.3780"]);
    }

    #[test]
    fn test_duplicates_and_order_preserved() {
        let text = "@tag:a then @tag:b then @tag:a again";
        assert_eq!(extract_citekeys(text), vec!["tag:a", "tag:b", "tag:a"]);
    }
}

//! Flat string encoding of the promise tree
//!
//! Older data stores each promise as a single row with two packed fields:
//!
//! - title field: `<Category>¦<PromiseTitle>`
//! - reference field: `<Title>§<Subtitle>§<ScriptureReference>`
//!
//! Both separators are single characters, so a value that does not contain
//! one can never run into the separator next to it.
//!
//! The database no longer uses this layout, but import/export still speaks
//! it. Decoders are total: malformed input decodes to empty components and
//! never fails.

use thiserror::Error;

use crate::models::NodeKind;

/// Separates category from promise title in the title field
pub const TITLE_SEPARATOR: &str = "¦";

/// Separates title, subtitle and scripture in the reference field
pub const REFERENCE_SEPARATOR: &str = "§";

/// A value that cannot be packed without corrupting the tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} '{value}' contains reserved separator '{separator}'")]
pub struct EncodingError {
    pub field: &'static str,
    pub value: String,
    pub separator: &'static str,
}

/// Rejections of user-entered names and labels
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} name cannot be blank")]
    Blank(NodeKind),

    #[error("{kind} '{name}' already exists")]
    Duplicate { kind: NodeKind, name: String },

    #[error("{kind} '{value}' contains reserved characters '{separator}'")]
    ReservedSeparator {
        kind: NodeKind,
        value: String,
        separator: &'static str,
    },

    #[error("missing {0}: select or create it first")]
    MissingAncestor(NodeKind),

    #[error("{0} does not belong to the current selection")]
    OutsideSelection(NodeKind),

    #[error("verse text cannot be blank")]
    BlankVerse,
}

fn reject_separator(
    field: &'static str,
    value: &str,
    separator: &'static str,
) -> Result<(), EncodingError> {
    if value.contains(separator) {
        return Err(EncodingError {
            field,
            value: value.to_string(),
            separator,
        });
    }
    Ok(())
}

/// Pack category and promise title into a title field
pub fn encode_title(category: &str, promise_title: &str) -> Result<String, EncodingError> {
    reject_separator("category", category, TITLE_SEPARATOR)?;
    reject_separator("promise title", promise_title, TITLE_SEPARATOR)?;
    Ok(format!("{category}{TITLE_SEPARATOR}{promise_title}"))
}

/// Split a title field into (category, promise title)
///
/// Without a separator the whole string is the category.
pub fn decode_title(encoded: &str) -> (String, String) {
    match encoded.split_once(TITLE_SEPARATOR) {
        Some((category, promise_title)) => (category.to_string(), promise_title.to_string()),
        None => (encoded.to_string(), String::new()),
    }
}

/// Pack title, subtitle and scripture into a reference field
pub fn encode_reference(
    title: &str,
    subtitle: &str,
    scripture: &str,
) -> Result<String, EncodingError> {
    reject_separator("title", title, REFERENCE_SEPARATOR)?;
    reject_separator("subtitle", subtitle, REFERENCE_SEPARATOR)?;
    reject_separator("scripture", scripture, REFERENCE_SEPARATOR)?;
    Ok([title, subtitle, scripture].join(REFERENCE_SEPARATOR))
}

/// Split a reference field into (title, subtitle, scripture)
///
/// Anything after the second separator stays in scripture. Missing parts
/// are empty.
pub fn decode_reference(encoded: &str) -> (String, String, String) {
    let mut parts = encoded.splitn(3, REFERENCE_SEPARATOR);
    let title = parts.next().unwrap_or_default().to_string();
    let subtitle = parts.next().unwrap_or_default().to_string();
    let scripture = parts.next().unwrap_or_default().to_string();
    (title, subtitle, scripture)
}

/// Validate a category, title or subtitle name and return it trimmed
pub fn check_name(kind: NodeKind, name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(kind));
    }
    check_reserved(kind, trimmed)?;
    Ok(trimmed.to_string())
}

/// Key used to compare names and search text ignoring case
///
/// Uses Unicode lowercasing, so accented letters fold as well as ASCII.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

/// Reject a value that contains either separator
pub fn check_reserved(kind: NodeKind, value: &str) -> Result<(), ValidationError> {
    for separator in [TITLE_SEPARATOR, REFERENCE_SEPARATOR] {
        if value.contains(separator) {
            return Err(ValidationError::ReservedSeparator {
                kind,
                value: value.to_string(),
                separator,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_round_trip() {
        let samples = [
            ("Faith", "Courage"),
            ("", ""),
            ("Hope", ""),
            ("", "Untitled"),
            ("Peace | Rest", "a|b"),
            ("ends with |", "|starts with"),
            ("Ünïcödé", "日本語"),
        ];
        for (category, promise_title) in samples {
            let encoded = encode_title(category, promise_title).unwrap();
            assert_eq!(
                decode_title(&encoded),
                (category.to_string(), promise_title.to_string())
            );
        }
    }

    #[test]
    fn test_reference_round_trip() {
        let samples = [
            ("Strength", "Daily", "Josh 1:9"),
            ("", "", ""),
            ("Strength", "", "Ps 23:1"),
            ("#tag", "one # two", "Prov 3:5-6"),
            ("ends #", "#", "##"),
        ];
        for (title, subtitle, scripture) in samples {
            let encoded = encode_reference(title, subtitle, scripture).unwrap();
            assert_eq!(
                decode_reference(&encoded),
                (title.to_string(), subtitle.to_string(), scripture.to_string())
            );
        }
    }

    #[test]
    fn test_encode_rejects_separator() {
        let err = encode_title("Fa¦ith", "Courage").unwrap_err();
        assert_eq!(err.field, "category");
        assert!(encode_title("Faith", "Cou¦rage").is_err());
        assert!(encode_reference("A§B", "C", "D").is_err());
        assert!(encode_reference("A", "B", "Josh§1").is_err());
    }

    #[test]
    fn test_decode_title_without_separator() {
        assert_eq!(
            decode_title("Faith"),
            ("Faith".to_string(), String::new())
        );
    }

    #[test]
    fn test_decode_title_splits_on_first_separator() {
        assert_eq!(
            decode_title("Faith¦Courage¦Again"),
            ("Faith".to_string(), "Courage¦Again".to_string())
        );
    }

    #[test]
    fn test_decode_reference_merges_trailing_parts() {
        assert_eq!(
            decode_reference("Strength§Daily§Josh 1:9§extra"),
            (
                "Strength".to_string(),
                "Daily".to_string(),
                "Josh 1:9§extra".to_string()
            )
        );
    }

    #[test]
    fn test_decode_reference_missing_parts() {
        assert_eq!(
            decode_reference("Strength"),
            ("Strength".to_string(), String::new(), String::new())
        );
        assert_eq!(
            decode_reference("Strength§Daily"),
            ("Strength".to_string(), "Daily".to_string(), String::new())
        );
        assert_eq!(decode_reference(""), (String::new(), String::new(), String::new()));
    }

    #[test]
    fn test_check_name() {
        assert_eq!(check_name(NodeKind::Category, "  Faith ").unwrap(), "Faith");
        assert_eq!(
            check_name(NodeKind::Title, "   "),
            Err(ValidationError::Blank(NodeKind::Title))
        );
        assert!(matches!(
            check_name(NodeKind::Subtitle, "Morning§Evening"),
            Err(ValidationError::ReservedSeparator { separator: "§", .. })
        ));
        assert!(matches!(
            check_name(NodeKind::Category, "a¦b"),
            Err(ValidationError::ReservedSeparator { separator: "¦", .. })
        ));
    }

    #[test]
    fn test_fold_case_handles_accents() {
        assert_eq!(fold_case("Émunah"), fold_case("émunah"));
        assert_eq!(fold_case("ÉTERNEL"), "éternel");
        assert_eq!(fold_case("Faith"), "faith");
    }
}

//! Text field validation shared by every catalog entity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Column width used by every short text column of the catalog.
pub const SHORT_TEXT_MAX: usize = 255;

/// Validate a required, length-bounded text field.
///
/// Surrounding whitespace is trimmed; a value that is empty after trimming is
/// rejected with the `blank` code.
pub fn required_text(field: &'static str, value: &str, max_len: usize) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::field(field, "blank", "This field cannot be blank."));
    }
    check_length(field, value, max_len)?;
    Ok(value.to_string())
}

/// Validate an optional, length-bounded text field. Blank input becomes `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            check_length(field, v, max_len)?;
            Ok(Some(v.to_string()))
        }
    }
}

fn check_length(field: &'static str, value: &str, max_len: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len > max_len {
        return Err(DomainError::field(
            field,
            "max_length",
            format!("Ensure this value has at most {max_len} characters (it has {len})."),
        ));
    }
    Ok(())
}

/// URL-safe identifier: ASCII letters, digits, underscores and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Validate `value` as a slug for the `slug` field.
    pub fn parse(value: &str) -> DomainResult<Self> {
        Self::parse_field("slug", value)
    }

    pub fn parse_field(field: &'static str, value: &str) -> DomainResult<Self> {
        let value = required_text(field, value, SHORT_TEXT_MAX)?;
        let valid = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(DomainError::field(
                field,
                "invalid",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            ));
        }
        Ok(Self(value))
    }

    /// Derive a slug from free text ("Men's Shoes" → "mens-shoes").
    ///
    /// Non-ASCII characters and punctuation are dropped, runs of whitespace and
    /// hyphens collapse into one hyphen. Fails when nothing usable remains.
    pub fn slugify(field: &'static str, text: &str) -> DomainResult<Self> {
        let mut out = String::with_capacity(text.len());
        let mut pending_dash = false;

        for c in text.chars() {
            if c.is_ascii_alphanumeric() || c == '_' {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(c.to_ascii_lowercase());
            } else if c.is_whitespace() || c == '-' {
                pending_dash = true;
            }
        }

        let trimmed: String = out.chars().take(SHORT_TEXT_MAX).collect();
        let trimmed = trimmed.trim_end_matches(['-', '_']);
        Self::parse_field(field, trimmed)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Slug {}

impl core::fmt::Display for Slug {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("name", "  Shoes ", 255).unwrap(), "Shoes");

        let err = required_text("name", "   ", 255).unwrap_err();
        match err {
            DomainError::InvalidField(f) => {
                assert_eq!(f.field, "name");
                assert_eq!(f.code, "blank");
            }
            other => panic!("expected InvalidField, got {other:?}"),
        }
    }

    #[test]
    fn required_text_counts_characters_not_bytes() {
        let accented = "é".repeat(255);
        assert!(required_text("name", &accented, 255).is_ok());

        let err = required_text("name", &"a".repeat(256), 255).unwrap_err();
        match err {
            DomainError::InvalidField(f) => assert_eq!(f.code, "max_length"),
            other => panic!("expected InvalidField, got {other:?}"),
        }
    }

    #[test]
    fn optional_text_maps_blank_to_none() {
        assert_eq!(optional_text("alt_text", None, 255).unwrap(), None);
        assert_eq!(optional_text("alt_text", Some("  "), 255).unwrap(), None);
        assert_eq!(
            optional_text("alt_text", Some("front view"), 255).unwrap(),
            Some("front view".to_string())
        );
    }

    #[test]
    fn slug_rejects_spaces_and_punctuation() {
        assert!(Slug::parse("running-shoes_2").is_ok());
        assert!(Slug::parse("running shoes").is_err());
        assert!(Slug::parse("shoes/boots").is_err());
        assert!(Slug::parse("").is_err());
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(Slug::slugify("slug", "Men's  Running - Shoes").unwrap().as_str(), "mens-running-shoes");
        assert_eq!(Slug::slugify("slug", "  Café Latte ").unwrap().as_str(), "caf-latte");
    }

    #[test]
    fn slugify_fails_when_nothing_usable_remains() {
        assert!(Slug::slugify("slug", "!!!").is_err());
    }
}

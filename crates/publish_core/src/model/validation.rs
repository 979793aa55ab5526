//! Field validation rules shared by model inputs.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub const TITLE_MIN_CHARS: usize = 10;
pub const TITLE_MAX_CHARS: usize = 100;
pub const AUTHOR_MAX_CHARS: usize = 100;
pub const REFERENCE_MAX_CHARS: usize = 5000;
pub const TAG_NAME_MAX_CHARS: usize = 100;
pub const TAG_COLOR_MAX_CHARS: usize = 20;

/// Input rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    TitleTooShort { min: usize, actual: usize },
    TitleTooLong { max: usize, actual: usize },
    EmptyField(&'static str),
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    MalformedId { field: &'static str, value: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleTooShort { min, actual } => write!(
                f,
                "title must have at least {min} characters, got {actual}"
            ),
            Self::TitleTooLong { max, actual } => {
                write!(f, "title must have at most {max} characters, got {actual}")
            }
            Self::EmptyField(field) => write!(f, "`{field}` cannot be empty"),
            Self::FieldTooLong { field, max, actual } => write!(
                f,
                "`{field}` must have at most {max} characters, got {actual}"
            ),
            Self::MalformedId { field, value } => {
                write!(f, "`{field}` value `{value}` is not a valid UUID")
            }
        }
    }
}

impl Error for ValidationError {}

/// Checks the article title length in characters (not bytes).
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let actual = title.chars().count();
    if actual < TITLE_MIN_CHARS {
        return Err(ValidationError::TitleTooShort {
            min: TITLE_MIN_CHARS,
            actual,
        });
    }
    if actual > TITLE_MAX_CHARS {
        return Err(ValidationError::TitleTooLong {
            max: TITLE_MAX_CHARS,
            actual,
        });
    }
    Ok(())
}

pub fn validate_required(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    validate_max_len(field, value, max)
}

pub fn validate_max_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::FieldTooLong { field, max, actual });
    }
    Ok(())
}

/// Parses a caller-supplied identifier, naming the offending field on error.
pub fn parse_id(field: &'static str, value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value.trim()).map_err(|_| ValidationError::MalformedId {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_length_counts_characters_not_bytes() {
        // 10 characters, 20 bytes.
        assert!(validate_title("ññññññññññ").is_ok());
        assert_eq!(
            validate_title("ñññññññññ"),
            Err(ValidationError::TitleTooShort { min: 10, actual: 9 })
        );
    }

    #[test]
    fn required_rejects_whitespace_only() {
        assert_eq!(
            validate_required("color", "   ", TAG_COLOR_MAX_CHARS),
            Err(ValidationError::EmptyField("color"))
        );
    }

    #[test]
    fn parse_id_reports_field_name() {
        let err = parse_id("article_id", "not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("article_id"));
    }
}

//! Article domain model.
//!
//! # Invariants
//! - `title` has 10..=100 characters.
//! - `slug` is derived once from the title at creation and never changes.
//! - `updated_at` never moves backwards.

use crate::model::tag::TagSummary;
use crate::model::validation::{
    validate_max_len, validate_required, validate_title, ValidationError, AUTHOR_MAX_CHARS,
    REFERENCE_MAX_CHARS,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

static SLUG_STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_\s-]").expect("valid slug strip regex"));
static SLUG_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-\s]+").expect("valid slug separator regex"));

pub type ArticleId = Uuid;

/// Persisted article row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    /// URL slug fixed at creation.
    pub slug: String,
    pub author: String,
    pub body: String,
    pub is_active: bool,
    /// Link to an externally stored document; empty when unset.
    pub document: String,
    /// Link to an externally stored image; empty when unset.
    pub image: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Article read model with its confirmed tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(flatten)]
    pub article: Article,
    /// Tags whose association has `saved = true`, sorted by name.
    pub tags: Vec<TagSummary>,
}

/// Input for article creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub author: String,
    pub body: String,
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub image: String,
}

impl NewArticle {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_required("author", &self.author, AUTHOR_MAX_CHARS)?;
        validate_max_len("document", &self.document, REFERENCE_MAX_CHARS)?;
        validate_max_len("image", &self.image, REFERENCE_MAX_CHARS)?;
        Ok(())
    }
}

/// Partial article update. `None` leaves the stored value untouched.
///
/// `slug` is deliberately absent: it is fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub body: Option<String>,
    pub is_active: Option<bool>,
    pub document: Option<String>,
    pub image: Option<String>,
}

impl ArticlePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = self.title.as_deref() {
            validate_title(title)?;
        }
        if let Some(author) = self.author.as_deref() {
            validate_required("author", author, AUTHOR_MAX_CHARS)?;
        }
        if let Some(document) = self.document.as_deref() {
            validate_max_len("document", document, REFERENCE_MAX_CHARS)?;
        }
        if let Some(image) = self.image.as_deref() {
            validate_max_len("image", image, REFERENCE_MAX_CHARS)?;
        }
        Ok(())
    }
}

/// Derives a URL slug from an article title.
///
/// Decomposes to NFKD and drops non-ASCII code points, so accented
/// letters keep their base letter (`ó` -> `o`). Keeps ASCII alphanumerics,
/// `_` and `-`; whitespace/hyphen runs collapse into one `-`. Returns an
/// empty string when nothing survives.
pub fn slugify(title: &str) -> String {
    let ascii: String = title.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_ascii_lowercase();
    let stripped = SLUG_STRIP_RE.replace_all(&lowered, "");
    let joined = SLUG_SEPARATOR_RE.replace_all(stripped.trim(), "-");
    joined.trim_matches(|ch| ch == '-' || ch == '_').to_string()
}

/// Slug assigned to a new article: the title slug, or the id when the
/// title has no sluggable characters.
pub fn slug_for(id: ArticleId, title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        id.simple().to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators_and_strips_symbols() {
        assert_eq!(slugify("  Hello,  World -- Again! "), "hello-world-again");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
        assert_eq!(slugify("-_edge_-"), "edge");
    }

    #[test]
    fn slugify_transliterates_accented_letters() {
        assert_eq!(slugify("Introducción al diseño"), "introduccion-al-diseno");
        assert_eq!(slugify("Ángela y la ＲＵＳＴ ﬁesta"), "angela-y-la-rust-fiesta");
    }

    #[test]
    fn slug_falls_back_to_id_for_unsluggable_titles() {
        let id = Uuid::new_v4();
        assert_eq!(slug_for(id, "¿¿¿¿¿¿¿¿¿¿"), id.simple().to_string());
    }

    #[test]
    fn new_article_requires_ten_character_title() {
        let mut input = NewArticle {
            title: "123456789".to_string(),
            author: "ana".to_string(),
            body: "body".to_string(),
            ..NewArticle::default()
        };
        assert!(matches!(
            input.validate(),
            Err(ValidationError::TitleTooShort { actual: 9, .. })
        ));

        input.title = "1234567890".to_string();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn patch_only_validates_present_fields() {
        let patch = ArticlePatch {
            body: Some(String::new()),
            ..ArticlePatch::default()
        };
        assert!(patch.validate().is_ok());

        let patch = ArticlePatch {
            title: Some("short".to_string()),
            ..ArticlePatch::default()
        };
        assert!(patch.validate().is_err());
    }
}

//! Tag domain model.
//!
//! # Invariants
//! - `name` is trimmed, non-empty and globally unique (case-sensitive).
//! - Tags are deactivated, never reactivated.

use crate::model::association::Association;
use crate::model::validation::{
    validate_required, ValidationError, TAG_COLOR_MAX_CHARS, TAG_NAME_MAX_CHARS,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TagId = Uuid;

/// Persisted tag row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Short display color, e.g. `#1e90ff`.
    pub color: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Tag read model with every association that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    #[serde(flatten)]
    pub tag: Tag,
    pub associations: Vec<Association>,
}

/// Compact tag projection embedded in article read models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub is_active: bool,
}

/// Input for tag creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
}

impl NewTag {
    /// Trims `name`/`color` and validates them.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let normalized = Self {
            name: self.name.trim().to_string(),
            color: self.color.trim().to_string(),
        };
        validate_required("name", &normalized.name, TAG_NAME_MAX_CHARS)?;
        validate_required("color", &normalized.color, TAG_COLOR_MAX_CHARS)?;
        Ok(normalized)
    }
}

/// Partial tag update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl TagPatch {
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let normalized = Self {
            name: self.name.as_deref().map(|value| value.trim().to_string()),
            color: self.color.as_deref().map(|value| value.trim().to_string()),
        };
        if let Some(name) = normalized.name.as_deref() {
            validate_required("name", name, TAG_NAME_MAX_CHARS)?;
        }
        if let Some(color) = normalized.color.as_deref() {
            validate_required("color", color, TAG_COLOR_MAX_CHARS)?;
        }
        Ok(normalized)
    }
}

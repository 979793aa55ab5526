//! Article-tag association model.
//!
//! # Invariants
//! - At most one association exists per `(article_id, tag_id)` pair.
//! - `saved` marks the tag as confirmed on the article; unconfirmed rows
//!   still count for tag filtering.

use crate::model::article::ArticleId;
use crate::model::tag::TagId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AssociationId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub id: AssociationId,
    pub article_id: ArticleId,
    pub tag_id: TagId,
    pub saved: bool,
}

/// Result of a `saved` flag update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedUpdate {
    /// Association state after the update.
    pub association: Association,
    /// `true` when the association row did not exist before the call.
    pub created: bool,
    /// `true` when the `saved` column was actually rewritten.
    pub written: bool,
}

//! Association manager use-cases.
//!
//! # Responsibility
//! - Expose read-path lookups that fail on a missing association.
//! - Expose patch-path operations that create the association on first use.
//!
//! # Invariants
//! - Only `ensure_association(.., true)` and `set_saved` may create rows, and
//!   they create them unconfirmed (`saved = false`).
//! - Manual attachment of an existing pair is a `Conflict`.

use crate::model::article::ArticleId;
use crate::model::association::{Association, SavedUpdate};
use crate::model::tag::TagId;
use crate::repo::association_repo::AssociationRepository;
use crate::repo::RepoResult;
use log::{info, warn};

pub struct AssociationService<R: AssociationRepository> {
    repo: R,
}

impl<R: AssociationRepository> AssociationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Looks up the pair's association, creating it only when
    /// `create_if_missing` is set.
    pub fn ensure_association(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
        create_if_missing: bool,
    ) -> RepoResult<Association> {
        self.repo.ensure_association(article_id, tag_id, create_if_missing)
    }

    /// Read path: a missing association is `AssociationNotFound`.
    pub fn get_association(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
    ) -> RepoResult<Association> {
        self.ensure_association(article_id, tag_id, false)
    }

    /// Patch path: a missing association is created unconfirmed.
    pub fn get_or_create_association(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
    ) -> RepoResult<Association> {
        self.ensure_association(article_id, tag_id, true)
    }

    /// Sets the `saved` flag, creating the association first when needed.
    ///
    /// Repeating a call with the same value performs no write.
    pub fn set_saved(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
        saved: bool,
    ) -> RepoResult<SavedUpdate> {
        match self.repo.set_saved(article_id, tag_id, saved) {
            Ok(update) => {
                info!(
                    "event=association_patch module=association status=ok association_id={} created={} written={}",
                    update.association.id, update.created, update.written
                );
                Ok(update)
            }
            Err(err) => {
                warn!(
                    "event=association_patch module=association status=error article_id={article_id} tag_id={tag_id} error_kind={:?}",
                    err.kind()
                );
                Err(err)
            }
        }
    }

    /// Attaches a tag to an article as confirmed.
    pub fn attach_tag(&self, article_id: ArticleId, tag_id: TagId) -> RepoResult<Association> {
        let association = self.repo.create_association(article_id, tag_id, true)?;
        info!(
            "event=association_create module=association status=ok association_id={}",
            association.id
        );
        Ok(association)
    }

    pub fn list_for_article(
        &self,
        article_id: ArticleId,
        saved_only: bool,
    ) -> RepoResult<Vec<Association>> {
        self.repo.list_for_article(article_id, saved_only)
    }

    pub fn list_for_tag(&self, tag_id: TagId) -> RepoResult<Vec<Association>> {
        self.repo.list_for_tag(tag_id)
    }
}

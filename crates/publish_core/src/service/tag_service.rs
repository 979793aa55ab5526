//! Tag use-cases.

use crate::model::tag::{NewTag, Tag, TagId, TagPatch, TagRecord};
use crate::repo::tag_repo::TagRepository;
use crate::repo::{RepoError, RepoResult};
use log::info;

pub struct TagService<R: TagRepository> {
    repo: R,
}

impl<R: TagRepository> TagService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a tag; a taken name fails with `Conflict`.
    pub fn create_tag(&self, input: &NewTag) -> RepoResult<Tag> {
        let tag = self.repo.create_tag(input)?;
        info!("event=tag_create module=tag status=ok tag_id={}", tag.id);
        Ok(tag)
    }

    pub fn update_tag(&self, id: TagId, patch: &TagPatch) -> RepoResult<Tag> {
        let tag = self.repo.update_tag(id, patch)?;
        info!("event=tag_update module=tag status=ok tag_id={id}");
        Ok(tag)
    }

    pub fn get_tag(&self, id: TagId) -> RepoResult<TagRecord> {
        self.repo.get_tag(id)?.ok_or(RepoError::TagNotFound(id))
    }

    pub fn list_tags(&self, include_inactive: bool) -> RepoResult<Vec<TagRecord>> {
        self.repo.list_tags(include_inactive)
    }

    /// Deactivates the tag. There is no reactivation path.
    pub fn deactivate_tag(&self, id: TagId) -> RepoResult<()> {
        self.repo.deactivate_tag(id)?;
        info!("event=tag_deactivate module=tag status=ok tag_id={id}");
        Ok(())
    }
}

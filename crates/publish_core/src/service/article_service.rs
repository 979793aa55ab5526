//! Article use-cases and the listing/filter facade.
//!
//! # Invariants
//! - `list_articles` never writes: the tag filter and the listing run in one
//!   read snapshot.
//! - Title, author and tag filters combine with AND; absent or empty filters
//!   impose no constraint.

use crate::model::article::{ArticleId, ArticlePatch, ArticleRecord, NewArticle};
use crate::repo::article_repo::{ArticleListQuery, ArticleOrder, ArticleRepository};
use crate::repo::{RepoError, RepoResult};
use crate::search::tag_query::{resolve_tag_filter, TagQuerySource};
use log::info;

/// Listing filters as received from the outer layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    /// Case-insensitive title substring.
    pub title: Option<String>,
    /// Case-insensitive author substring.
    pub author: Option<String>,
    /// Comma-separated tag names.
    pub tags: Option<String>,
    pub include_inactive: bool,
    pub order: ArticleOrder,
}

/// Article service over an article repository and a tag-query source.
pub struct ArticleService<A: ArticleRepository, Q: TagQuerySource> {
    articles: A,
    tags: Q,
}

impl<A: ArticleRepository, Q: TagQuerySource> ArticleService<A, Q> {
    pub fn new(articles: A, tags: Q) -> Self {
        Self { articles, tags }
    }

    pub fn create_article(&self, input: &NewArticle) -> RepoResult<ArticleRecord> {
        let record = self.articles.create_article(input)?;
        info!(
            "event=article_create module=article status=ok article_id={}",
            record.article.id
        );
        Ok(record)
    }

    /// Applies a partial update. Setting `is_active` is the only way back
    /// from deactivation.
    pub fn update_article(
        &self,
        id: ArticleId,
        patch: &ArticlePatch,
    ) -> RepoResult<ArticleRecord> {
        let record = self.articles.update_article(id, patch)?;
        info!("event=article_update module=article status=ok article_id={id}");
        Ok(record)
    }

    /// Detail lookup; inactive articles remain reachable by id.
    pub fn get_article(&self, id: ArticleId) -> RepoResult<ArticleRecord> {
        self.articles
            .get_article(id, true)?
            .ok_or(RepoError::ArticleNotFound(id))
    }

    /// Public lookup by slug; inactive articles are hidden.
    pub fn get_article_by_slug(&self, slug: &str) -> RepoResult<Option<ArticleRecord>> {
        self.articles.get_article_by_slug(slug, false)
    }

    pub fn deactivate_article(&self, id: ArticleId) -> RepoResult<()> {
        self.articles.deactivate_article(id)?;
        info!("event=article_deactivate module=article status=ok article_id={id}");
        Ok(())
    }

    /// Lists articles matching every supplied filter.
    pub fn list_articles(&self, filter: &ArticleFilter) -> RepoResult<Vec<ArticleRecord>> {
        self.articles.read_snapshot(|articles| {
            let article_ids = match filter.tags.as_deref() {
                Some(raw) => resolve_tag_filter(&self.tags, raw)?,
                None => None,
            };
            let query = ArticleListQuery {
                title_contains: filter.title.clone(),
                author_contains: filter.author.clone(),
                article_ids,
                include_inactive: filter.include_inactive,
                order: filter.order,
            };
            articles.list_articles(&query)
        })
    }
}

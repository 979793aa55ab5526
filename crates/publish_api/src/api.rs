//! Use-case API consumed by the HTTP layer.
//!
//! # Responsibility
//! - Expose one method per article/tag/association use case.
//! - Accept string ids and serde request bodies; return serde responses.
//! - Classify failures into an [`ErrorKind`] the transport maps to a status.
//!
//! # Invariants
//! - Every call opens its own migrated connection and never panics.
//! - Malformed ids fail as `Validation` before any storage access.

use crate::config::ApiConfig;
use log::warn;
use publish_core::db::open_db;
use publish_core::model::validation::parse_id;
use publish_core::{
    init_logging, Article, ArticleFilter, ArticleId, ArticleOrder, ArticlePatch, ArticleRecord,
    ArticleService, Association, AssociationService, ErrorKind, LoggingError, NewArticle, NewTag,
    RepoError, RepoResult, SqliteArticleRepository, SqliteAssociationRepository,
    SqliteTagRepository, Tag, TagId, TagPatch, TagRecord, TagService, TagSummary,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CreateArticleRequest = NewArticle;
pub type UpdateArticleRequest = ArticlePatch;
pub type CreateTagRequest = NewTag;
pub type UpdateTagRequest = TagPatch;

/// Query parameters of the article listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListArticlesRequest {
    /// Case-insensitive title substring.
    pub title: Option<String>,
    /// Case-insensitive author substring.
    pub author: Option<String>,
    /// Comma-separated tag names.
    pub tag: Option<String>,
    /// `created_at|title|author`, `-` prefix for descending.
    pub ordering: Option<String>,
}

/// Body of an association patch. A missing `saved` only ensures the row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PatchAssociationRequest {
    #[serde(default)]
    pub saved: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSummaryResponse {
    pub id: String,
    pub name: String,
    pub color: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub body: String,
    pub is_active: bool,
    pub document: String,
    pub image: String,
    pub created_at: i64,
    pub updated_at: i64,
    /// Confirmed tags only.
    pub tags: Vec<TagSummaryResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociationResponse {
    pub id: String,
    pub article_id: String,
    pub tag_id: String,
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    pub color: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// Every association of the tag, confirmed or not. Empty for freshly
    /// created or updated tags.
    pub details: Vec<AssociationResponse>,
}

/// Failure returned by every API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    /// Stable snake_case label of [`ApiError::kind`].
    pub fn code(&self) -> &'static str {
        match self.kind {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Storage => "storage",
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl Error for ApiError {}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        Self {
            kind: value.kind(),
            message: value.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Entry point bound to one configuration.
#[derive(Debug, Clone)]
pub struct PublishApi {
    config: ApiConfig,
}

impl PublishApi {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    /// Builds the API from `PUBLISH_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(ApiConfig::from_env())
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns `false` when no directory is configured.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        match self.config.log_dir.as_deref() {
            Some(dir) => init_logging(&self.config.log_level, dir).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn list_articles(&self, request: &ListArticlesRequest) -> ApiResult<Vec<ArticleResponse>> {
        let filter = ArticleFilter {
            title: request.title.clone(),
            author: request.author.clone(),
            tags: request.tag.clone(),
            include_inactive: false,
            order: parse_ordering(request.ordering.as_deref()),
        };
        self.run("list_articles", |conn| {
            article_service(conn)?.list_articles(&filter)
        })
        .map(|records| records.into_iter().map(to_article_response).collect())
    }

    pub fn get_article(&self, article_id: &str) -> ApiResult<ArticleResponse> {
        let id = parse_id("article_id", article_id).map_err(RepoError::from)?;
        self.run("get_article", |conn| article_service(conn)?.get_article(id))
            .map(to_article_response)
    }

    pub fn create_article(&self, request: &CreateArticleRequest) -> ApiResult<ArticleResponse> {
        self.run("create_article", |conn| {
            article_service(conn)?.create_article(request)
        })
        .map(to_article_response)
    }

    pub fn update_article(
        &self,
        article_id: &str,
        request: &UpdateArticleRequest,
    ) -> ApiResult<ArticleResponse> {
        let id = parse_id("article_id", article_id).map_err(RepoError::from)?;
        self.run("update_article", |conn| {
            article_service(conn)?.update_article(id, request)
        })
        .map(to_article_response)
    }

    /// Soft delete; the row and its associations remain.
    pub fn deactivate_article(&self, article_id: &str) -> ApiResult<()> {
        let id = parse_id("article_id", article_id).map_err(RepoError::from)?;
        self.run("deactivate_article", |conn| {
            article_service(conn)?.deactivate_article(id)
        })
    }

    /// Tags sorted by name, each with its associations. The public tag
    /// listing passes `include_inactive = true`, showing deactivated tags too.
    pub fn list_tags(&self, include_inactive: bool) -> ApiResult<Vec<TagResponse>> {
        self.run("list_tags", |conn| {
            tag_service(conn)?.list_tags(include_inactive)
        })
            .map(|records| records.into_iter().map(to_tag_record_response).collect())
    }

    pub fn get_tag(&self, tag_id: &str) -> ApiResult<TagResponse> {
        let id = parse_id("tag_id", tag_id).map_err(RepoError::from)?;
        self.run("get_tag", |conn| tag_service(conn)?.get_tag(id))
            .map(to_tag_record_response)
    }

    pub fn create_tag(&self, request: &CreateTagRequest) -> ApiResult<TagResponse> {
        self.run("create_tag", |conn| tag_service(conn)?.create_tag(request))
            .map(to_tag_response)
    }

    pub fn update_tag(&self, tag_id: &str, request: &UpdateTagRequest) -> ApiResult<TagResponse> {
        let id = parse_id("tag_id", tag_id).map_err(RepoError::from)?;
        self.run("update_tag", |conn| tag_service(conn)?.update_tag(id, request))
            .map(to_tag_response)
    }

    pub fn deactivate_tag(&self, tag_id: &str) -> ApiResult<()> {
        let id = parse_id("tag_id", tag_id).map_err(RepoError::from)?;
        self.run("deactivate_tag", |conn| tag_service(conn)?.deactivate_tag(id))
    }

    /// Read path: a missing association is `NotFound`.
    pub fn get_association(
        &self,
        article_id: &str,
        tag_id: &str,
    ) -> ApiResult<AssociationResponse> {
        let (article_id, tag_id) = parse_pair(article_id, tag_id)?;
        self.run("get_association", |conn| {
            association_service(conn)?.get_association(article_id, tag_id)
        })
        .map(to_association_response)
    }

    /// Patch path lookup: creates the association unconfirmed when absent.
    pub fn get_or_create_association(
        &self,
        article_id: &str,
        tag_id: &str,
    ) -> ApiResult<AssociationResponse> {
        let (article_id, tag_id) = parse_pair(article_id, tag_id)?;
        self.run("get_or_create_association", |conn| {
            association_service(conn)?.get_or_create_association(article_id, tag_id)
        })
        .map(to_association_response)
    }

    /// Applies an association patch, creating the association first when
    /// the pair was never linked.
    pub fn set_association_saved(
        &self,
        article_id: &str,
        tag_id: &str,
        request: &PatchAssociationRequest,
    ) -> ApiResult<AssociationResponse> {
        let (article_id, tag_id) = parse_pair(article_id, tag_id)?;
        self.run("set_association_saved", |conn| {
            let service = association_service(conn)?;
            match request.saved {
                Some(saved) => Ok(service.set_saved(article_id, tag_id, saved)?.association),
                None => service.get_or_create_association(article_id, tag_id),
            }
        })
        .map(to_association_response)
    }

    /// Resolves a comma-separated tag filter to article ids.
    ///
    /// `None` means the filter does not constrain a listing.
    pub fn resolve_tag_filter_to_article_ids(&self, raw: &str) -> ApiResult<Option<Vec<String>>> {
        self.run("resolve_tag_filter", |conn| {
            publish_core::resolve_tag_filter_to_article_ids(conn, raw)
        })
        .map(|ids| ids.map(|ids| ids.into_iter().map(|id| id.to_string()).collect()))
    }

    fn run<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> ApiResult<T> {
        let result = open_db(&self.config.db_path)
            .map_err(RepoError::from)
            .and_then(|conn| f(&conn));
        result.map_err(|err| {
            let err = ApiError::from(err);
            if err.kind == ErrorKind::Storage {
                warn!(
                    "event=api_call module=api status=error operation={operation} error_code={}",
                    err.code()
                );
            }
            err
        })
    }
}

fn article_service(
    conn: &Connection,
) -> RepoResult<ArticleService<SqliteArticleRepository<'_>, SqliteTagRepository<'_>>> {
    Ok(ArticleService::new(
        SqliteArticleRepository::try_new(conn)?,
        SqliteTagRepository::try_new(conn)?,
    ))
}

fn tag_service(conn: &Connection) -> RepoResult<TagService<SqliteTagRepository<'_>>> {
    Ok(TagService::new(SqliteTagRepository::try_new(conn)?))
}

fn association_service(
    conn: &Connection,
) -> RepoResult<AssociationService<SqliteAssociationRepository<'_>>> {
    Ok(AssociationService::new(SqliteAssociationRepository::try_new(conn)?))
}

/// Parses an `(article_id, tag_id)` pair, the order every association
/// method takes.
fn parse_pair(article_id: &str, tag_id: &str) -> ApiResult<(ArticleId, TagId)> {
    let article_id = parse_id("article_id", article_id).map_err(RepoError::from)?;
    let tag_id = parse_id("tag_id", tag_id).map_err(RepoError::from)?;
    Ok((article_id, tag_id))
}

/// Unknown ordering fields fall back to newest-first.
fn parse_ordering(ordering: Option<&str>) -> ArticleOrder {
    ordering.and_then(ArticleOrder::parse).unwrap_or_default()
}

fn to_article_response(record: ArticleRecord) -> ArticleResponse {
    let ArticleRecord { article, tags } = record;
    let Article {
        id,
        title,
        slug,
        author,
        body,
        is_active,
        document,
        image,
        created_at,
        updated_at,
    } = article;
    ArticleResponse {
        id: id.to_string(),
        title,
        slug,
        author,
        body,
        is_active,
        document,
        image,
        created_at,
        updated_at,
        tags: tags.into_iter().map(to_tag_summary_response).collect(),
    }
}

fn to_tag_summary_response(tag: TagSummary) -> TagSummaryResponse {
    TagSummaryResponse {
        id: tag.id.to_string(),
        name: tag.name,
        color: tag.color,
        is_active: tag.is_active,
    }
}

fn to_tag_response(tag: Tag) -> TagResponse {
    TagResponse {
        id: tag.id.to_string(),
        name: tag.name,
        color: tag.color,
        is_active: tag.is_active,
        created_at: tag.created_at,
        updated_at: tag.updated_at,
        details: Vec::new(),
    }
}

fn to_tag_record_response(record: TagRecord) -> TagResponse {
    let mut response = to_tag_response(record.tag);
    response.details = record
        .associations
        .into_iter()
        .map(to_association_response)
        .collect();
    response
}

fn to_association_response(association: Association) -> AssociationResponse {
    AssociationResponse {
        id: association.id.to_string(),
        article_id: association.article_id.to_string(),
        tag_id: association.tag_id.to_string(),
        saved: association.saved,
    }
}

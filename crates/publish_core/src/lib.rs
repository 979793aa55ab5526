//! Core domain logic for article publishing.
//! This crate is the single source of truth for article, tag and
//! association invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::article::{Article, ArticleId, ArticlePatch, ArticleRecord, NewArticle};
pub use model::association::{Association, AssociationId, SavedUpdate};
pub use model::tag::{NewTag, Tag, TagId, TagPatch, TagRecord, TagSummary};
pub use model::validation::ValidationError;
pub use repo::article_repo::{
    ArticleListQuery, ArticleOrder, ArticleRepository, SqliteArticleRepository,
};
pub use repo::association_repo::{AssociationRepository, SqliteAssociationRepository};
pub use repo::tag_repo::{SqliteTagRepository, TagRepository};
pub use repo::{Conflict, ErrorKind, RepoError, RepoResult};
pub use search::tag_query::{
    parse_tag_filter, resolve_tag_filter, resolve_tag_filter_to_article_ids, TagQuerySource,
};
pub use service::article_service::{ArticleFilter, ArticleService};
pub use service::association_service::AssociationService;
pub use service::tag_service::TagService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Keep SQL details out of services and the tag-query resolver.
//! - Translate store constraint failures into semantic errors.
//!
//! # Invariants
//! - Every write path runs inside one `IMMEDIATE` transaction.
//! - Uniqueness is checked up front and again by the store; a `UNIQUE`
//!   violation is reported as `Conflict`, never as a raw DB error.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::article::ArticleId;
use crate::model::tag::TagId;
use crate::model::validation::ValidationError;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod article_repo;
pub mod association_repo;
pub mod tag_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Coarse error classes for callers that map errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Storage,
}

/// Uniqueness rule that rejected a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    ArticleSlug(String),
    TagName(String),
    Association { article_id: ArticleId, tag_id: TagId },
}

impl Display for Conflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArticleSlug(slug) => write!(f, "article slug `{slug}` already exists"),
            Self::TagName(name) => write!(f, "tag `{name}` already exists"),
            Self::Association { article_id, tag_id } => write!(
                f,
                "tag {tag_id} is already associated with article {article_id}"
            ),
        }
    }
}

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    ArticleNotFound(ArticleId),
    TagNotFound(TagId),
    AssociationNotFound {
        article_id: ArticleId,
        tag_id: TagId,
    },
    Conflict(Conflict),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted into a valid read model.
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::ArticleNotFound(_) | Self::TagNotFound(_) | Self::AssociationNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Db(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::InvalidData(_) => ErrorKind::Storage,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ArticleNotFound(id) => write!(f, "article not found: {id}"),
            Self::TagNotFound(id) => write!(f, "tag not found: {id}"),
            Self::AssociationNotFound { article_id, tag_id } => write!(
                f,
                "association not found for article {article_id} and tag {tag_id}"
            ),
            Self::Conflict(conflict) => write!(f, "conflict: {conflict}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns whether `err` is a `UNIQUE` (or primary key) constraint failure.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => {
            inner.code == ErrorCode::ConstraintViolation
                && matches!(
                    inner.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

/// Encodes values as one JSON array text for `json_each(?)` membership
/// tests, which bind a single variable regardless of set size.
pub(crate) fn json_text_array<I>(values: I) -> RepoResult<String>
where
    I: IntoIterator,
    I::Item: ToString,
{
    let values: Vec<String> = values.into_iter().map(|value| value.to_string()).collect();
    serde_json::to_string(&values)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode value list: {err}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Verifies the connection is migrated and exposes the given tables.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables.iter().copied() {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

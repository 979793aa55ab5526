//! Article repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist articles and derive their slug exactly once.
//! - Execute the combined listing predicate built by the article service.
//!
//! # Invariants
//! - Write paths validate input before SQL mutations.
//! - `slug` is never part of an UPDATE; a store trigger rejects changes.
//! - Default listing order is newest-created first, insertion order breaking
//!   ties.
//! - `created_at` never precedes an existing article's `created_at`, even
//!   when the wall clock steps back.
//! - Title/author filters fold case with Unicode rules and match literally.

use crate::db::{fold_case, register_functions, FOLD_CASE_FN, NOW_MS_SQL};
use crate::model::article::{slug_for, Article, ArticleId, ArticlePatch, ArticleRecord, NewArticle};
use crate::model::tag::TagSummary;
use crate::repo::{
    bool_to_int, ensure_connection_ready, is_unique_violation, json_text_array, parse_flag,
    parse_uuid, Conflict, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use uuid::Uuid;

const ARTICLE_SELECT_SQL: &str = "SELECT
    id,
    title,
    slug,
    author,
    body,
    is_active,
    document,
    image,
    created_at,
    updated_at
FROM articles";

/// Sort order for article listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArticleOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    TitleAsc,
    TitleDesc,
    AuthorAsc,
    AuthorDesc,
}

impl ArticleOrder {
    /// Parses an ordering field name, `-` prefix meaning descending.
    ///
    /// Accepts `created_at`, `title` and `author`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (descending, field) = match value.strip_prefix('-') {
            Some(field) => (true, field),
            None => (false, value),
        };
        match (field, descending) {
            ("created_at", true) => Some(Self::NewestFirst),
            ("created_at", false) => Some(Self::OldestFirst),
            ("title", false) => Some(Self::TitleAsc),
            ("title", true) => Some(Self::TitleDesc),
            ("author", false) => Some(Self::AuthorAsc),
            ("author", true) => Some(Self::AuthorDesc),
            _ => None,
        }
    }

    fn order_by_sql(self) -> &'static str {
        match self {
            Self::NewestFirst => "created_at DESC, rowid DESC",
            Self::OldestFirst => "created_at ASC, rowid ASC",
            Self::TitleAsc => "title COLLATE NOCASE ASC, created_at DESC, rowid DESC",
            Self::TitleDesc => "title COLLATE NOCASE DESC, created_at DESC, rowid DESC",
            Self::AuthorAsc => "author COLLATE NOCASE ASC, created_at DESC, rowid DESC",
            Self::AuthorDesc => "author COLLATE NOCASE DESC, created_at DESC, rowid DESC",
        }
    }
}

/// Store-level listing predicate. Every `Some` field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleListQuery {
    /// Case-insensitive substring of `title`.
    pub title_contains: Option<String>,
    /// Case-insensitive substring of `author`.
    pub author_contains: Option<String>,
    /// Inclusion set; `Some(empty)` matches nothing.
    pub article_ids: Option<BTreeSet<ArticleId>>,
    pub include_inactive: bool,
    pub order: ArticleOrder,
}

/// Repository interface for article persistence.
pub trait ArticleRepository {
    /// Creates an article, deriving its slug from the title.
    fn create_article(&self, input: &NewArticle) -> RepoResult<ArticleRecord>;
    /// Applies a partial update; the slug is left untouched.
    fn update_article(&self, id: ArticleId, patch: &ArticlePatch) -> RepoResult<ArticleRecord>;
    fn get_article(&self, id: ArticleId, include_inactive: bool)
        -> RepoResult<Option<ArticleRecord>>;
    fn get_article_by_slug(
        &self,
        slug: &str,
        include_inactive: bool,
    ) -> RepoResult<Option<ArticleRecord>>;
    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<Vec<ArticleRecord>>;
    /// Marks the article inactive. The row and its associations stay.
    fn deactivate_article(&self, id: ArticleId) -> RepoResult<()>;
    /// Hard-deletes the article; associations cascade.
    fn purge_article(&self, id: ArticleId) -> RepoResult<()>;
    /// Runs `read` against one consistent snapshot of the store.
    fn read_snapshot<T, F>(&self, read: F) -> RepoResult<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> RepoResult<T>;
}

/// SQLite-backed article repository.
pub struct SqliteArticleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArticleRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["articles", "tags", "article_tags"])?;
        register_functions(conn)?;
        Ok(Self { conn })
    }
}

impl ArticleRepository for SqliteArticleRepository<'_> {
    fn create_article(&self, input: &NewArticle) -> RepoResult<ArticleRecord> {
        input.validate()?;

        let id = Uuid::new_v4();
        let slug = slug_for(id, &input.title);
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        if slug_exists(&tx, &slug)? {
            return Err(RepoError::Conflict(Conflict::ArticleSlug(slug)));
        }

        tx.execute(
            &format!(
                "INSERT INTO articles (
                    id, title, slug, author, body, document, image, created_at, updated_at
                 )
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, stamp, stamp
                 FROM (
                    SELECT MAX({NOW_MS_SQL}, COALESCE(MAX(created_at), 0)) AS stamp
                    FROM articles
                 );"
            ),
            params![
                id.to_string(),
                input.title.as_str(),
                slug.as_str(),
                input.author.as_str(),
                input.body.as_str(),
                input.document.as_str(),
                input.image.as_str(),
            ],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                RepoError::Conflict(Conflict::ArticleSlug(slug.clone()))
            } else {
                err.into()
            }
        })?;

        let record = load_required_article(&tx, id)?;
        tx.commit()?;
        Ok(record)
    }

    fn update_article(&self, id: ArticleId, patch: &ArticlePatch) -> RepoResult<ArticleRecord> {
        patch.validate()?;

        let mut assignments: Vec<String> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        let text_fields = [
            ("title", &patch.title),
            ("author", &patch.author),
            ("body", &patch.body),
            ("document", &patch.document),
            ("image", &patch.image),
        ];
        for (column, value) in text_fields {
            if let Some(value) = value {
                assignments.push(format!("{column} = ?"));
                bind_values.push(Value::Text(value.clone()));
            }
        }
        if let Some(is_active) = patch.is_active {
            assignments.push("is_active = ?".to_string());
            bind_values.push(Value::Integer(bool_to_int(is_active)));
        }
        assignments.push(format!("updated_at = MAX(updated_at, {NOW_MS_SQL})"));
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE articles SET {} WHERE id = ?;",
            assignments.join(", ")
        );

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::ArticleNotFound(id));
        }
        let record = load_required_article(&tx, id)?;
        tx.commit()?;
        Ok(record)
    }

    fn get_article(
        &self,
        id: ArticleId,
        include_inactive: bool,
    ) -> RepoResult<Option<ArticleRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARTICLE_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR is_active = 1);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_inactive)])?;
        if let Some(row) = rows.next()? {
            let article = parse_article_row(row)?;
            return Ok(Some(with_confirmed_tags(self.conn, article)?));
        }
        Ok(None)
    }

    fn get_article_by_slug(
        &self,
        slug: &str,
        include_inactive: bool,
    ) -> RepoResult<Option<ArticleRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARTICLE_SELECT_SQL}
             WHERE slug = ?1
               AND (?2 = 1 OR is_active = 1);"
        ))?;
        let mut rows = stmt.query(params![slug, bool_to_int(include_inactive)])?;
        if let Some(row) = rows.next()? {
            let article = parse_article_row(row)?;
            return Ok(Some(with_confirmed_tags(self.conn, article)?));
        }
        Ok(None)
    }

    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<Vec<ArticleRecord>> {
        let mut sql = format!("{ARTICLE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_inactive {
            sql.push_str(" AND is_active = 1");
        }

        if let Some(title) = non_empty(query.title_contains.as_deref()) {
            sql.push_str(&format!(" AND instr({FOLD_CASE_FN}(title), ?) > 0"));
            bind_values.push(Value::Text(fold_case(title)));
        }

        if let Some(author) = non_empty(query.author_contains.as_deref()) {
            sql.push_str(&format!(" AND instr({FOLD_CASE_FN}(author), ?) > 0"));
            bind_values.push(Value::Text(fold_case(author)));
        }

        if let Some(ids) = query.article_ids.as_ref() {
            if ids.is_empty() {
                sql.push_str(" AND 0");
            } else {
                // One bound JSON array keeps large sets under SQLite's variable limit.
                sql.push_str(" AND id IN (SELECT value FROM json_each(?))");
                bind_values.push(Value::Text(json_text_array(ids)?));
            }
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(query.order.order_by_sql());

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut articles = Vec::new();
        while let Some(row) = rows.next()? {
            let article = parse_article_row(row)?;
            articles.push(with_confirmed_tags(self.conn, article)?);
        }

        Ok(articles)
    }

    fn deactivate_article(&self, id: ArticleId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE articles
                 SET is_active = 0,
                     updated_at = MAX(updated_at, {NOW_MS_SQL})
                 WHERE id = ?1;"
            ),
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::ArticleNotFound(id));
        }
        Ok(())
    }

    fn purge_article(&self, id: ArticleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM articles WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::ArticleNotFound(id));
        }
        Ok(())
    }

    fn read_snapshot<T, F>(&self, read: F) -> RepoResult<T>
    where
        F: FnOnce(&Self) -> RepoResult<T>,
    {
        // Already inside a caller-owned transaction: that one is the snapshot.
        if !self.conn.is_autocommit() {
            return read(self);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let value = read(self)?;
        tx.commit()?;
        Ok(value)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

fn slug_exists(conn: &Connection, slug: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM articles WHERE slug = ?1);",
        [slug],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_required_article(conn: &Connection, id: ArticleId) -> RepoResult<ArticleRecord> {
    let mut stmt = conn.prepare(&format!("{ARTICLE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => {
            let article = parse_article_row(row)?;
            with_confirmed_tags(conn, article)
        }
        None => Err(RepoError::ArticleNotFound(id)),
    }
}

fn with_confirmed_tags(conn: &Connection, article: Article) -> RepoResult<ArticleRecord> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.color, t.is_active
         FROM article_tags at
         INNER JOIN tags t ON t.id = at.tag_id
         WHERE at.article_id = ?1
           AND at.saved = 1
         ORDER BY t.name ASC;",
    )?;
    let mut rows = stmt.query([article.id.to_string()])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get(0)?;
        tags.push(TagSummary {
            id: parse_uuid(&id_text, "tags.id")?,
            name: row.get(1)?,
            color: row.get(2)?,
            is_active: parse_flag(row.get(3)?, "tags.is_active")?,
        });
    }
    Ok(ArticleRecord { article, tags })
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let id_text: String = row.get("id")?;
    Ok(Article {
        id: parse_uuid(&id_text, "articles.id")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        author: row.get("author")?,
        body: row.get("body")?,
        is_active: parse_flag(row.get("is_active")?, "articles.is_active")?,
        document: row.get("document")?,
        image: row.get("image")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

//! Tag repository contract and SQLite implementation.
//!
//! # Invariants
//! - Tag names are stored trimmed and unique (case-sensitive).
//! - Tag rows are deactivated, never reactivated, by this repository.

use crate::db::NOW_MS_SQL;
use crate::model::article::ArticleId;
use crate::model::association::Association;
use crate::model::tag::{NewTag, Tag, TagId, TagPatch, TagRecord};
use crate::repo::association_repo::list_associations_for_tag;
use crate::repo::{
    bool_to_int, ensure_connection_ready, is_unique_violation, json_text_array, parse_flag,
    parse_uuid, Conflict, RepoError, RepoResult,
};
use crate::search::tag_query::TagQuerySource;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use uuid::Uuid;

const TAG_SELECT_SQL: &str = "SELECT
    id,
    name,
    color,
    is_active,
    created_at,
    updated_at
FROM tags";

/// Repository interface for tag persistence.
pub trait TagRepository {
    /// Creates a tag after checking its name is free.
    fn create_tag(&self, input: &NewTag) -> RepoResult<Tag>;
    fn update_tag(&self, id: TagId, patch: &TagPatch) -> RepoResult<Tag>;
    fn get_tag(&self, id: TagId) -> RepoResult<Option<TagRecord>>;
    /// Exact, case-sensitive name lookup.
    fn find_tag_by_name(&self, name: &str) -> RepoResult<Option<Tag>>;
    /// Lists tags sorted by name, each with its associations.
    fn list_tags(&self, include_inactive: bool) -> RepoResult<Vec<TagRecord>>;
    fn deactivate_tag(&self, id: TagId) -> RepoResult<()>;
    /// Hard-deletes the tag; associations cascade.
    fn purge_tag(&self, id: TagId) -> RepoResult<()>;
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["tags", "article_tags"])?;
        Ok(Self { conn })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create_tag(&self, input: &NewTag) -> RepoResult<Tag> {
        let input = input.normalized()?;
        let id = Uuid::new_v4();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if load_tag_by_name(&tx, &input.name)?.is_some() {
            return Err(RepoError::Conflict(Conflict::TagName(input.name)));
        }

        tx.execute(
            "INSERT INTO tags (id, name, color) VALUES (?1, ?2, ?3);",
            params![id.to_string(), input.name.as_str(), input.color.as_str()],
        )
        .map_err(|err| map_name_conflict(err, &input.name))?;

        let tag = load_tag(&tx, id)?.ok_or(RepoError::TagNotFound(id))?;
        tx.commit()?;
        Ok(tag)
    }

    fn update_tag(&self, id: TagId, patch: &TagPatch) -> RepoResult<Tag> {
        let patch = patch.normalized()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if let Some(name) = patch.name.as_deref() {
            if let Some(existing) = load_tag_by_name(&tx, name)? {
                if existing.id != id {
                    return Err(RepoError::Conflict(Conflict::TagName(name.to_string())));
                }
            }
        }

        let mut assignments: Vec<String> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(name) = patch.name.as_ref() {
            assignments.push("name = ?".to_string());
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(color) = patch.color.as_ref() {
            assignments.push("color = ?".to_string());
            bind_values.push(Value::Text(color.clone()));
        }
        assignments.push(format!("updated_at = MAX(updated_at, {NOW_MS_SQL})"));
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE tags SET {} WHERE id = ?;", assignments.join(", "));
        let changed = tx
            .execute(&sql, params_from_iter(bind_values))
            .map_err(|err| map_name_conflict(err, patch.name.as_deref().unwrap_or_default()))?;
        if changed == 0 {
            return Err(RepoError::TagNotFound(id));
        }

        let tag = load_tag(&tx, id)?.ok_or(RepoError::TagNotFound(id))?;
        tx.commit()?;
        Ok(tag)
    }

    fn get_tag(&self, id: TagId) -> RepoResult<Option<TagRecord>> {
        match load_tag(self.conn, id)? {
            Some(tag) => Ok(Some(with_associations(self.conn, tag)?)),
            None => Ok(None),
        }
    }

    fn find_tag_by_name(&self, name: &str) -> RepoResult<Option<Tag>> {
        load_tag_by_name(self.conn, name)
    }

    fn list_tags(&self, include_inactive: bool) -> RepoResult<Vec<TagRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TAG_SELECT_SQL}
             WHERE (?1 = 1 OR is_active = 1)
             ORDER BY name ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_inactive)])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            let tag = parse_tag_row(row)?;
            tags.push(with_associations(self.conn, tag)?);
        }
        Ok(tags)
    }

    fn deactivate_tag(&self, id: TagId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE tags
                 SET is_active = 0,
                     updated_at = MAX(updated_at, {NOW_MS_SQL})
                 WHERE id = ?1;"
            ),
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::TagNotFound(id));
        }
        Ok(())
    }

    fn purge_tag(&self, id: TagId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::TagNotFound(id));
        }
        Ok(())
    }
}

impl TagQuerySource for SqliteTagRepository<'_> {
    fn tag_ids_by_names(&self, names: &[String]) -> RepoResult<Vec<TagId>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT id
             FROM tags
             WHERE name IN (SELECT value FROM json_each(?1))
             ORDER BY name ASC;",
        )?;
        let mut rows = stmt.query([json_text_array(names)?])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            ids.push(parse_uuid(&id_text, "tags.id")?);
        }
        Ok(ids)
    }

    fn article_ids_for_tags(&self, tag_ids: &[TagId]) -> RepoResult<BTreeSet<ArticleId>> {
        if tag_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT article_id
             FROM article_tags
             WHERE tag_id IN (SELECT value FROM json_each(?1));",
        )?;
        let mut rows = stmt.query([json_text_array(tag_ids)?])?;
        let mut ids = BTreeSet::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            ids.insert(parse_uuid(&id_text, "article_tags.article_id")?);
        }
        Ok(ids)
    }
}

fn map_name_conflict(err: rusqlite::Error, name: &str) -> RepoError {
    if is_unique_violation(&err) {
        RepoError::Conflict(Conflict::TagName(name.to_string()))
    } else {
        err.into()
    }
}

fn with_associations(conn: &Connection, tag: Tag) -> RepoResult<TagRecord> {
    let associations: Vec<Association> = list_associations_for_tag(conn, tag.id)?;
    Ok(TagRecord { tag, associations })
}

pub(crate) fn load_tag(conn: &Connection, id: TagId) -> RepoResult<Option<Tag>> {
    let mut stmt = conn.prepare(&format!("{TAG_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_tag_row(row)?)),
        None => Ok(None),
    }
}

fn load_tag_by_name(conn: &Connection, name: &str) -> RepoResult<Option<Tag>> {
    let mut stmt = conn.prepare(&format!("{TAG_SELECT_SQL} WHERE name = ?1;"))?;
    let mut rows = stmt.query([name])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_tag_row(row)?)),
        None => Ok(None),
    }
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    let id_text: String = row.get("id")?;
    Ok(Tag {
        id: parse_uuid(&id_text, "tags.id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        is_active: parse_flag(row.get("is_active")?, "tags.is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

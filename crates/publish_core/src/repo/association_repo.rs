//! Article-tag association repository and SQLite implementation.
//!
//! # Responsibility
//! - Own the association lifecycle: manual attach, get-or-create on patch,
//!   and `saved` flag updates.
//! - Recover from lost get-or-create races on the `(article_id, tag_id)`
//!   uniqueness constraint.
//!
//! # Invariants
//! - At most one row per `(article_id, tag_id)`; the store constraint is the
//!   final guard, application checks only short-circuit.
//! - Rows created by the patch path start with `saved = 0`.
//! - `saved` is rewritten only when the value changes.

use crate::model::article::ArticleId;
use crate::model::association::{Association, SavedUpdate};
use crate::model::tag::TagId;
use crate::repo::tag_repo::load_tag;
use crate::repo::{
    bool_to_int, ensure_connection_ready, is_unique_violation, parse_flag, parse_uuid, Conflict,
    RepoError, RepoResult,
};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const ASSOCIATION_SELECT_SQL: &str = "SELECT
    id,
    article_id,
    tag_id,
    saved
FROM article_tags";

/// Repository interface for article-tag associations.
pub trait AssociationRepository {
    fn find_association(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
    ) -> RepoResult<Option<Association>>;
    /// Returns the pair's association, creating it with `saved = false`
    /// when absent and `create_if_missing` is set.
    fn ensure_association(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
        create_if_missing: bool,
    ) -> RepoResult<Association>;
    /// Sets `saved`, creating the association first when absent.
    fn set_saved(&self, article_id: ArticleId, tag_id: TagId, saved: bool)
        -> RepoResult<SavedUpdate>;
    /// Inserts a new association; an existing pair is a conflict.
    fn create_association(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
        saved: bool,
    ) -> RepoResult<Association>;
    fn list_for_article(
        &self,
        article_id: ArticleId,
        saved_only: bool,
    ) -> RepoResult<Vec<Association>>;
    fn list_for_tag(&self, tag_id: TagId) -> RepoResult<Vec<Association>>;
}

/// SQLite-backed association repository.
pub struct SqliteAssociationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssociationRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["articles", "tags", "article_tags"])?;
        Ok(Self { conn })
    }
}

impl AssociationRepository for SqliteAssociationRepository<'_> {
    fn find_association(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
    ) -> RepoResult<Option<Association>> {
        find_pair(self.conn, article_id, tag_id)
    }

    fn ensure_association(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
        create_if_missing: bool,
    ) -> RepoResult<Association> {
        if !create_if_missing {
            return find_pair(self.conn, article_id, tag_id)?
                .ok_or(RepoError::AssociationNotFound { article_id, tag_id });
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (association, _created) = get_or_create_in_tx(&tx, article_id, tag_id)?;
        tx.commit()?;
        Ok(association)
    }

    fn set_saved(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
        saved: bool,
    ) -> RepoResult<SavedUpdate> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (mut association, created) = get_or_create_in_tx(&tx, article_id, tag_id)?;

        let changed = tx.execute(
            "UPDATE article_tags
             SET saved = ?2
             WHERE id = ?1
               AND saved <> ?2;",
            params![association.id.to_string(), bool_to_int(saved)],
        )?;
        association.saved = saved;
        tx.commit()?;

        Ok(SavedUpdate {
            association,
            created,
            written: changed > 0,
        })
    }

    fn create_association(
        &self,
        article_id: ArticleId,
        tag_id: TagId,
        saved: bool,
    ) -> RepoResult<Association> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_parents_exist(&tx, article_id, tag_id)?;
        if find_pair(&tx, article_id, tag_id)?.is_some() {
            return Err(RepoError::Conflict(Conflict::Association { article_id, tag_id }));
        }

        let association = Association {
            id: Uuid::new_v4(),
            article_id,
            tag_id,
            saved,
        };
        insert_association(&tx, &association).map_err(|err| {
            if is_unique_violation(&err) {
                RepoError::Conflict(Conflict::Association { article_id, tag_id })
            } else {
                err.into()
            }
        })?;
        tx.commit()?;
        Ok(association)
    }

    fn list_for_article(
        &self,
        article_id: ArticleId,
        saved_only: bool,
    ) -> RepoResult<Vec<Association>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSOCIATION_SELECT_SQL}
             WHERE article_id = ?1
               AND (?2 = 0 OR saved = 1)
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![article_id.to_string(), bool_to_int(saved_only)])?;
        let mut associations = Vec::new();
        while let Some(row) = rows.next()? {
            associations.push(parse_association_row(row)?);
        }
        Ok(associations)
    }

    fn list_for_tag(&self, tag_id: TagId) -> RepoResult<Vec<Association>> {
        list_associations_for_tag(self.conn, tag_id)
    }
}

pub(crate) fn list_associations_for_tag(
    conn: &Connection,
    tag_id: TagId,
) -> RepoResult<Vec<Association>> {
    let mut stmt = conn.prepare(&format!(
        "{ASSOCIATION_SELECT_SQL}
         WHERE tag_id = ?1
         ORDER BY rowid ASC;"
    ))?;
    let mut rows = stmt.query([tag_id.to_string()])?;
    let mut associations = Vec::new();
    while let Some(row) = rows.next()? {
        associations.push(parse_association_row(row)?);
    }
    Ok(associations)
}

/// Loads the pair's association or creates it with `saved = false`.
///
/// Must run inside a write transaction. Returns `true` alongside the row
/// when this call inserted it.
fn get_or_create_in_tx(
    conn: &Connection,
    article_id: ArticleId,
    tag_id: TagId,
) -> RepoResult<(Association, bool)> {
    if load_tag(conn, tag_id)?.is_none() {
        return Err(RepoError::TagNotFound(tag_id));
    }
    if let Some(existing) = find_pair(conn, article_id, tag_id)? {
        return Ok((existing, false));
    }
    ensure_parents_exist(conn, article_id, tag_id)?;
    insert_or_recover(conn, article_id, tag_id)
}

/// Inserts an unconfirmed association. A `UNIQUE` violation means a
/// concurrent writer created the pair first; its row is returned instead.
fn insert_or_recover(
    conn: &Connection,
    article_id: ArticleId,
    tag_id: TagId,
) -> RepoResult<(Association, bool)> {
    let association = Association {
        id: Uuid::new_v4(),
        article_id,
        tag_id,
        saved: false,
    };

    match insert_association(conn, &association) {
        Ok(()) => Ok((association, true)),
        Err(err) if is_unique_violation(&err) => {
            warn!(
                "event=association_create module=association status=recovered reason=unique_violation article_id={article_id} tag_id={tag_id}"
            );
            let existing = find_pair(conn, article_id, tag_id)?.ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "association for article {article_id} and tag {tag_id} missing after unique violation"
                ))
            })?;
            Ok((existing, false))
        }
        Err(err) => Err(err.into()),
    }
}

fn insert_association(conn: &Connection, association: &Association) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO article_tags (id, article_id, tag_id, saved)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            association.id.to_string(),
            association.article_id.to_string(),
            association.tag_id.to_string(),
            bool_to_int(association.saved),
        ],
    )?;
    Ok(())
}

fn ensure_parents_exist(conn: &Connection, article_id: ArticleId, tag_id: TagId) -> RepoResult<()> {
    if load_tag(conn, tag_id)?.is_none() {
        return Err(RepoError::TagNotFound(tag_id));
    }
    let article_exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM articles WHERE id = ?1);",
        [article_id.to_string()],
        |row| row.get(0),
    )?;
    if article_exists != 1 {
        return Err(RepoError::ArticleNotFound(article_id));
    }
    Ok(())
}

fn find_pair(
    conn: &Connection,
    article_id: ArticleId,
    tag_id: TagId,
) -> RepoResult<Option<Association>> {
    conn.query_row(
        &format!(
            "{ASSOCIATION_SELECT_SQL}
             WHERE article_id = ?1
               AND tag_id = ?2;"
        ),
        params![article_id.to_string(), tag_id.to_string()],
        |row| Ok(parse_association_row(row)),
    )
    .optional()?
    .transpose()
}

fn parse_association_row(row: &Row<'_>) -> RepoResult<Association> {
    let id_text: String = row.get("id")?;
    let article_text: String = row.get("article_id")?;
    let tag_text: String = row.get("tag_id")?;
    Ok(Association {
        id: parse_uuid(&id_text, "article_tags.id")?,
        article_id: parse_uuid(&article_text, "article_tags.article_id")?,
        tag_id: parse_uuid(&tag_text, "article_tags.tag_id")?,
        saved: parse_flag(row.get("saved")?, "article_tags.saved")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{find_pair, insert_association, insert_or_recover};
    use crate::db::open_db_in_memory;
    use crate::model::association::Association;
    use rusqlite::Connection;
    use uuid::Uuid;

    fn seed_pair(conn: &Connection) -> (Uuid, Uuid) {
        let article_id = Uuid::new_v4();
        let tag_id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO articles (id, title, slug, author, body)
             VALUES (?1, 'Seeded article', ?1, 'ana', 'body');",
            [article_id.to_string()],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO tags (id, name, color) VALUES (?1, 'seed', '#000');",
            [tag_id.to_string()],
        )
        .unwrap();
        (article_id, tag_id)
    }

    #[test]
    fn insert_or_recover_returns_row_of_race_winner() {
        let conn = open_db_in_memory().unwrap();
        let (article_id, tag_id) = seed_pair(&conn);
        let winner = Association {
            id: Uuid::new_v4(),
            article_id,
            tag_id,
            saved: true,
        };
        insert_association(&conn, &winner).unwrap();

        let (recovered, created) = insert_or_recover(&conn, article_id, tag_id).unwrap();
        assert!(!created);
        assert_eq!(recovered, winner);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM article_tags;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn insert_or_recover_creates_unconfirmed_row() {
        let conn = open_db_in_memory().unwrap();
        let (article_id, tag_id) = seed_pair(&conn);

        let (created_row, created) = insert_or_recover(&conn, article_id, tag_id).unwrap();
        assert!(created);
        assert!(!created_row.saved);
        assert_eq!(
            find_pair(&conn, article_id, tag_id).unwrap(),
            Some(created_row)
        );
    }
}

use publish_core::db::{open_db, open_db_in_memory};
use publish_core::{
    ArticleId, ArticleRepository, AssociationService, Conflict, ErrorKind, NewArticle, NewTag,
    RepoError, SqliteArticleRepository, SqliteAssociationRepository, SqliteTagRepository, TagId,
    TagRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;

fn seed(conn: &Connection, title: &str, tag_name: &str) -> (ArticleId, TagId) {
    let articles = SqliteArticleRepository::try_new(conn).unwrap();
    let tags = SqliteTagRepository::try_new(conn).unwrap();
    let article = articles
        .create_article(&NewArticle {
            title: title.to_string(),
            author: "ana".to_string(),
            body: "body".to_string(),
            ..NewArticle::default()
        })
        .unwrap();
    let tag = tags
        .create_tag(&NewTag {
            name: tag_name.to_string(),
            color: "#123456".to_string(),
        })
        .unwrap();
    (article.article.id, tag.id)
}

fn service(conn: &Connection) -> AssociationService<SqliteAssociationRepository<'_>> {
    AssociationService::new(SqliteAssociationRepository::try_new(conn).unwrap())
}

fn association_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM article_tags;", [], |row| row.get(0))
        .unwrap()
}

fn total_changes(conn: &Connection) -> i64 {
    conn.query_row("SELECT total_changes();", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn read_path_does_not_create_missing_association() {
    let conn = open_db_in_memory().unwrap();
    let (article_id, tag_id) = seed(&conn, "Read path article", "go");
    let service = service(&conn);

    let err = service.get_association(article_id, tag_id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::AssociationNotFound { article_id: a, tag_id: t } if a == article_id && t == tag_id
    ));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(association_count(&conn), 0);
}

#[test]
fn get_or_create_creates_unconfirmed_association_once() {
    let conn = open_db_in_memory().unwrap();
    let (article_id, tag_id) = seed(&conn, "Patch path article", "go");
    let service = service(&conn);

    let created = service.get_or_create_association(article_id, tag_id).unwrap();
    assert!(!created.saved);
    assert_eq!(created.article_id, article_id);
    assert_eq!(created.tag_id, tag_id);

    let again = service.get_or_create_association(article_id, tag_id).unwrap();
    assert_eq!(again, created);
    assert_eq!(association_count(&conn), 1);
    assert_eq!(service.get_association(article_id, tag_id).unwrap(), created);
}

#[test]
fn set_saved_creates_missing_association_then_confirms_it() {
    let conn = open_db_in_memory().unwrap();
    let (article_id, tag_id) = seed(&conn, "Patched before attach", "rust");
    let service = service(&conn);

    let update = service.set_saved(article_id, tag_id, true).unwrap();
    assert!(update.created);
    assert!(update.written);
    assert!(update.association.saved);
    assert_eq!(association_count(&conn), 1);

    let stored = service.get_association(article_id, tag_id).unwrap();
    assert_eq!(stored, update.association);
}

#[test]
fn repeating_same_saved_value_performs_no_write() {
    let conn = open_db_in_memory().unwrap();
    let (article_id, tag_id) = seed(&conn, "Idempotent patch target", "rust");
    let service = service(&conn);

    let first = service.set_saved(article_id, tag_id, true).unwrap();
    assert!(first.written);

    let before = total_changes(&conn);
    let second = service.set_saved(article_id, tag_id, true).unwrap();
    assert!(!second.created);
    assert!(!second.written);
    assert_eq!(second.association, first.association);
    assert_eq!(total_changes(&conn), before);

    let cleared = service.set_saved(article_id, tag_id, false).unwrap();
    assert!(cleared.written);
    assert!(!service.get_association(article_id, tag_id).unwrap().saved);
}

#[test]
fn unknown_tag_or_article_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let (article_id, tag_id) = seed(&conn, "Existing article row", "go");
    let service = service(&conn);
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.get_or_create_association(article_id, missing),
        Err(RepoError::TagNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.set_saved(missing, tag_id, true),
        Err(RepoError::ArticleNotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.attach_tag(missing, tag_id),
        Err(RepoError::ArticleNotFound(_))
    ));
    assert_eq!(association_count(&conn), 0);
}

#[test]
fn attaching_existing_pair_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let (article_id, tag_id) = seed(&conn, "Manually tagged article", "go");
    let service = service(&conn);

    let attached = service.attach_tag(article_id, tag_id).unwrap();
    assert!(attached.saved);

    let err = service.attach_tag(article_id, tag_id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(Conflict::Association { .. })
    ));
    assert_eq!(association_count(&conn), 1);
}

#[test]
fn store_rejects_duplicate_pairs() {
    let conn = open_db_in_memory().unwrap();
    let (article_id, tag_id) = seed(&conn, "Constraint guarded pair", "go");
    service(&conn).attach_tag(article_id, tag_id).unwrap();

    let err = conn
        .execute(
            "INSERT INTO article_tags (id, article_id, tag_id) VALUES (?1, ?2, ?3);",
            [
                Uuid::new_v4().to_string(),
                article_id.to_string(),
                tag_id.to_string(),
            ],
        )
        .unwrap_err();
    assert!(err.to_string().contains("UNIQUE"));
}

#[test]
fn list_for_article_can_filter_confirmed_associations() {
    let conn = open_db_in_memory().unwrap();
    let (article_id, go_id) = seed(&conn, "Two tag article here", "go");
    let rust_id = SqliteTagRepository::try_new(&conn)
        .unwrap()
        .create_tag(&NewTag {
            name: "rust".to_string(),
            color: "#dea584".to_string(),
        })
        .unwrap()
        .id;
    let service = service(&conn);

    let confirmed = service.attach_tag(article_id, go_id).unwrap();
    let pending = service.get_or_create_association(article_id, rust_id).unwrap();

    assert_eq!(
        service.list_for_article(article_id, false).unwrap(),
        vec![confirmed.clone(), pending]
    );
    assert_eq!(
        service.list_for_article(article_id, true).unwrap(),
        vec![confirmed.clone()]
    );
    assert_eq!(service.list_for_tag(go_id).unwrap(), vec![confirmed]);
}

#[test]
fn concurrent_get_or_create_leaves_single_association() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("publish.db");
    let (article_id, tag_id) = {
        let conn = open_db(&path).unwrap();
        seed(&conn, "Concurrently patched", "go")
    };

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let service = service(&conn);
                barrier.wait();
                if worker % 2 == 0 {
                    service.set_saved(article_id, tag_id, true).unwrap().association
                } else {
                    service.get_or_create_association(article_id, tag_id).unwrap()
                }
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let conn = open_db(&path).unwrap();
    assert_eq!(association_count(&conn), 1);
    let stored = service(&conn).get_association(article_id, tag_id).unwrap();
    assert!(results.iter().all(|association| association.id == stored.id));
    assert!(stored.saved);
}

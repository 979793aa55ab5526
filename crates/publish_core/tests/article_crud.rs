use publish_core::db::open_db_in_memory;
use publish_core::{
    ArticlePatch, ArticleRepository, ArticleService, AssociationRepository, Conflict, ErrorKind,
    NewArticle, NewTag, RepoError, SqliteArticleRepository, SqliteAssociationRepository,
    SqliteTagRepository, TagRepository, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn new_article(title: &str) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        author: "Ana Torres".to_string(),
        body: "Body text".to_string(),
        ..NewArticle::default()
    }
}

fn service(
    conn: &Connection,
) -> ArticleService<SqliteArticleRepository<'_>, SqliteTagRepository<'_>> {
    ArticleService::new(
        SqliteArticleRepository::try_new(conn).unwrap(),
        SqliteTagRepository::try_new(conn).unwrap(),
    )
}

#[test]
fn title_of_nine_characters_is_rejected_and_ten_is_accepted() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service.create_article(&new_article("123456789")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::TitleTooShort { min: 10, actual: 9 })
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let created = service.create_article(&new_article("1234567890")).unwrap();
    assert_eq!(created.article.title, "1234567890");
}

#[test]
fn create_assigns_server_fields_and_defaults() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let created = service
        .create_article(&new_article("Hello World, Again!"))
        .unwrap();
    assert_eq!(created.article.slug, "hello-world-again");
    assert!(created.article.is_active);
    assert!(created.article.created_at > 0);
    assert_eq!(created.article.created_at, created.article.updated_at);
    assert_eq!(created.article.document, "");
    assert!(created.tags.is_empty());

    let loaded = service.get_article(created.article.id).unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn slug_transliterates_accented_titles() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let created = service
        .create_article(&new_article("Introducción al diseño"))
        .unwrap();
    assert_eq!(created.article.slug, "introduccion-al-diseno");
    assert!(service
        .get_article_by_slug("introduccion-al-diseno")
        .unwrap()
        .is_some());
}

#[test]
fn created_at_never_precedes_existing_articles() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let first = service
        .create_article(&new_article("Written before skew"))
        .unwrap();
    let future = i64::MAX / 2;
    conn.execute(
        "UPDATE articles SET created_at = ?1 WHERE id = ?2;",
        rusqlite::params![future, first.article.id.to_string()],
    )
    .unwrap();

    let second = service
        .create_article(&new_article("Written after skew"))
        .unwrap();
    assert_eq!(second.article.created_at, future);
    assert_eq!(second.article.updated_at, second.article.created_at);
}

#[test]
fn duplicate_slug_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    service.create_article(&new_article("Same Title Here")).unwrap();
    let err = service
        .create_article(&new_article("same title   here"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict(Conflict::ArticleSlug(ref slug)) if slug == "same-title-here"
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn update_keeps_slug_and_moves_updated_at_forward() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let created = service
        .create_article(&new_article("Original article title"))
        .unwrap();

    let updated = service
        .update_article(
            created.article.id,
            &ArticlePatch {
                title: Some("A completely new title".to_string()),
                image: Some("https://cdn.example.com/cover.png".to_string()),
                ..ArticlePatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.article.title, "A completely new title");
    assert_eq!(updated.article.slug, "original-article-title");
    assert_eq!(updated.article.author, "Ana Torres");
    assert_eq!(updated.article.image, "https://cdn.example.com/cover.png");
    assert!(updated.article.updated_at >= created.article.updated_at);
    assert_eq!(updated.article.created_at, created.article.created_at);
}

#[test]
fn updated_at_never_moves_backwards() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let created = service
        .create_article(&new_article("Clock skew article"))
        .unwrap();
    let future = i64::MAX / 2;
    conn.execute(
        "UPDATE articles SET updated_at = ?1 WHERE id = ?2;",
        rusqlite::params![future, created.article.id.to_string()],
    )
    .unwrap();

    let updated = service
        .update_article(
            created.article.id,
            &ArticlePatch {
                body: Some("new body".to_string()),
                ..ArticlePatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.article.updated_at, future);
}

#[test]
fn store_rejects_direct_slug_changes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let created = service
        .create_article(&new_article("Immutable slug article"))
        .unwrap();

    let err = conn
        .execute(
            "UPDATE articles SET slug = 'changed' WHERE id = ?1;",
            [created.article.id.to_string()],
        )
        .unwrap_err();
    assert!(err.to_string().contains("immutable"));
}

#[test]
fn update_validates_patch_and_reports_missing_article() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let created = service
        .create_article(&new_article("Validated update target"))
        .unwrap();

    let err = service
        .update_article(
            created.article.id,
            &ArticlePatch {
                title: Some("short".to_string()),
                ..ArticlePatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let missing = Uuid::new_v4();
    let err = service
        .update_article(missing, &ArticlePatch::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::ArticleNotFound(id) if id == missing));
}

#[test]
fn deactivate_keeps_row_and_associations() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let tags = SqliteTagRepository::try_new(&conn).unwrap();
    let associations = SqliteAssociationRepository::try_new(&conn).unwrap();

    let created = service
        .create_article(&new_article("Soon to be inactive"))
        .unwrap();
    let tag = tags
        .create_tag(&NewTag {
            name: "go".to_string(),
            color: "#00add8".to_string(),
        })
        .unwrap();
    let association = associations
        .create_association(created.article.id, tag.id, true)
        .unwrap();

    service.deactivate_article(created.article.id).unwrap();

    let loaded = service.get_article(created.article.id).unwrap();
    assert!(!loaded.article.is_active);
    assert_eq!(loaded.article.title, created.article.title);
    assert_eq!(
        associations
            .list_for_article(created.article.id, false)
            .unwrap(),
        vec![association]
    );
    assert!(service
        .get_article_by_slug(&created.article.slug)
        .unwrap()
        .is_none());
}

#[test]
fn deactivate_missing_article_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service.deactivate_article(Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn patching_is_active_reactivates_article() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let created = service
        .create_article(&new_article("Comes back to life"))
        .unwrap();
    service.deactivate_article(created.article.id).unwrap();

    let reactivated = service
        .update_article(
            created.article.id,
            &ArticlePatch {
                is_active: Some(true),
                ..ArticlePatch::default()
            },
        )
        .unwrap();
    assert!(reactivated.article.is_active);
}

#[test]
fn purge_cascades_to_associations() {
    let conn = open_db_in_memory().unwrap();
    let articles = SqliteArticleRepository::try_new(&conn).unwrap();
    let tags = SqliteTagRepository::try_new(&conn).unwrap();
    let associations = SqliteAssociationRepository::try_new(&conn).unwrap();

    let article = articles
        .create_article(&new_article("Hard deleted article"))
        .unwrap();
    let tag = tags
        .create_tag(&NewTag {
            name: "rust".to_string(),
            color: "#dea584".to_string(),
        })
        .unwrap();
    associations
        .create_association(article.article.id, tag.id, true)
        .unwrap();

    articles.purge_article(article.article.id).unwrap();

    assert!(articles
        .get_article(article.article.id, true)
        .unwrap()
        .is_none());
    assert!(associations.list_for_tag(tag.id).unwrap().is_empty());
    assert!(tags.get_tag(tag.id).unwrap().is_some());
}

#[test]
fn repository_requires_migrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteArticleRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

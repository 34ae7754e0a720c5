//! Postgres repository behaviour.
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test postgres_books -- --ignored

use bookshelf::app;
use bookshelf::books::models::{BookPatch, NewBook};
use bookshelf::books::repository::{BookRepository, PgBookRepository};
use bookshelf_db::Database;
use bookshelf_kernel::settings::DatabaseSettings;
use chrono::NaiveDate;
use uuid::Uuid;

async fn repository() -> PgBookRepository {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let settings = DatabaseSettings {
        url,
        max_connections: 4,
        ..DatabaseSettings::default()
    };
    let database = Database::connect(&settings).await.expect("pool creation failed");

    let registry = app::build_registry(app::Storage::in_memory().repository).unwrap();
    app::init_schema(&database, &registry).await.unwrap();

    PgBookRepository::new(database)
}

fn new_book(title: &str) -> NewBook {
    NewBook {
        title: title.to_string(),
        author: "Octavia E. Butler".to_string(),
        publisher: "Four Walls Eight Windows".to_string(),
        published_date: NaiveDate::from_ymd_opt(1993, 10, 1).unwrap(),
        page_count: 345,
        language: "en".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn create_get_update_delete() {
    let repo = repository().await;

    let created = repo.create(new_book("Parable of the Sower")).await.unwrap();
    assert_eq!(created.created_at, created.updated_at);
    assert_eq!(repo.get(created.uid).await.unwrap(), Some(created.clone()));

    let patch = BookPatch {
        title: Some("Parable of the Talents".to_string()),
        ..BookPatch::default()
    };
    let updated = repo.update(created.uid, patch).await.unwrap().unwrap();
    assert_eq!(updated.title, "Parable of the Talents");
    assert_eq!(updated.author, created.author);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    let unchanged = repo
        .update(created.uid, BookPatch::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged, updated);

    assert!(repo.delete(created.uid).await.unwrap());
    assert!(repo.get(created.uid).await.unwrap().is_none());
    assert!(!repo.delete(created.uid).await.unwrap());
}

#[tokio::test]
#[ignore = "requires database"]
async fn list_places_newer_books_first() {
    let repo = repository().await;
    let first = repo.create(new_book("Kindred")).await.unwrap();
    let second = repo.create(new_book("Dawn")).await.unwrap();

    let uids: Vec<Uuid> = repo.list().await.unwrap().iter().map(|b| b.uid).collect();
    let first_pos = uids.iter().position(|uid| *uid == first.uid).unwrap();
    let second_pos = uids.iter().position(|uid| *uid == second.uid).unwrap();
    assert!(second_pos < first_pos);
}

#[tokio::test]
#[ignore = "requires database"]
async fn missing_uid_is_not_an_error() {
    let repo = repository().await;
    let uid = Uuid::now_v7();

    assert!(repo.get(uid).await.unwrap().is_none());
    assert!(repo
        .update(
            uid,
            BookPatch {
                title: Some("Ghost".to_string()),
                ..BookPatch::default()
            }
        )
        .await
        .unwrap()
        .is_none());
    assert!(!repo.delete(uid).await.unwrap());
}

#[tokio::test]
#[ignore = "requires database"]
async fn constraint_violation_rolls_back_whole_update() {
    let repo = repository().await;
    let created = repo.create(new_book("Wild Seed")).await.unwrap();

    let patch = BookPatch {
        title: Some("Mind of My Mind".to_string()),
        author: Some("Someone Else".to_string()),
        page_count: Some(-3),
        ..BookPatch::default()
    };
    let err = repo.update(created.uid, patch).await.unwrap_err();
    assert_eq!(err.constraint(), Some("books_page_count_check"));

    let stored = repo.get(created.uid).await.unwrap().unwrap();
    assert_eq!(stored, created);
}

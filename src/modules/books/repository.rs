//! Swappable storage behind the book endpoints.

use async_trait::async_trait;
use bookshelf_db::{Database, PersistenceError};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{self, Book, BookPatch, NewBook};
use super::service::BookService;

/// Book storage capability used by the HTTP layer.
///
/// Absence is an outcome, not an error: `get` and `update` return `None`,
/// `delete` returns `false`.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    async fn list(&self) -> Result<Vec<Book>, PersistenceError>;

    async fn get(&self, uid: Uuid) -> Result<Option<Book>, PersistenceError>;

    async fn create(&self, input: NewBook) -> Result<Book, PersistenceError>;

    async fn update(&self, uid: Uuid, patch: BookPatch) -> Result<Option<Book>, PersistenceError>;

    async fn delete(&self, uid: Uuid) -> Result<bool, PersistenceError>;
}

/// PostgreSQL-backed repository; one scoped session per call.
#[derive(Debug, Clone)]
pub struct PgBookRepository {
    db: Database,
    service: BookService,
}

impl PgBookRepository {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            service: BookService,
        }
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list(&self) -> Result<Vec<Book>, PersistenceError> {
        let service = self.service;
        self.db
            .scoped(move |session| Box::pin(async move { service.list_books(session).await }))
            .await
    }

    async fn get(&self, uid: Uuid) -> Result<Option<Book>, PersistenceError> {
        let service = self.service;
        self.db
            .scoped(move |session| Box::pin(async move { service.get_book(session, uid).await }))
            .await
    }

    async fn create(&self, input: NewBook) -> Result<Book, PersistenceError> {
        let service = self.service;
        self.db
            .scoped(move |session| {
                Box::pin(async move { service.create_book(session, input).await })
            })
            .await
    }

    async fn update(&self, uid: Uuid, patch: BookPatch) -> Result<Option<Book>, PersistenceError> {
        let service = self.service;
        self.db
            .scoped(move |session| {
                Box::pin(async move { service.update_book(session, uid, patch).await })
            })
            .await
    }

    async fn delete(&self, uid: Uuid) -> Result<bool, PersistenceError> {
        let service = self.service;
        self.db
            .scoped(move |session| {
                Box::pin(async move { service.delete_book(session, uid).await })
            })
            .await
    }
}

/// Process-local repository. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryBookRepository {
    // Insertion order; newest last
    books: RwLock<Vec<Book>>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<Book>, PersistenceError> {
        let books = self.books.read().await;
        let mut listed: Vec<Book> = books.iter().rev().cloned().collect();
        // Stable sort: equal timestamps keep newest-inserted first
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn get(&self, uid: Uuid) -> Result<Option<Book>, PersistenceError> {
        let books = self.books.read().await;
        Ok(books.iter().find(|book| book.uid == uid).cloned())
    }

    async fn create(&self, input: NewBook) -> Result<Book, PersistenceError> {
        let book = Book::create(input, models::now());
        self.books.write().await.push(book.clone());
        Ok(book)
    }

    async fn update(&self, uid: Uuid, patch: BookPatch) -> Result<Option<Book>, PersistenceError> {
        let mut books = self.books.write().await;
        let Some(book) = books.iter_mut().find(|book| book.uid == uid) else {
            return Ok(None);
        };

        if !patch.is_empty() {
            let stamp = models::next_update_stamp(book.updated_at);
            book.apply(patch, stamp);
        }
        Ok(Some(book.clone()))
    }

    async fn delete(&self, uid: Uuid) -> Result<bool, PersistenceError> {
        let mut books = self.books.write().await;
        match books.iter().position(|book| book.uid == uid) {
            Some(index) => {
                books.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_book(title: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Ursula K. Le Guin".to_string(),
            publisher: "Ace".to_string(),
            published_date: NaiveDate::from_ymd_opt(1969, 3, 1).unwrap(),
            page_count: 286,
            language: "en".to_string(),
        }
    }

    #[tokio::test]
    async fn list_of_empty_store_is_empty() {
        let repo = InMemoryBookRepository::new();
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let repo = InMemoryBookRepository::new();
        let created = repo.create(new_book("The Left Hand of Darkness")).await.unwrap();

        let fetched = repo.get(created.uid).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let repo = InMemoryBookRepository::new();
        let a = repo.create(new_book("A")).await.unwrap();
        let b = repo.create(new_book("B")).await.unwrap();
        let c = repo.create(new_book("C")).await.unwrap();

        let uids: Vec<Uuid> = repo.list().await.unwrap().iter().map(|b| b.uid).collect();
        assert_eq!(uids, vec![c.uid, b.uid, a.uid]);
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let repo = InMemoryBookRepository::new();
        let created = repo.create(new_book("Rocannon's World")).await.unwrap();

        let patch = BookPatch {
            title: Some("Planet of Exile".to_string()),
            ..BookPatch::default()
        };
        let updated = repo.update(created.uid, patch).await.unwrap().unwrap();

        assert_eq!(updated.title, "Planet of Exile");
        assert_eq!(updated.author, created.author);
        assert_eq!(updated.publisher, created.publisher);
        assert_eq!(updated.page_count, created.page_count);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn empty_update_returns_row_unchanged() {
        let repo = InMemoryBookRepository::new();
        let created = repo.create(new_book("The Dispossessed")).await.unwrap();

        let unchanged = repo
            .update(created.uid, BookPatch::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn missing_book_is_an_outcome_not_an_error() {
        let repo = InMemoryBookRepository::new();
        let uid = Uuid::now_v7();

        assert!(repo.get(uid).await.unwrap().is_none());
        assert!(repo
            .update(uid, BookPatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(!repo.delete(uid).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let repo = InMemoryBookRepository::new();
        let keep = repo.create(new_book("Keep")).await.unwrap();
        let gone = repo.create(new_book("Gone")).await.unwrap();

        assert!(repo.delete(gone.uid).await.unwrap());
        assert!(repo.get(gone.uid).await.unwrap().is_none());
        assert!(!repo.delete(gone.uid).await.unwrap());
        assert_eq!(repo.list().await.unwrap(), vec![keep]);
    }

    #[tokio::test]
    async fn concurrent_creates_are_all_kept() {
        let repo = std::sync::Arc::new(InMemoryBookRepository::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let repo = std::sync::Arc::clone(&repo);
                tokio::spawn(async move { repo.create(new_book(&format!("Book {i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.list().await.unwrap().len(), 16);
    }
}

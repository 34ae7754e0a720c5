//! SQL against the `books` table.
//!
//! Every operation runs on a session supplied by the caller, who owns the
//! transaction boundary. Nothing here commits.

use bookshelf_db::{PersistenceError, Session};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::models::{self, Book, BookPatch, NewBook};

const BOOK_COLUMNS: &str =
    "uid, title, author, publisher, published_date, page_count, language, created_at, updated_at";

/// Statement builder for book rows
#[derive(Debug, Clone, Copy, Default)]
pub struct BookService;

impl BookService {
    /// All books, newest first.
    pub async fn list_books(&self, session: &mut Session) -> Result<Vec<Book>, PersistenceError> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at DESC, uid DESC"
        ))
        .fetch_all(session.conn())
        .await?;

        Ok(books)
    }

    /// Look a book up by primary key; `None` when no row matches.
    pub async fn get_book(
        &self,
        session: &mut Session,
        uid: Uuid,
    ) -> Result<Option<Book>, PersistenceError> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE uid = $1"
        ))
        .bind(uid)
        .fetch_optional(session.conn())
        .await?;

        Ok(book)
    }

    /// Insert a new book and return the stored row.
    pub async fn create_book(
        &self,
        session: &mut Session,
        input: NewBook,
    ) -> Result<Book, PersistenceError> {
        let book = Book::create(input, models::now());

        let stored = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books ({BOOK_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(book.uid)
        .bind(book.title)
        .bind(book.author)
        .bind(book.publisher)
        .bind(book.published_date)
        .bind(book.page_count)
        .bind(book.language)
        .bind(book.created_at)
        .bind(book.updated_at)
        .fetch_one(session.conn())
        .await?;

        Ok(stored)
    }

    /// Overwrite the fields present in `patch`.
    ///
    /// `None` when the book does not exist. An empty patch returns the stored
    /// row as is, without touching `updated_at`.
    pub async fn update_book(
        &self,
        session: &mut Session,
        uid: Uuid,
        patch: BookPatch,
    ) -> Result<Option<Book>, PersistenceError> {
        // Row lock keeps the timestamp computation consistent with concurrent writers
        let existing = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE uid = $1 FOR UPDATE"
        ))
        .bind(uid)
        .fetch_optional(session.conn())
        .await?;

        let Some(existing) = existing else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(existing));
        }

        let mut query = QueryBuilder::<Postgres>::new("UPDATE books SET ");
        let mut assignments = query.separated(", ");
        if let Some(title) = patch.title {
            assignments.push("title = ").push_bind_unseparated(title);
        }
        if let Some(author) = patch.author {
            assignments.push("author = ").push_bind_unseparated(author);
        }
        if let Some(publisher) = patch.publisher {
            assignments.push("publisher = ").push_bind_unseparated(publisher);
        }
        if let Some(published_date) = patch.published_date {
            assignments
                .push("published_date = ")
                .push_bind_unseparated(published_date);
        }
        if let Some(page_count) = patch.page_count {
            assignments.push("page_count = ").push_bind_unseparated(page_count);
        }
        if let Some(language) = patch.language {
            assignments.push("language = ").push_bind_unseparated(language);
        }
        assignments
            .push("updated_at = ")
            .push_bind_unseparated(models::next_update_stamp(existing.updated_at));

        query
            .push(" WHERE uid = ")
            .push_bind(uid)
            .push(" RETURNING ")
            .push(BOOK_COLUMNS);

        let updated = query
            .build_query_as::<Book>()
            .fetch_optional(session.conn())
            .await?;

        Ok(updated)
    }

    /// Hard-delete a book. `false` when there was nothing to delete.
    pub async fn delete_book(
        &self,
        session: &mut Session,
        uid: Uuid,
    ) -> Result<bool, PersistenceError> {
        if self.get_book(session, uid).await?.is_none() {
            return Ok(false);
        }

        let result = sqlx::query("DELETE FROM books WHERE uid = $1")
            .bind(uid)
            .execute(session.conn())
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

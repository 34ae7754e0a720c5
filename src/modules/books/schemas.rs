//! Shapes crossing the HTTP boundary and their validation rules.

use bookshelf_http::Validate;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::models::{Book, BookPatch, NewBook};

/// Body of `POST /books`. Server-assigned fields are not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub publisher: String,
    /// `YYYY-MM-DD`
    pub published_date: NaiveDate,
    pub page_count: i32,
    pub language: String,
}

/// Body of `PATCH /books/{id}`.
///
/// Every field is optional. An absent field and an explicit `null` both
/// leave the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Book as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookResponse {
    pub uid: Uuid,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_date: NaiveDate,
    pub page_count: i32,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn check_not_blank(details: &mut Vec<serde_json::Value>, field: &str, value: Option<&str>) {
    if value.is_some_and(|v| v.trim().is_empty()) {
        details.push(json!({ "field": field, "error": "must not be blank" }));
    }
}

fn check_page_count(details: &mut Vec<serde_json::Value>, value: Option<i32>) {
    if value.is_some_and(|v| v < 0) {
        details.push(json!({ "field": "page_count", "error": "must be greater than or equal to 0" }));
    }
}

fn finish(details: Vec<serde_json::Value>) -> Result<(), Vec<serde_json::Value>> {
    if details.is_empty() {
        Ok(())
    } else {
        Err(details)
    }
}

impl Validate for CreateBookRequest {
    fn validate(&self) -> Result<(), Vec<serde_json::Value>> {
        let mut details = Vec::new();
        check_not_blank(&mut details, "title", Some(&self.title));
        check_not_blank(&mut details, "author", Some(&self.author));
        check_not_blank(&mut details, "publisher", Some(&self.publisher));
        check_page_count(&mut details, Some(self.page_count));
        finish(details)
    }
}

impl Validate for UpdateBookRequest {
    fn validate(&self) -> Result<(), Vec<serde_json::Value>> {
        let mut details = Vec::new();
        check_not_blank(&mut details, "title", self.title.as_deref());
        check_not_blank(&mut details, "author", self.author.as_deref());
        check_not_blank(&mut details, "publisher", self.publisher.as_deref());
        check_page_count(&mut details, self.page_count);
        finish(details)
    }
}

impl From<CreateBookRequest> for NewBook {
    fn from(request: CreateBookRequest) -> Self {
        Self {
            title: request.title,
            author: request.author,
            publisher: request.publisher,
            published_date: request.published_date,
            page_count: request.page_count,
            language: request.language,
        }
    }
}

impl From<UpdateBookRequest> for BookPatch {
    fn from(request: UpdateBookRequest) -> Self {
        Self {
            title: request.title,
            author: request.author,
            publisher: request.publisher,
            published_date: request.published_date,
            page_count: request.page_count,
            language: request.language,
        }
    }
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            uid: book.uid,
            title: book.title,
            author: book.author,
            publisher: book.publisher,
            published_date: book.published_date,
            page_count: book.page_count,
            language: book.language,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

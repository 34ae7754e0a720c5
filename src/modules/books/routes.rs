//! HTTP handlers for `/books`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_db::PersistenceError;
use bookshelf_http::{AppError, ValidJson};
use uuid::Uuid;

use super::repository::BookRepository;
use super::schemas::{BookResponse, CreateBookRequest, UpdateBookRequest};

type Repository = Arc<dyn BookRepository>;

const NOT_FOUND: &str = "Not Found";

/// Routes relative to the module mount point
pub fn router(repository: Repository) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).patch(update_book).delete(delete_book),
        )
        .with_state(repository)
}

/// A path id that is not a UUID cannot name a book.
fn parse_uid(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::not_found(NOT_FOUND))
}

/// Store failure as a 500, keeping the violated constraint in the log.
fn store_error(err: PersistenceError, action: impl Into<String>) -> AppError {
    let action = action.into();
    if let Some(constraint) = err.constraint() {
        tracing::warn!(constraint, "{action}: constraint violated");
    }
    AppError::from(anyhow::Error::new(err).context(action))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

/// GET /books - all books, newest first
async fn list_books(State(repo): State<Repository>) -> Result<Json<Vec<BookResponse>>, AppError> {
    let books = repo
        .list()
        .await
        .map_err(|err| store_error(err, "failed to list books"))?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// POST /books
async fn create_book(
    State(repo): State<Repository>,
    ValidJson(request): ValidJson<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let book = repo
        .create(request.into())
        .await
        .map_err(|err| store_error(err, "failed to create book"))?;

    tracing::info!(uid = %book.uid, backend = repo.backend(), "book created");
    Ok((StatusCode::CREATED, Json(book.into())))
}

/// GET /books/{id}
async fn get_book(
    State(repo): State<Repository>,
    Path(id): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let uid = parse_uid(&id)?;
    let book = repo
        .get(uid)
        .await
        .map_err(|err| store_error(err, format!("failed to load book {uid}")))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    Ok(Json(book.into()))
}

/// PATCH /books/{id}
async fn update_book(
    State(repo): State<Repository>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateBookRequest>,
) -> Result<Json<BookResponse>, AppError> {
    let uid = parse_uid(&id)?;
    let book = repo
        .update(uid, request.into())
        .await
        .map_err(|err| store_error(err, format!("failed to update book {uid}")))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    tracing::info!(uid = %book.uid, backend = repo.backend(), "book updated");
    Ok(Json(book.into()))
}

/// DELETE /books/{id}
async fn delete_book(
    State(repo): State<Repository>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let uid = parse_uid(&id)?;
    let deleted = repo
        .delete(uid)
        .await
        .map_err(|err| store_error(err, format!("failed to delete book {uid}")))?;

    if !deleted {
        return Err(AppError::not_found(NOT_FOUND));
    }

    tracing::info!(uid = %uid, backend = repo.backend(), "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

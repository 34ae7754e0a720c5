pub mod models;
pub mod repository;
pub mod routes;
pub mod schemas;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use repository::BookRepository;

/// Book catalogue: CRUD endpoints over a pluggable repository
pub struct BooksModule {
    repository: Arc<dyn BookRepository>,
}

impl BooksModule {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = self.repository.backend(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(Arc::clone(&self.repository))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "001_create_books",
                up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    uid            UUID        PRIMARY KEY,
                    title          TEXT        NOT NULL,
                    author         TEXT        NOT NULL,
                    publisher      TEXT        NOT NULL,
                    published_date DATE        NOT NULL,
                    page_count     INTEGER     NOT NULL CHECK (page_count >= 0),
                    language       TEXT        NOT NULL,
                    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
                    updated_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
                    CHECK (updated_at >= created_at)
                );
                "#,
            },
            Migration {
                id: "002_books_created_at_index",
                up: r#"
                CREATE INDEX IF NOT EXISTS books_created_at_idx
                    ON books (created_at DESC, uid DESC);
                "#,
            },
        ]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn id_parameter() -> serde_json::Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "description": "Book uid",
        "schema": { "type": "string", "format": "uuid" }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book_fields = json!({
        "title": { "type": "string", "description": "Title of the book" },
        "author": { "type": "string", "description": "Author of the book" },
        "publisher": { "type": "string", "description": "Publisher of the book" },
        "published_date": { "type": "string", "format": "date", "description": "Publication date" },
        "page_count": { "type": "integer", "minimum": 0, "description": "Number of pages" },
        "language": { "type": "string", "description": "Language of the text" }
    });

    let mut book_properties = book_fields.clone();
    book_properties["uid"] = json!({ "type": "string", "format": "uuid", "description": "Unique identifier for the book" });
    book_properties["created_at"] = json!({ "type": "string", "format": "date-time" });
    book_properties["updated_at"] = json!({ "type": "string", "format": "date-time" });

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books, newest first",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "List of books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": {
                        "201": book_response("Created book"),
                        "422": error_response("Validation error"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("Book not found")
                    }
                },
                "patch": {
                    "summary": "Update some fields of a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/UpdateBook" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Updated book"),
                        "404": error_response("Book not found"),
                        "422": error_response("Validation error")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": error_response("Book not found")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "text/plain": { "schema": { "type": "string" } }
                            }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": book_properties,
                    "required": [
                        "uid", "title", "author", "publisher", "published_date",
                        "page_count", "language", "created_at", "updated_at"
                    ]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": book_fields.clone(),
                    "required": [
                        "title", "author", "publisher", "published_date",
                        "page_count", "language"
                    ]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": book_fields
                }
            }
        }
    })
}

/// Create the books module over the given repository
pub fn create_module(repository: Arc<dyn BookRepository>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(repository))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repository::InMemoryBookRepository;

    #[test]
    fn migrations_create_books_table_idempotently() {
        let module = BooksModule::new(Arc::new(InMemoryBookRepository::new()));
        let migrations = module.migrations();

        assert_eq!(migrations[0].id, "001_create_books");
        assert!(migrations
            .iter()
            .all(|m| m.up.contains("IF NOT EXISTS")));
    }

    #[test]
    fn openapi_documents_every_operation() {
        let spec = openapi_fragment();
        let paths = &spec["paths"];

        for method in ["get", "post"] {
            assert!(paths["/"].get(method).is_some(), "missing {method} /");
        }
        for method in ["get", "patch", "delete"] {
            assert!(paths["/{id}"].get(method).is_some(), "missing {method} /{{id}}");
        }
        assert_eq!(
            spec["components"]["schemas"]["Book"]["required"]
                .as_array()
                .unwrap()
                .len(),
            9
        );
    }
}

pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::json;

use service::BookService;
use store::BookStore;

/// The book catalogue: CRUD over the `book` collection.
pub struct BooksModule {
    service: Arc<BookService>,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self {
            service: Arc::new(BookService::new(store)),
        }
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
            in_memory = ctx.settings.database.is_in_memory(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(Arc::clone(&self.service))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                DEFINE TABLE book SCHEMAFULL;
                DEFINE FIELD title          ON book TYPE string ASSERT $value != "";
                DEFINE FIELD author         ON book TYPE string ASSERT $value != "";
                DEFINE FIELD isbn           ON book TYPE string ASSERT $value != "";
                DEFINE FIELD published_date ON book TYPE string;
                DEFINE FIELD description    ON book TYPE option<string>;
                DEFINE INDEX book_isbn_unique ON book FIELDS isbn UNIQUE;
                "#,
        }]
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

/// Create the books module over the given store
pub fn create_module(store: Arc<dyn BookStore>) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
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

fn json_response(description: &str, schema: &serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": schema }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book_ref = json!({ "$ref": "#/components/schemas/Book" });
    let id_param = json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    });

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("All books", &json!({ "type": "array", "items": book_ref })),
                        "500": error_response("Store unavailable")
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
                        "201": json_response("Created book", &book_ref),
                        "400": error_response("Validation error or duplicate isbn"),
                        "500": error_response("Store unavailable")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": json_response("The book", &book_ref),
                        "404": error_response("Book not found"),
                        "500": error_response("Store unavailable")
                    }
                },
                "put": {
                    "summary": "Update a book",
                    "description": "Absent fields are kept; `description: null` clears the description.",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/UpdateBook" }
                            }
                        }
                    },
                    "responses": {
                        "200": json_response("Updated book", &book_ref),
                        "400": error_response("Validation error or duplicate isbn"),
                        "404": error_response("Book not found"),
                        "500": error_response("Store unavailable")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": json_response("Deleted", &json!({ "$ref": "#/components/schemas/Message" })),
                        "404": error_response("Book not found"),
                        "500": error_response("Store unavailable")
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
                    "properties": {
                        "id": { "type": "string", "description": "Generated identifier" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "isbn": { "type": "string", "description": "Unique across all books" },
                        "publishedDate": { "type": "string", "format": "date-time" },
                        "description": { "type": "string" }
                    },
                    "required": ["id", "title", "author", "isbn", "publishedDate"]
                },
                "CreateBook": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "isbn": { "type": "string" },
                        "publishedDate": {
                            "type": "string",
                            "description": "RFC 3339 timestamp or YYYY-MM-DD; defaults to creation time"
                        },
                        "description": { "type": "string" }
                    },
                    "required": ["title", "author", "isbn"]
                },
                "UpdateBook": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "id": { "type": "string", "description": "Must equal the path id if present" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "isbn": { "type": "string" },
                        "publishedDate": { "type": "string" },
                        "description": { "type": ["string", "null"] }
                    }
                },
                "Message": {
                    "type": "object",
                    "properties": {
                        "message": { "type": "string" }
                    },
                    "required": ["message"]
                }
            }
        }
    })
}

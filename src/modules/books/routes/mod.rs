//! HTTP handlers for `/api/books`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_http::{AppError, JsonBody};

use super::{
    models::{Book, CreateBook, Message, UpdateBook},
    service::{parse_id, BookService},
};

/// Routes relative to the module mount point.
pub fn router(service: Arc<BookService>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(service)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

/// GET /api/books
#[tracing::instrument(skip_all)]
async fn list_books(State(service): State<Arc<BookService>>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(service.list().await?))
}

/// GET /api/books/{id}
#[tracing::instrument(skip(service))]
async fn get_book(
    State(service): State<Arc<BookService>>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(service.get(&id).await?))
}

/// POST /api/books
///
/// - `201 Created`: the stored book
/// - `400 Bad Request`: missing fields, bad date, duplicate isbn
#[tracing::instrument(skip_all)]
async fn create_book(
    State(service): State<Arc<BookService>>,
    JsonBody(input): JsonBody<CreateBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let book = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /api/books/{id}
#[tracing::instrument(skip(service, patch))]
async fn update_book(
    State(service): State<Arc<BookService>>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<UpdateBook>,
) -> Result<Json<Book>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(service.update(&id, patch).await?))
}

/// DELETE /api/books/{id}
#[tracing::instrument(skip(service))]
async fn delete_book(
    State(service): State<Arc<BookService>>,
    Path(id): Path<String>,
) -> Result<Json<Message>, AppError> {
    let id = parse_id(&id)?;
    service.delete(&id).await?;
    Ok(Json(Message::new("book deleted")))
}

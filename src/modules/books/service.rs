use std::sync::Arc;

use bookshelf_http::AppError;
use thiserror::Error;
use time::OffsetDateTime;

use super::{
    models::{Book, BookId, CreateBook, FieldError, UpdateBook},
    store::{BookStore, StoreError},
};

#[derive(Debug, Error)]
pub enum BookError {
    #[error("book not found")]
    NotFound,

    #[error("invalid book")]
    Invalid(Vec<FieldError>),

    #[error("{field} '{value}' already exists")]
    Duplicate { field: &'static str, value: String },

    #[error(transparent)]
    Store(anyhow::Error),
}

impl From<StoreError> for BookError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field, value } => BookError::Duplicate { field, value },
            StoreError::Backend(err) => BookError::Store(err),
        }
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::NotFound => AppError::not_found(err.to_string()),
            BookError::Invalid(ref fields) => {
                let message = format!(
                    "invalid book: {}",
                    fields
                        .iter()
                        .map(|f| format!("{} is {}", f.field, f.error.replace('_', " ")))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                let details = fields
                    .iter()
                    .filter_map(|f| serde_json::to_value(f).ok())
                    .collect();
                AppError::validation(details, message)
            }
            BookError::Duplicate { field, .. } => {
                let details = serde_json::to_value(FieldError::new(field, FieldError::DUPLICATE))
                    .map(|detail| vec![detail])
                    .unwrap_or_default();
                AppError::validation(details, err.to_string())
            }
            BookError::Store(err) => AppError::Internal(err.context("book store failure")),
        }
    }
}

/// Parse a path id. A malformed id can never match a record, so it is
/// reported as not found.
pub fn parse_id(raw: &str) -> Result<BookId, BookError> {
    raw.parse().map_err(|_| BookError::NotFound)
}

/// Book operations over an injected store.
pub struct BookService {
    store: Arc<dyn BookStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Book>, BookError> {
        Ok(self.store.find_all().await?)
    }

    pub async fn get(&self, id: &BookId) -> Result<Book, BookError> {
        self.store.find_by_id(id).await?.ok_or(BookError::NotFound)
    }

    /// Assigns a fresh id; `publishedDate` defaults to now.
    pub async fn create(&self, input: CreateBook) -> Result<Book, BookError> {
        let new_book = input.validate().map_err(BookError::Invalid)?;

        let book = Book {
            id: BookId::new(),
            title: new_book.title,
            author: new_book.author,
            isbn: new_book.isbn,
            published_date: new_book
                .published_date
                .unwrap_or_else(OffsetDateTime::now_utc),
            description: new_book.description,
        };

        self.store.insert(&book).await?;
        tracing::info!(book_id = %book.id, isbn = %book.isbn, "book created");
        Ok(book)
    }

    pub async fn update(&self, id: &BookId, patch: UpdateBook) -> Result<Book, BookError> {
        let current = self.get(id).await?;
        let merged = patch.apply(&current).map_err(BookError::Invalid)?;

        if merged == current {
            return Ok(current);
        }

        // Deleted between the read and the write.
        if !self.store.replace(&merged).await? {
            return Err(BookError::NotFound);
        }
        tracing::info!(book_id = %merged.id, "book updated");
        Ok(merged)
    }

    pub async fn delete(&self, id: &BookId) -> Result<(), BookError> {
        if !self.store.delete(id).await? {
            return Err(BookError::NotFound);
        }
        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }
}

//! Persistence for books.
//!
//! [`SurrealBookStore`] is the production backend; [`InMemoryBookStore`]
//! serves local runs with `database.url = "memory"` and the test suite. Both
//! enforce `isbn` uniqueness at write time.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bookshelf_db::Database;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use thiserror::Error;
use time::OffsetDateTime;

use super::models::{Book, BookId};

/// Table holding book records.
pub const BOOK_TABLE: &str = "book";

const BOOK_FIELDS: &str = "record::id(id) AS id, title, author, isbn, published_date, description";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{field} '{value}' already exists")]
    Duplicate { field: &'static str, value: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Book persistence operations.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Every stored book, in store order.
    async fn find_all(&self) -> Result<Vec<Book>, StoreError>;

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, StoreError>;

    async fn insert(&self, book: &Book) -> Result<(), StoreError>;

    /// Overwrite the record with `book.id`. `false` when no such record exists.
    async fn replace(&self, book: &Book) -> Result<bool, StoreError>;

    /// Hard delete. `false` when no such record exists.
    async fn delete(&self, id: &BookId) -> Result<bool, StoreError>;
}

// ===== InMemoryBookStore =====

#[derive(Debug, Default)]
pub struct InMemoryBookStore {
    books: Mutex<Vec<Book>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn books(&self) -> Result<MutexGuard<'_, Vec<Book>>, StoreError> {
        self.books
            .lock()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("in-memory book store is poisoned")))
    }
}

fn ensure_unique_isbn(books: &[Book], candidate: &Book) -> Result<(), StoreError> {
    if books
        .iter()
        .any(|book| book.id != candidate.id && book.isbn == candidate.isbn)
    {
        return Err(StoreError::Duplicate {
            field: "isbn",
            value: candidate.isbn.clone(),
        });
    }
    Ok(())
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.books()?.clone())
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, StoreError> {
        Ok(self.books()?.iter().find(|book| book.id == *id).cloned())
    }

    async fn insert(&self, book: &Book) -> Result<(), StoreError> {
        let mut books = self.books()?;
        if books.iter().any(|existing| existing.id == book.id) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "book {} already exists",
                book.id
            )));
        }
        ensure_unique_isbn(&books, book)?;
        books.push(book.clone());
        Ok(())
    }

    async fn replace(&self, book: &Book) -> Result<bool, StoreError> {
        let mut books = self.books()?;
        ensure_unique_isbn(&books, book)?;
        match books.iter_mut().find(|existing| existing.id == book.id) {
            Some(existing) => {
                *existing = book.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &BookId) -> Result<bool, StoreError> {
        let mut books = self.books()?;
        let before = books.len();
        books.retain(|book| book.id != *id);
        Ok(books.len() != before)
    }
}

// ===== SurrealBookStore =====

/// Fields written to a `book` record. The record id carries the [`BookId`].
#[derive(Debug, Serialize)]
struct BookContent {
    title: String,
    author: String,
    isbn: String,
    #[serde(with = "time::serde::rfc3339")]
    published_date: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl From<&Book> for BookContent {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            published_date: book.published_date,
            description: book.description.clone(),
        }
    }
}

/// A `book` row as projected by [`BOOK_FIELDS`].
#[derive(Debug, Deserialize)]
struct BookRecord {
    id: String,
    title: String,
    author: String,
    isbn: String,
    #[serde(with = "time::serde::rfc3339")]
    published_date: OffsetDateTime,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<BookRecord> for Book {
    type Error = StoreError;

    fn try_from(record: BookRecord) -> Result<Self, Self::Error> {
        let id = record.id.parse::<BookId>().map_err(|err| {
            StoreError::Backend(anyhow::anyhow!(
                "stored book id '{}' is not a valid id: {}",
                record.id,
                err
            ))
        })?;
        Ok(Book {
            id,
            title: record.title,
            author: record.author,
            isbn: record.isbn,
            published_date: record.published_date,
            description: record.description,
        })
    }
}

/// A row returned by a write, read only to count matches.
#[derive(Debug, Deserialize)]
struct Touched {
    #[serde(rename = "id")]
    _id: RecordId,
}

/// SurrealDB-backed store. Uniqueness comes from the `book_isbn_unique` index.
#[derive(Clone)]
pub struct SurrealBookStore {
    database: Database,
}

impl SurrealBookStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Classify a failed write.
    fn write_error(err: surrealdb::Error, book: &Book) -> StoreError {
        if bookshelf_db::is_unique_violation(&err.to_string()) {
            StoreError::Duplicate {
                field: "isbn",
                value: book.isbn.clone(),
            }
        } else {
            StoreError::Backend(err.into())
        }
    }
}

fn read_error(err: surrealdb::Error) -> StoreError {
    StoreError::Backend(err.into())
}

fn into_books(records: Vec<BookRecord>) -> Result<Vec<Book>, StoreError> {
    records.into_iter().map(Book::try_from).collect()
}

#[async_trait]
impl BookStore for SurrealBookStore {
    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self) -> Result<Vec<Book>, StoreError> {
        let records: Vec<BookRecord> = self
            .database
            .client()
            .query(format!("SELECT {BOOK_FIELDS} FROM {BOOK_TABLE}"))
            .await
            .map_err(read_error)?
            .take(0)
            .map_err(read_error)?;

        into_books(records)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, StoreError> {
        let records: Vec<BookRecord> = self
            .database
            .client()
            .query(format!(
                "SELECT {BOOK_FIELDS} FROM type::thing('{BOOK_TABLE}', $id)"
            ))
            .bind(("id", id.to_string()))
            .await
            .map_err(read_error)?
            .take(0)
            .map_err(read_error)?;

        Ok(into_books(records)?.into_iter().next())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %book.id))]
    async fn insert(&self, book: &Book) -> Result<(), StoreError> {
        self.database
            .client()
            .query(format!(
                "CREATE type::thing('{BOOK_TABLE}', $id) CONTENT $content RETURN NONE"
            ))
            .bind(("id", book.id.to_string()))
            .bind(("content", BookContent::from(book)))
            .await
            .and_then(|response| response.check())
            .map_err(|err| Self::write_error(err, book))?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %book.id))]
    async fn replace(&self, book: &Book) -> Result<bool, StoreError> {
        // UPDATE on a missing record matches nothing and returns no rows.
        let touched: Vec<Touched> = self
            .database
            .client()
            .query(format!(
                "UPDATE type::thing('{BOOK_TABLE}', $id) CONTENT $content RETURN AFTER"
            ))
            .bind(("id", book.id.to_string()))
            .bind(("content", BookContent::from(book)))
            .await
            .and_then(|response| response.check())
            .map_err(|err| Self::write_error(err, book))?
            .take(0)
            .map_err(read_error)?;

        Ok(!touched.is_empty())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, id: &BookId) -> Result<bool, StoreError> {
        let touched: Vec<Touched> = self
            .database
            .client()
            .query(format!(
                "DELETE type::thing('{BOOK_TABLE}', $id) RETURN BEFORE"
            ))
            .bind(("id", id.to_string()))
            .await
            .and_then(|response| response.check())
            .map_err(read_error)?
            .take(0)
            .map_err(read_error)?;

        Ok(!touched.is_empty())
    }
}

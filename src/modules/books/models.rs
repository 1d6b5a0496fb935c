use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};
use uuid::Uuid;

/// Identifier of a stored book. Time-ordered, so never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for BookId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A book in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Unique across all books
    pub isbn: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_date: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Confirmation body for operations that return no resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub error: &'static str,
}

impl FieldError {
    pub const REQUIRED: &'static str = "required";
    pub const BLANK: &'static str = "blank";
    pub const INVALID_DATE: &'static str = "invalid_date";
    pub const IMMUTABLE: &'static str = "immutable";
    pub const DUPLICATE: &'static str = "duplicate";

    pub const fn new(field: &'static str, error: &'static str) -> Self {
        Self { field, error }
    }
}

/// Request body for creating a book.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub published_date: Option<String>,
    pub description: Option<String>,
}

/// A create request that passed validation. `published_date` is still
/// optional; the service fills in the creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_date: Option<OffsetDateTime>,
    pub description: Option<String>,
}

impl CreateBook {
    /// Check every field, reporting all problems at once.
    pub fn validate(self) -> Result<NewBook, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = required_text("title", self.title, &mut errors);
        let author = required_text("author", self.author, &mut errors);
        let isbn = required_text("isbn", self.isbn, &mut errors);
        let published_date = match self.published_date {
            Some(raw) => parse_date("publishedDate", &raw, &mut errors),
            None => None,
        };

        match (title, author, isbn) {
            (Some(title), Some(author), Some(isbn)) if errors.is_empty() => Ok(NewBook {
                title,
                author,
                isbn,
                published_date,
                description: self.description,
            }),
            _ => Err(errors),
        }
    }
}

/// Request body for updating a book. Absent fields keep their stored value.
///
/// `null` clears `description`; it is rejected for every other field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBook {
    /// Tolerated so a fetched record can be sent back as is
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub author: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub isbn: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub published_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

impl UpdateBook {
    /// Merge onto `current`, re-validating every touched field.
    pub fn apply(self, current: &Book) -> Result<Book, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut merged = current.clone();

        if let Some(id) = self.id {
            if id.parse::<BookId>().ok() != Some(current.id) {
                errors.push(FieldError::new("id", FieldError::IMMUTABLE));
            }
        }

        if let Some(title) = self.title {
            if let Some(title) = required_text("title", title, &mut errors) {
                merged.title = title;
            }
        }
        if let Some(author) = self.author {
            if let Some(author) = required_text("author", author, &mut errors) {
                merged.author = author;
            }
        }
        if let Some(isbn) = self.isbn {
            if let Some(isbn) = required_text("isbn", isbn, &mut errors) {
                merged.isbn = isbn;
            }
        }
        match self.published_date {
            Some(Some(raw)) => {
                if let Some(date) = parse_date("publishedDate", &raw, &mut errors) {
                    merged.published_date = date;
                }
            }
            Some(None) => errors.push(FieldError::new("publishedDate", FieldError::REQUIRED)),
            None => {}
        }
        if let Some(description) = self.description {
            merged.description = description;
        }

        if errors.is_empty() {
            Ok(merged)
        } else {
            Err(errors)
        }
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field
/// (`None`, via `#[serde(default)]`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn required_text(
    field: &'static str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        None => {
            errors.push(FieldError::new(field, FieldError::REQUIRED));
            None
        }
        Some(text) if text.trim().is_empty() => {
            errors.push(FieldError::new(field, FieldError::BLANK));
            None
        }
        Some(text) => Some(text),
    }
}

fn parse_date(
    field: &'static str,
    raw: &str,
    errors: &mut Vec<FieldError>,
) -> Option<OffsetDateTime> {
    match parse_published_date(raw) {
        Some(date) => Some(date),
        None => {
            errors.push(FieldError::new(field, FieldError::INVALID_DATE));
            None
        }
    }
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_published_date(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(timestamp) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(timestamp);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

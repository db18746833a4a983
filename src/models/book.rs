//! Book model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Availability status of a book.
///
/// Stored as `books.status_id`. `Rented` must hold exactly when the book has
/// an unreturned rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[repr(i32)]
pub enum BookStatus {
    Available = 1,
    Rented = 2,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::Rented => "Rented",
        }
    }
}

impl Default for BookStatus {
    fn default() -> Self {
        BookStatus::Available
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Book row as stored
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub publisher_id: Option<i32>,
    pub genre_id: Option<i32>,
    pub publication_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    pub cover_image_url: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub is_recommended: bool,
    #[sqlx(rename = "status_id")]
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author reference as displayed on a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookAuthor {
    pub id: i32,
    pub name: String,
}

/// Book enriched with denormalized display fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub publisher_id: Option<i32>,
    pub publisher_name: Option<String>,
    pub genre_id: Option<i32>,
    pub genre_name: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    pub cover_image_url: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub is_recommended: bool,
    pub status: BookStatus,
    pub status_name: String,
    /// Authors in the order they were supplied on the last write
    pub authors: Vec<BookAuthor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookDetails {
    pub fn author_ids(&self) -> Vec<i32> {
        self.authors.iter().map(|a| a.id).collect()
    }

    /// Comma-joined author names, as shown in lists
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Row shape of the enriched book query
#[derive(Debug, Clone, FromRow)]
pub struct BookDetailsRow {
    pub id: i32,
    pub title: String,
    pub publisher_id: Option<i32>,
    pub publisher_name: Option<String>,
    pub genre_id: Option<i32>,
    pub genre_name: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    pub cover_image_url: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub is_recommended: bool,
    pub status_id: BookStatus,
    pub author_ids: Vec<i32>,
    pub author_names: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookDetailsRow> for BookDetails {
    fn from(row: BookDetailsRow) -> Self {
        let authors = row
            .author_ids
            .into_iter()
            .zip(row.author_names)
            .map(|(id, name)| BookAuthor { id, name })
            .collect();

        Self {
            id: row.id,
            title: row.title,
            publisher_id: row.publisher_id,
            publisher_name: row.publisher_name,
            genre_id: row.genre_id,
            genre_name: row.genre_name,
            publication_date: row.publication_date,
            isbn: row.isbn,
            cover_image_url: row.cover_image_url,
            description: row.description,
            notes: row.notes,
            is_recommended: row.is_recommended,
            status: row.status_id,
            status_name: row.status_id.as_str().to_string(),
            authors,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Create/update book request.
///
/// Status is not part of it: only the lending ledger changes a book's status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookCreate {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub publisher_id: Option<i32>,
    pub publication_date: Option<NaiveDate>,
    pub isbn: Option<String>,
    pub cover_image_url: Option<String>,
    pub genre_id: Option<i32>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_recommended: bool,
    #[serde(default)]
    #[validate(length(min = 1, message = "At least one author is required"))]
    pub author_ids: Vec<i32>,
}

/// Book search parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Matches title, ISBN or author name (case-insensitive substring)
    pub keyword: Option<String>,
    pub genre_id: Option<i32>,
}

impl BookQuery {
    /// Keyword with surrounding whitespace removed, `None` when blank
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

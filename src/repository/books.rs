//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::book::{Book, BookDetails, BookDetailsRow},
};

use super::like_pattern;

/// Columns of the plain `books` row, in `Book` field order
pub(crate) const BOOK_COLUMNS: &str = r#"
    id, title, publisher_id, genre_id, publication_date, isbn, cover_image_url,
    description, notes, is_recommended, status_id, created_at, updated_at
"#;

/// Enriched book select; callers append WHERE, then `BOOK_DETAILS_GROUP_BY`
const BOOK_DETAILS_SELECT: &str = r#"
    SELECT b.id, b.title,
           b.publisher_id, p.name AS publisher_name,
           b.genre_id, g.name AS genre_name,
           b.publication_date, b.isbn, b.cover_image_url,
           b.description, b.notes, b.is_recommended, b.status_id,
           COALESCE(ARRAY_AGG(a.id ORDER BY ba.position) FILTER (WHERE a.id IS NOT NULL), '{}')::int4[] AS author_ids,
           COALESCE(ARRAY_AGG(a.name ORDER BY ba.position) FILTER (WHERE a.id IS NOT NULL), '{}')::text[] AS author_names,
           b.created_at, b.updated_at
    FROM books b
    LEFT JOIN publishers p ON p.id = b.publisher_id
    LEFT JOIN genres g ON g.id = b.genre_id
    LEFT JOIN book_authors ba ON ba.book_id = b.id
    LEFT JOIN authors a ON a.id = ba.author_id
"#;

const BOOK_DETAILS_GROUP_BY: &str = "GROUP BY b.id, p.name, g.name";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Most recently added books, newest first
    pub async fn get_recent(&self, limit: i64) -> AppResult<Vec<BookDetails>> {
        let query = format!(
            "{} {} ORDER BY b.created_at DESC, b.id DESC LIMIT $1",
            BOOK_DETAILS_SELECT, BOOK_DETAILS_GROUP_BY
        );

        let rows = sqlx::query_as::<_, BookDetailsRow>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl super::BookRepository for BooksRepository {
    async fn search(&self, keyword: Option<&str>, genre_id: Option<i32>) -> AppResult<Vec<BookDetails>> {
        // Author matches go through EXISTS so the aggregated author list stays complete
        let query = format!(
            r#"
            {}
            WHERE ($1::text IS NULL
                   OR b.title ILIKE $1
                   OR b.isbn ILIKE $1
                   OR EXISTS (
                       SELECT 1 FROM book_authors ba2
                       JOIN authors a2 ON a2.id = ba2.author_id
                       WHERE ba2.book_id = b.id AND a2.name ILIKE $1
                   ))
              AND ($2::int4 IS NULL OR b.genre_id = $2)
            {}
            ORDER BY b.title, b.id
            "#,
            BOOK_DETAILS_SELECT, BOOK_DETAILS_GROUP_BY
        );

        let rows = sqlx::query_as::<_, BookDetailsRow>(&query)
            .bind(keyword.map(like_pattern))
            .bind(genre_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    async fn get_details(&self, id: i32) -> AppResult<Option<BookDetails>> {
        let query = format!("{} WHERE b.id = $1 {}", BOOK_DETAILS_SELECT, BOOK_DETAILS_GROUP_BY);

        let row = sqlx::query_as::<_, BookDetailsRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn get_recommended(&self) -> AppResult<Vec<BookDetails>> {
        let query = format!(
            "{} WHERE b.is_recommended {} ORDER BY b.created_at DESC, b.id DESC",
            BOOK_DETAILS_SELECT, BOOK_DETAILS_GROUP_BY
        );

        let rows = sqlx::query_as::<_, BookDetailsRow>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

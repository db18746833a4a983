//! Postgres transactions for multi-row writes.
//!
//! `lock_book` takes a row lock (`SELECT ... FOR UPDATE`) on the book, so two
//! transactions touching the same book run one after the other. The partial
//! unique index `rentals_one_active_per_book` backs this up at the schema level.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookCreate, BookStatus},
        rental::Rental,
    },
};

use super::{books::BOOK_COLUMNS, rentals::RENTAL_COLUMNS};

#[derive(Clone)]
pub struct PgStorage {
    pool: Pool<Postgres>,
}

impl PgStorage {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::Storage for PgStorage {
    async fn begin(&self) -> AppResult<Box<dyn super::Transaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl super::Transaction for PgTransaction {
    async fn lock_book(&mut self, book_id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(book)
    }

    async fn user_exists(&mut self, user_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(exists)
    }

    async fn insert_book(&mut self, book: &BookCreate, status: BookStatus) -> AppResult<i32> {
        let now = Utc::now();

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (
                title, publisher_id, genre_id, publication_date, isbn, cover_image_url,
                description, notes, is_recommended, status_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(book.publisher_id)
        .bind(book.genre_id)
        .bind(book.publication_date)
        .bind(&book.isbn)
        .bind(&book.cover_image_url)
        .bind(&book.description)
        .bind(&book.notes)
        .bind(book.is_recommended)
        .bind(status)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_constraint(e, "Book"))?;

        Ok(id)
    }

    async fn update_book(&mut self, id: i32, book: &BookCreate) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books SET
                title = $1,
                publisher_id = $2,
                genre_id = $3,
                publication_date = $4,
                isbn = $5,
                cover_image_url = $6,
                description = $7,
                notes = $8,
                is_recommended = $9,
                updated_at = $10
            WHERE id = $11
            "#,
        )
        .bind(&book.title)
        .bind(book.publisher_id)
        .bind(book.genre_id)
        .bind(book.publication_date)
        .bind(&book.isbn)
        .bind(&book.cover_image_url)
        .bind(&book.description)
        .bind(&book.notes)
        .bind(book.is_recommended)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_constraint(e, "Book"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_book_authors(&mut self, book_id: i32) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_book_author(&mut self, book_id: i32, author_id: i32, position: i16) -> AppResult<()> {
        sqlx::query("INSERT INTO book_authors (book_id, author_id, position) VALUES ($1, $2, $3)")
            .bind(book_id)
            .bind(author_id)
            .bind(position)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_constraint(e, &format!("Author {}", author_id)))?;

        Ok(())
    }

    async fn update_status(&mut self, book_id: i32, status: BookStatus) -> AppResult<bool> {
        let result = sqlx::query("UPDATE books SET status_id = $1, updated_at = $2 WHERE id = $3")
            .bind(status)
            .bind(Utc::now())
            .bind(book_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_rental(
        &mut self,
        book_id: i32,
        user_id: i32,
        rental_time: DateTime<Utc>,
        due_time: DateTime<Utc>,
    ) -> AppResult<Rental> {
        let rental = sqlx::query_as::<_, Rental>(&format!(
            r#"
            INSERT INTO rentals (book_id, user_id, rental_time, due_time)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            RENTAL_COLUMNS
        ))
        .bind(book_id)
        .bind(user_id)
        .bind(rental_time)
        .bind(due_time)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_constraint(e, "Book is already rented out"))?;

        Ok(rental)
    }

    async fn get_active_rental_by_book_id(&mut self, book_id: i32) -> AppResult<Option<Rental>> {
        let rental = sqlx::query_as::<_, Rental>(&format!(
            "SELECT {} FROM rentals WHERE book_id = $1 AND return_time IS NULL",
            RENTAL_COLUMNS
        ))
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(rental)
    }

    async fn record_return(&mut self, rental_id: i32, return_time: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query("UPDATE rentals SET return_time = $1 WHERE id = $2 AND return_time IS NULL")
            .bind(return_time)
            .bind(rental_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_due_date(&mut self, rental_id: i32, due_time: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query("UPDATE rentals SET due_time = $1 WHERE id = $2 AND return_time IS NULL")
            .bind(due_time)
            .bind(rental_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

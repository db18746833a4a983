//! Rentals repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::rental::{Rental, RentalDetails},
};

pub(crate) const RENTAL_COLUMNS: &str = "id, book_id, user_id, rental_time, due_time, return_time";

#[derive(Clone)]
pub struct RentalsRepository {
    pool: Pool<Postgres>,
}

impl RentalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::RentalRepository for RentalsRepository {
    async fn list_active_rentals(&self) -> AppResult<Vec<RentalDetails>> {
        let rentals = sqlx::query_as::<_, RentalDetails>(
            r#"
            SELECT r.id, r.book_id, b.title AS book_title, b.cover_image_url AS book_cover_image_url,
                   r.user_id, u.name AS user_name,
                   r.rental_time, r.due_time,
                   r.due_time < NOW() AS is_overdue
            FROM rentals r
            JOIN books b ON b.id = r.book_id
            JOIN users u ON u.id = r.user_id
            WHERE r.return_time IS NULL
            ORDER BY r.due_time, r.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rentals)
    }

    async fn get_rentals_by_book_id(&self, book_id: i32) -> AppResult<Vec<Rental>> {
        let rentals = sqlx::query_as::<_, Rental>(&format!(
            "SELECT {} FROM rentals WHERE book_id = $1 ORDER BY rental_time, id",
            RENTAL_COLUMNS
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rentals)
    }
}

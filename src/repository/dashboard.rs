//! Dashboard statistics queries

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::dashboard::DashboardStats};

use super::books::BooksRepository;

#[derive(Clone)]
pub struct StatsRepository {
    pool: Pool<Postgres>,
    books: BooksRepository,
}

impl StatsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: BooksRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl super::DashboardRepository for StatsRepository {
    async fn get_stats(&self, recent_limit: i64) -> AppResult<DashboardStats> {
        let total_books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let rented_books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rentals WHERE return_time IS NULL")
            .fetch_one(&self.pool)
            .await?;

        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let recently_added_books = self.books.get_recent(recent_limit).await?;

        Ok(DashboardStats {
            total_books,
            rented_books,
            total_users,
            recently_added_books,
        })
    }
}

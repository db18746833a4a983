//! Repository layer for database operations.
//!
//! Reads go through the per-aggregate repository traits. Every multi-row
//! write goes through a [`Transaction`] obtained from [`Storage::begin`]:
//! changes become visible on [`Transaction::commit`] and are discarded if
//! the transaction is dropped first.

pub mod books;
pub mod dashboard;
pub mod feedbacks;
pub mod memory;
pub mod rentals;
pub mod transaction;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config::ConfigError;
use sqlx::{Pool, Postgres};

use crate::{
    config::DatabaseConfig,
    error::AppResult,
    models::{
        Book, BookCreate, BookDetails, BookStatus, CreateFeedback, DashboardStats, Feedback,
        Rental, RentalDetails, User,
    },
};

pub use memory::{MemoryStore, SeedData};

/// Read access to books
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Books matching a keyword (title, ISBN or author name) and/or genre
    async fn search(&self, keyword: Option<&str>, genre_id: Option<i32>) -> AppResult<Vec<BookDetails>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>>;

    /// Book with publisher, genre, author and status names resolved
    async fn get_details(&self, id: i32) -> AppResult<Option<BookDetails>>;

    async fn get_recommended(&self) -> AppResult<Vec<BookDetails>>;
}

/// Read access to rentals
#[async_trait]
pub trait RentalRepository: Send + Sync {
    /// Unreturned rentals with book and borrower display fields, soonest due first
    async fn list_active_rentals(&self) -> AppResult<Vec<RentalDetails>>;

    /// Every rental ever recorded for a book, oldest first
    async fn get_rentals_by_book_id(&self, book_id: i32) -> AppResult<Vec<Rental>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Feedback for a book, newest first
    async fn get_by_book_id(&self, book_id: i32) -> AppResult<Vec<Feedback>>;

    async fn create(&self, book_id: i32, feedback: &CreateFeedback) -> AppResult<Feedback>;
}

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    async fn get_stats(&self, recent_limit: i64) -> AppResult<DashboardStats>;
}

/// Entry point for transactional writes
#[async_trait]
pub trait Storage: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn Transaction>>;

    /// Check that the backing store is reachable
    async fn ping(&self) -> AppResult<()>;
}

/// An open all-or-nothing unit of work.
///
/// Dropping a transaction without calling [`Transaction::commit`] rolls it back.
#[async_trait]
pub trait Transaction: Send {
    /// Fetch a book and hold it exclusively until the transaction ends
    async fn lock_book(&mut self, book_id: i32) -> AppResult<Option<Book>>;

    async fn user_exists(&mut self, user_id: i32) -> AppResult<bool>;

    /// Insert a book row (without authors) and return its id
    async fn insert_book(&mut self, book: &BookCreate, status: BookStatus) -> AppResult<i32>;

    /// Overwrite every scalar field of a book. Returns false if it does not exist.
    async fn update_book(&mut self, id: i32, book: &BookCreate) -> AppResult<bool>;

    /// Remove every author association of a book, returning how many were removed
    async fn delete_book_authors(&mut self, book_id: i32) -> AppResult<u64>;

    async fn insert_book_author(&mut self, book_id: i32, author_id: i32, position: i16) -> AppResult<()>;

    async fn update_status(&mut self, book_id: i32, status: BookStatus) -> AppResult<bool>;

    async fn record_rental(
        &mut self,
        book_id: i32,
        user_id: i32,
        rental_time: DateTime<Utc>,
        due_time: DateTime<Utc>,
    ) -> AppResult<Rental>;

    async fn get_active_rental_by_book_id(&mut self, book_id: i32) -> AppResult<Option<Rental>>;

    async fn record_return(&mut self, rental_id: i32, return_time: DateTime<Utc>) -> AppResult<bool>;

    async fn update_due_date(&mut self, rental_id: i32, due_time: DateTime<Utc>) -> AppResult<bool>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Main repository struct holding every store handle
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookRepository>,
    pub rentals: Arc<dyn RentalRepository>,
    pub users: Arc<dyn UserRepository>,
    pub feedbacks: Arc<dyn FeedbackRepository>,
    pub dashboard: Arc<dyn DashboardRepository>,
    pub storage: Arc<dyn Storage>,
}

impl Repository {
    /// Create a Postgres-backed repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            rentals: Arc::new(rentals::RentalsRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            feedbacks: Arc::new(feedbacks::FeedbacksRepository::new(pool.clone())),
            dashboard: Arc::new(dashboard::StatsRepository::new(pool.clone())),
            storage: Arc::new(transaction::PgStorage::new(pool)),
        }
    }

    /// Create a repository backed entirely by an in-process store
    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            books: Arc::new(store.clone()),
            rentals: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            feedbacks: Arc::new(store.clone()),
            dashboard: Arc::new(store.clone()),
            storage: Arc::new(store),
        }
    }

    /// In-process repository for the `memory` backend.
    ///
    /// Reference data comes from the `database.seed` file; without one the
    /// store starts empty and only reads succeed.
    pub fn memory_from_config(database: &DatabaseConfig) -> Result<Self, ConfigError> {
        let store = match &database.seed {
            Some(path) => {
                let seed = SeedData::load(path)?;
                tracing::info!(
                    path = %path,
                    users = seed.users.len(),
                    authors = seed.authors.len(),
                    "Loaded seed data"
                );
                MemoryStore::with_seed(seed)
            }
            None => {
                tracing::warn!("No database.seed configured; memory store has no users or authors");
                MemoryStore::new()
            }
        };

        Ok(Self::in_memory(store))
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside LIKE patterns
pub(crate) fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

//! In-process store implementing every repository contract.
//!
//! Used by the `memory` storage backend and by tests. A transaction holds the
//! store lock from `begin` until it is committed or dropped, so transactions
//! are fully serialized. Writes go to a private copy of the state that
//! replaces the shared state only on commit.
//!
//! Foreign keys and the composite key of `book_authors` are enforced like
//! the Postgres schema does.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config::{Config, ConfigError, File};
use serde::Deserialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookAuthor, BookCreate, BookDetails, BookStatus},
        dashboard::DashboardStats,
        feedback::{CreateFeedback, Feedback},
        master::{Author, Genre, Publisher},
        rental::{Rental, RentalDetails},
        user::User,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BookAuthorRow {
    book_id: i32,
    author_id: i32,
    position: i16,
}

#[derive(Debug, Clone)]
struct FeedbackRow {
    id: i32,
    book_id: i32,
    user_id: i32,
    comment: Option<String>,
    rating: Option<i16>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<i32, User>,
    authors: BTreeMap<i32, Author>,
    publishers: BTreeMap<i32, Publisher>,
    genres: BTreeMap<i32, Genre>,
    books: BTreeMap<i32, Book>,
    book_authors: Vec<BookAuthorRow>,
    rentals: BTreeMap<i32, Rental>,
    feedbacks: BTreeMap<i32, FeedbackRow>,
}

fn next_id<V>(map: &BTreeMap<i32, V>) -> i32 {
    map.keys().next_back().map_or(1, |last| last + 1)
}

impl MemoryState {
    fn check_references(&self, book: &BookCreate) -> AppResult<()> {
        if let Some(id) = book.publisher_id {
            if !self.publishers.contains_key(&id) {
                return Err(AppError::Validation(format!("Book: unknown publisher {}", id)));
            }
        }
        if let Some(id) = book.genre_id {
            if !self.genres.contains_key(&id) {
                return Err(AppError::Validation(format!("Book: unknown genre {}", id)));
            }
        }
        Ok(())
    }

    fn details(&self, book: &Book) -> BookDetails {
        let mut links: Vec<&BookAuthorRow> = self
            .book_authors
            .iter()
            .filter(|row| row.book_id == book.id)
            .collect();
        links.sort_by_key(|row| row.position);

        let authors = links
            .into_iter()
            .filter_map(|row| self.authors.get(&row.author_id))
            .map(|a| BookAuthor {
                id: a.id,
                name: a.name.clone(),
            })
            .collect();

        BookDetails {
            id: book.id,
            title: book.title.clone(),
            publisher_id: book.publisher_id,
            publisher_name: book
                .publisher_id
                .and_then(|id| self.publishers.get(&id))
                .map(|p| p.name.clone()),
            genre_id: book.genre_id,
            genre_name: book
                .genre_id
                .and_then(|id| self.genres.get(&id))
                .map(|g| g.name.clone()),
            publication_date: book.publication_date,
            isbn: book.isbn.clone(),
            cover_image_url: book.cover_image_url.clone(),
            description: book.description.clone(),
            notes: book.notes.clone(),
            is_recommended: book.is_recommended,
            status: book.status,
            status_name: book.status.as_str().to_string(),
            authors,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }

    fn matches_keyword(&self, book: &Book, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        let contains = |s: &str| s.to_lowercase().contains(&needle);

        contains(&book.title)
            || book.isbn.as_deref().is_some_and(contains)
            || self
                .book_authors
                .iter()
                .filter(|row| row.book_id == book.id)
                .filter_map(|row| self.authors.get(&row.author_id))
                .any(|a| contains(&a.name))
    }

    fn feedback(&self, row: &FeedbackRow) -> Feedback {
        Feedback {
            id: row.id,
            book_id: row.book_id,
            user_id: row.user_id,
            user_name: self
                .users
                .get(&row.user_id)
                .map(|u| u.name.clone())
                .unwrap_or_default(),
            comment: row.comment.clone(),
            rating: row.rating,
            created_at: row.created_at,
        }
    }
}

/// Reference data loaded into a fresh store.
///
/// Users, authors, publishers and genres are maintained outside the server;
/// the memory backend reads them from a TOML file named by `database.seed`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub publishers: Vec<Publisher>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl SeedData {
    /// Read seed data from a file in any format the `config` crate knows
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path))
            .build()?
            .try_deserialize()
    }
}

/// Shared handle to the in-process store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with reference data and no books
    pub fn with_seed(seed: SeedData) -> Self {
        let state = MemoryState {
            users: seed.users.into_iter().map(|u| (u.id, u)).collect(),
            authors: seed.authors.into_iter().map(|a| (a.id, a)).collect(),
            publishers: seed.publishers.into_iter().map(|p| (p.id, p)).collect(),
            genres: seed.genres.into_iter().map(|g| (g.id, g)).collect(),
            ..Default::default()
        };

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Load an existing catalog row as-is, keeping its id and status
    pub(crate) async fn insert_book(&self, book: Book) {
        self.state.lock().await.books.insert(book.id, book);
    }

    /// Raw author association rows of a book as `(author_id, position)`
    pub(crate) async fn book_author_rows(&self, book_id: i32) -> Vec<(i32, i16)> {
        let state = self.state.lock().await;
        let mut rows: Vec<(i32, i16)> = state
            .book_authors
            .iter()
            .filter(|row| row.book_id == book_id)
            .map(|row| (row.author_id, row.position))
            .collect();
        rows.sort_by_key(|&(_, position)| position);
        rows
    }

    /// Overwrite a book's status without touching its rentals.
    ///
    /// Simulates a status left behind by an out-of-band write.
    pub(crate) async fn corrupt_status(&self, book_id: i32, status: BookStatus) {
        if let Some(book) = self.state.lock().await.books.get_mut(&book_id) {
            book.status = status;
        }
    }
}

#[async_trait]
impl super::BookRepository for MemoryStore {
    async fn search(&self, keyword: Option<&str>, genre_id: Option<i32>) -> AppResult<Vec<BookDetails>> {
        let state = self.state.lock().await;

        let mut books: Vec<&Book> = state
            .books
            .values()
            .filter(|b| genre_id.map_or(true, |g| b.genre_id == Some(g)))
            .filter(|b| keyword.map_or(true, |k| state.matches_keyword(b, k)))
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

        Ok(books.into_iter().map(|b| state.details(b)).collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn get_details(&self, id: i32) -> AppResult<Option<BookDetails>> {
        let state = self.state.lock().await;
        Ok(state.books.get(&id).map(|b| state.details(b)))
    }

    async fn get_recommended(&self) -> AppResult<Vec<BookDetails>> {
        let state = self.state.lock().await;

        let mut books: Vec<&Book> = state.books.values().filter(|b| b.is_recommended).collect();
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(books.into_iter().map(|b| state.details(b)).collect())
    }
}

#[async_trait]
impl super::RentalRepository for MemoryStore {
    async fn list_active_rentals(&self) -> AppResult<Vec<RentalDetails>> {
        let state = self.state.lock().await;
        let now = Utc::now();

        let mut active: Vec<&Rental> = state.rentals.values().filter(|r| r.is_active()).collect();
        active.sort_by(|a, b| a.due_time.cmp(&b.due_time).then(a.id.cmp(&b.id)));

        // Inner joins: rentals whose book or user is missing are skipped
        Ok(active
            .into_iter()
            .filter_map(|r| {
                let book = state.books.get(&r.book_id)?;
                let user = state.users.get(&r.user_id)?;
                Some(RentalDetails {
                    id: r.id,
                    book_id: r.book_id,
                    book_title: book.title.clone(),
                    book_cover_image_url: book.cover_image_url.clone(),
                    user_id: r.user_id,
                    user_name: user.name.clone(),
                    rental_time: r.rental_time,
                    due_time: r.due_time,
                    is_overdue: r.is_overdue(now),
                })
            })
            .collect())
    }

    async fn get_rentals_by_book_id(&self, book_id: i32) -> AppResult<Vec<Rental>> {
        let state = self.state.lock().await;

        let mut rentals: Vec<Rental> = state
            .rentals
            .values()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        rentals.sort_by(|a, b| a.rental_time.cmp(&b.rental_time).then(a.id.cmp(&b.id)));

        Ok(rentals)
    }
}

#[async_trait]
impl super::UserRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl super::FeedbackRepository for MemoryStore {
    async fn get_by_book_id(&self, book_id: i32) -> AppResult<Vec<Feedback>> {
        let state = self.state.lock().await;

        let mut rows: Vec<&FeedbackRow> = state.feedbacks.values().filter(|f| f.book_id == book_id).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(rows.into_iter().map(|row| state.feedback(row)).collect())
    }

    async fn create(&self, book_id: i32, feedback: &CreateFeedback) -> AppResult<Feedback> {
        let mut state = self.state.lock().await;

        if !state.books.contains_key(&book_id) || !state.users.contains_key(&feedback.user_id) {
            return Err(AppError::Validation("Feedback: unknown reference".to_string()));
        }

        let row = FeedbackRow {
            id: next_id(&state.feedbacks),
            book_id,
            user_id: feedback.user_id,
            comment: feedback.comment.clone(),
            rating: feedback.rating,
            created_at: Utc::now(),
        };
        let created = state.feedback(&row);
        state.feedbacks.insert(row.id, row);

        Ok(created)
    }
}

#[async_trait]
impl super::DashboardRepository for MemoryStore {
    async fn get_stats(&self, recent_limit: i64) -> AppResult<DashboardStats> {
        let state = self.state.lock().await;

        let mut recent: Vec<&Book> = state.books.values().collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let recent_limit = usize::try_from(recent_limit).unwrap_or(0);

        Ok(DashboardStats {
            total_books: state.books.len() as i64,
            rented_books: state.rentals.values().filter(|r| r.is_active()).count() as i64,
            total_users: state.users.len() as i64,
            recently_added_books: recent
                .into_iter()
                .take(recent_limit)
                .map(|b| state.details(b))
                .collect(),
        })
    }
}

#[async_trait]
impl super::Storage for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn super::Transaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Open transaction on a [`MemoryStore`]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl super::Transaction for MemoryTransaction {
    async fn lock_book(&mut self, book_id: i32) -> AppResult<Option<Book>> {
        Ok(self.working.books.get(&book_id).cloned())
    }

    async fn user_exists(&mut self, user_id: i32) -> AppResult<bool> {
        Ok(self.working.users.contains_key(&user_id))
    }

    async fn insert_book(&mut self, book: &BookCreate, status: BookStatus) -> AppResult<i32> {
        self.working.check_references(book)?;

        let now = Utc::now();
        let id = next_id(&self.working.books);
        self.working.books.insert(
            id,
            Book {
                id,
                title: book.title.clone(),
                publisher_id: book.publisher_id,
                genre_id: book.genre_id,
                publication_date: book.publication_date,
                isbn: book.isbn.clone(),
                cover_image_url: book.cover_image_url.clone(),
                description: book.description.clone(),
                notes: book.notes.clone(),
                is_recommended: book.is_recommended,
                status,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(id)
    }

    async fn update_book(&mut self, id: i32, book: &BookCreate) -> AppResult<bool> {
        self.working.check_references(book)?;

        let Some(existing) = self.working.books.get_mut(&id) else {
            return Ok(false);
        };

        existing.title = book.title.clone();
        existing.publisher_id = book.publisher_id;
        existing.genre_id = book.genre_id;
        existing.publication_date = book.publication_date;
        existing.isbn = book.isbn.clone();
        existing.cover_image_url = book.cover_image_url.clone();
        existing.description = book.description.clone();
        existing.notes = book.notes.clone();
        existing.is_recommended = book.is_recommended;
        existing.updated_at = Utc::now();

        Ok(true)
    }

    async fn delete_book_authors(&mut self, book_id: i32) -> AppResult<u64> {
        let before = self.working.book_authors.len();
        self.working.book_authors.retain(|row| row.book_id != book_id);
        Ok((before - self.working.book_authors.len()) as u64)
    }

    async fn insert_book_author(&mut self, book_id: i32, author_id: i32, position: i16) -> AppResult<()> {
        if !self.working.books.contains_key(&book_id) || !self.working.authors.contains_key(&author_id) {
            return Err(AppError::Validation(format!("Author {}: unknown reference", author_id)));
        }

        let duplicate = self
            .working
            .book_authors
            .iter()
            .any(|row| row.book_id == book_id && row.author_id == author_id);
        if duplicate {
            return Err(AppError::Conflict(format!("Author {}", author_id)));
        }

        self.working.book_authors.push(BookAuthorRow {
            book_id,
            author_id,
            position,
        });

        Ok(())
    }

    async fn update_status(&mut self, book_id: i32, status: BookStatus) -> AppResult<bool> {
        let Some(book) = self.working.books.get_mut(&book_id) else {
            return Ok(false);
        };

        book.status = status;
        book.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_rental(
        &mut self,
        book_id: i32,
        user_id: i32,
        rental_time: DateTime<Utc>,
        due_time: DateTime<Utc>,
    ) -> AppResult<Rental> {
        if !self.working.books.contains_key(&book_id) || !self.working.users.contains_key(&user_id) {
            return Err(AppError::Validation("Rental: unknown reference".to_string()));
        }

        let already_active = self
            .working
            .rentals
            .values()
            .any(|r| r.book_id == book_id && r.is_active());
        if already_active {
            return Err(AppError::Conflict("Book is already rented out".to_string()));
        }

        let rental = Rental {
            id: next_id(&self.working.rentals),
            book_id,
            user_id,
            rental_time,
            due_time,
            return_time: None,
        };
        self.working.rentals.insert(rental.id, rental.clone());

        Ok(rental)
    }

    async fn get_active_rental_by_book_id(&mut self, book_id: i32) -> AppResult<Option<Rental>> {
        Ok(self
            .working
            .rentals
            .values()
            .find(|r| r.book_id == book_id && r.is_active())
            .cloned())
    }

    async fn record_return(&mut self, rental_id: i32, return_time: DateTime<Utc>) -> AppResult<bool> {
        match self.working.rentals.get_mut(&rental_id) {
            Some(rental) if rental.is_active() => {
                rental.return_time = Some(return_time);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_due_date(&mut self, rental_id: i32, due_time: DateTime<Utc>) -> AppResult<bool> {
        match self.working.rentals.get_mut(&rental_id) {
            Some(rental) if rental.is_active() => {
                rental.due_time = due_time;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{BookRepository, RentalRepository, Storage, Transaction};
    use chrono::Duration;

    fn book(title: &str) -> BookCreate {
        BookCreate {
            title: title.to_string(),
            ..Default::default()
        }
    }

    async fn seeded() -> MemoryStore {
        MemoryStore::with_seed(SeedData {
            users: vec![User {
                id: 1,
                name: "Aiko".to_string(),
                email: None,
                code: None,
                department_id: None,
                is_admin_staff: false,
            }],
            authors: vec![
                Author {
                    id: 5,
                    name: "Ursula K. Le Guin".to_string(),
                },
                Author {
                    id: 7,
                    name: "Charles Vess".to_string(),
                },
            ],
            ..Default::default()
        })
    }

    #[test]
    fn test_seed_file_loads_reference_data() {
        let seed = SeedData::load("config/seed").unwrap();

        assert!(seed.users.iter().any(|u| u.is_admin_staff));
        assert!(seed.users.iter().any(|u| !u.is_admin_staff));
        assert!(!seed.authors.is_empty());
        assert!(!seed.genres.is_empty());
    }

    #[tokio::test]
    async fn test_seeded_store_resolves_references() {
        let store = seeded().await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.user_exists(1).await.unwrap());
        assert!(!tx.user_exists(2).await.unwrap());

        let mut data = book("Earthsea");
        data.genre_id = Some(1);
        assert!(matches!(
            tx.insert_book(&data, BookStatus::Available).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_book(&book("The Dispossessed"), BookStatus::Available).await.unwrap();
        drop(tx);

        assert!(store.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_committed_transaction_is_visible() {
        let store = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_book(&book("The Dispossessed"), BookStatus::Available).await.unwrap();
        tx.insert_book_author(id, 5, 1).await.unwrap();
        tx.commit().await.unwrap();

        let details = store.get_details(id).await.unwrap().unwrap();
        assert_eq!(details.author_names(), "Ursula K. Le Guin");
    }

    #[tokio::test]
    async fn test_book_author_key_is_enforced() {
        let store = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_book(&book("Earthsea"), BookStatus::Available).await.unwrap();
        tx.insert_book_author(id, 5, 1).await.unwrap();

        assert!(matches!(tx.insert_book_author(id, 5, 2).await, Err(AppError::Conflict(_))));
        assert!(matches!(tx.insert_book_author(id, 99, 2).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_second_active_rental_is_rejected() {
        let store = seeded().await;
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_book(&book("Earthsea"), BookStatus::Available).await.unwrap();
        tx.record_rental(id, 1, now, now + Duration::days(14)).await.unwrap();

        let second = tx.record_rental(id, 1, now, now + Duration::days(14)).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_search_matches_author_name_and_keeps_all_authors() {
        let store = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_book(&book("Tales from Earthsea"), BookStatus::Available).await.unwrap();
        tx.insert_book_author(id, 5, 1).await.unwrap();
        tx.insert_book_author(id, 7, 2).await.unwrap();
        tx.insert_book(&book("Dune"), BookStatus::Available).await.unwrap();
        tx.commit().await.unwrap();

        let found = store.search(Some("vess"), None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].author_ids(), vec![5, 7]);

        let all = store.search(None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Dune");
    }

    #[tokio::test]
    async fn test_closed_rental_cannot_be_closed_again() {
        let store = seeded().await;
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_book(&book("Earthsea"), BookStatus::Available).await.unwrap();
        let rental = tx.record_rental(id, 1, now, now + Duration::days(14)).await.unwrap();
        assert!(tx.record_return(rental.id, now).await.unwrap());
        assert!(!tx.record_return(rental.id, now).await.unwrap());
        assert!(!tx.update_due_date(rental.id, now).await.unwrap());
        tx.commit().await.unwrap();

        let history = store.get_rentals_by_book_id(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].return_time, Some(now));
    }
}

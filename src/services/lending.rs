//! Lending ledger: borrow, return, extend and the staff override operations.
//!
//! Each operation runs in one transaction that starts by locking the book
//! row. The rental rows and `books.status_id` are written together, so a book
//! is `Rented` exactly when it has an unreturned rental.

use chrono::{Duration, Utc};

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, BookStatus},
        rental::{Rental, RentalDetails},
        user::Caller,
    },
    repository::{Repository, Transaction},
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    loan_period: Duration,
}

/// Lock the book for the rest of the transaction, or fail with NotFound
async fn lock_existing_book(tx: &mut dyn Transaction, book_id: i32) -> AppResult<Book> {
    tx.lock_book(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
}

async fn require_user(tx: &mut dyn Transaction, user_id: i32) -> AppResult<()> {
    if tx.user_exists(user_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("User with id {} not found", user_id)))
    }
}

async fn require_active_rental(tx: &mut dyn Transaction, book_id: i32) -> AppResult<Rental> {
    tx.get_active_rental_by_book_id(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} is not currently rented", book_id)))
}

async fn set_status(tx: &mut dyn Transaction, book_id: i32, status: BookStatus) -> AppResult<()> {
    if tx.update_status(book_id, status).await? {
        Ok(())
    } else {
        Err(AppError::Internal(format!("Status update matched no row for book {}", book_id)))
    }
}

async fn close_rental(tx: &mut dyn Transaction, rental: &mut Rental) -> AppResult<()> {
    let now = Utc::now();
    if !tx.record_return(rental.id, now).await? {
        return Err(AppError::Internal(format!("Rental {} was already closed", rental.id)));
    }
    rental.return_time = Some(now);
    Ok(())
}

impl LendingService {
    pub fn new(repository: Repository, config: LendingConfig) -> Self {
        Self {
            repository,
            loan_period: Duration::days(config.loan_period_days),
        }
    }

    /// Open a rental due one loan period from now and mark the book rented
    async fn open_rental(&self, tx: &mut dyn Transaction, book_id: i32, user_id: i32) -> AppResult<Rental> {
        let rental_time = Utc::now();
        let due_time = rental_time + self.loan_period;

        let rental = tx.record_rental(book_id, user_id, rental_time, due_time).await?;
        set_status(tx, book_id, BookStatus::Rented).await?;

        Ok(rental)
    }

    /// Borrow a book. Fails with Conflict if it is already on loan.
    pub async fn borrow(&self, book_id: i32, user_id: i32) -> AppResult<Rental> {
        let mut tx = self.repository.storage.begin().await?;

        lock_existing_book(tx.as_mut(), book_id).await?;
        require_user(tx.as_mut(), user_id).await?;

        if let Some(active) = tx.get_active_rental_by_book_id(book_id).await? {
            return Err(AppError::Conflict(format!(
                "Book {} is already rented out (rental {})",
                book_id, active.id
            )));
        }

        let rental = self.open_rental(tx.as_mut(), book_id, user_id).await?;
        tx.commit().await?;

        tracing::info!(book_id, user_id, rental_id = rental.id, due_time = %rental.due_time, "Book borrowed");
        Ok(rental)
    }

    /// Return a borrowed book, closing its active rental
    pub async fn return_book(&self, book_id: i32) -> AppResult<Rental> {
        let mut tx = self.repository.storage.begin().await?;

        lock_existing_book(tx.as_mut(), book_id).await?;
        let mut rental = require_active_rental(tx.as_mut(), book_id).await?;

        close_rental(tx.as_mut(), &mut rental).await?;
        set_status(tx.as_mut(), book_id, BookStatus::Available).await?;
        tx.commit().await?;

        tracing::info!(book_id, user_id = rental.user_id, rental_id = rental.id, "Book returned");
        Ok(rental)
    }

    /// Push the due date of the active rental back by one loan period.
    ///
    /// The new deadline counts from the current one, so extensions add up.
    pub async fn extend(&self, book_id: i32) -> AppResult<Rental> {
        let mut tx = self.repository.storage.begin().await?;

        lock_existing_book(tx.as_mut(), book_id).await?;
        let mut rental = require_active_rental(tx.as_mut(), book_id).await?;

        let due_time = rental.due_time + self.loan_period;
        if !tx.update_due_date(rental.id, due_time).await? {
            return Err(AppError::Internal(format!("Rental {} could not be extended", rental.id)));
        }
        tx.commit().await?;

        rental.due_time = due_time;
        tracing::info!(book_id, rental_id = rental.id, due_time = %rental.due_time, "Rental extended");
        Ok(rental)
    }

    /// Lend a book to `user_id` whatever its current state.
    ///
    /// An active rental held by anyone is closed first.
    pub async fn force_borrow(&self, caller: &Caller, book_id: i32, user_id: i32) -> AppResult<Rental> {
        caller.require_admin_staff()?;

        let mut tx = self.repository.storage.begin().await?;

        lock_existing_book(tx.as_mut(), book_id).await?;
        require_user(tx.as_mut(), user_id).await?;

        if let Some(mut previous) = tx.get_active_rental_by_book_id(book_id).await? {
            close_rental(tx.as_mut(), &mut previous).await?;
            tracing::warn!(
                book_id,
                previous_user_id = previous.user_id,
                rental_id = previous.id,
                staff_id = ?caller.user_id,
                "Force borrow closed an active rental"
            );
        }

        let rental = self.open_rental(tx.as_mut(), book_id, user_id).await?;
        tx.commit().await?;

        tracing::info!(book_id, user_id, rental_id = rental.id, staff_id = ?caller.user_id, "Book force-borrowed");
        Ok(rental)
    }

    /// Repair a book stuck in the wrong status by making it available.
    ///
    /// Any active rental is closed as returned now; it is handed back so the
    /// caller can see who held the book. Requires `confirmed`.
    pub async fn force_set_available(
        &self,
        caller: &Caller,
        book_id: i32,
        confirmed: bool,
    ) -> AppResult<Option<Rental>> {
        caller.require_admin_staff()?;
        if !confirmed {
            return Err(AppError::ConfirmationRequired(format!(
                "Forcing book {} to available closes its current rental; resend with confirm=true",
                book_id
            )));
        }

        let mut tx = self.repository.storage.begin().await?;

        let book = lock_existing_book(tx.as_mut(), book_id).await?;

        let closed = match tx.get_active_rental_by_book_id(book_id).await? {
            Some(mut rental) => {
                close_rental(tx.as_mut(), &mut rental).await?;
                Some(rental)
            }
            None => None,
        };

        set_status(tx.as_mut(), book_id, BookStatus::Available).await?;
        tx.commit().await?;

        match &closed {
            Some(rental) => tracing::warn!(
                book_id,
                previous_user_id = rental.user_id,
                rental_id = rental.id,
                staff_id = ?caller.user_id,
                "Book forced to available; active rental closed"
            ),
            None => tracing::warn!(
                book_id,
                previous_status = %book.status,
                staff_id = ?caller.user_id,
                "Book forced to available"
            ),
        }

        Ok(closed)
    }

    /// Unreturned rentals with display fields
    pub async fn list_active_rentals(&self) -> AppResult<Vec<RentalDetails>> {
        self.repository.rentals.list_active_rentals().await
    }

    /// All rentals of a book, oldest first
    pub async fn rental_history(&self, book_id: i32) -> AppResult<Vec<Rental>> {
        self.repository
            .books
            .get_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        self.repository.rentals.get_rentals_by_book_id(book_id).await
    }
}

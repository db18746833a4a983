//! Rental (loan) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Rental row. Active while `return_time` is null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Rental {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub rental_time: DateTime<Utc>,
    pub due_time: DateTime<Utc>,
    pub return_time: Option<DateTime<Utc>>,
}

impl Rental {
    pub fn is_active(&self) -> bool {
        self.return_time.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_time < now
    }
}

/// Active rental with display fields
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RentalDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_cover_image_url: Option<String>,
    pub user_id: i32,
    pub user_name: String,
    pub rental_time: DateTime<Utc>,
    pub due_time: DateTime<Utc>,
    #[sqlx(default)]
    pub is_overdue: bool,
}

/// Borrow / force-borrow request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BorrowRequest {
    pub book_id: i32,
    pub user_id: i32,
}

/// Return / extend request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookRentalRequest {
    pub book_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rental(due_in_days: i64, returned: bool) -> Rental {
        let now = Utc::now();
        Rental {
            id: 1,
            book_id: 10,
            user_id: 1,
            rental_time: now - Duration::days(14),
            due_time: now + Duration::days(due_in_days),
            return_time: returned.then_some(now),
        }
    }

    #[test]
    fn test_active_and_overdue() {
        let now = Utc::now();

        let on_time = rental(3, false);
        assert!(on_time.is_active());
        assert!(!on_time.is_overdue(now));

        let late = rental(-1, false);
        assert!(late.is_overdue(now));

        let returned_late = rental(-1, true);
        assert!(!returned_late.is_active());
        assert!(!returned_late.is_overdue(now));
    }
}

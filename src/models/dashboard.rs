//! Dashboard aggregates

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::book::BookDetails;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub total_books: i64,
    /// Books with an unreturned rental
    pub rented_books: i64,
    pub total_users: i64,
    pub recently_added_books: Vec<BookDetails>,
}

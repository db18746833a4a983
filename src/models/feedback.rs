//! Reader feedback on books

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Feedback entry with the commenter's name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Feedback {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub comment: Option<String>,
    pub rating: Option<i16>,
    pub created_at: DateTime<Utc>,
}

/// Create feedback request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFeedback {
    pub user_id: i32,
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub comment: Option<String>,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
}

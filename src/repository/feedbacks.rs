//! Feedback repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::feedback::{CreateFeedback, Feedback},
};

#[derive(Clone)]
pub struct FeedbacksRepository {
    pool: Pool<Postgres>,
}

impl FeedbacksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Feedback> {
        sqlx::query_as::<_, Feedback>(
            r#"
            SELECT f.id, f.book_id, f.user_id, u.name AS user_name,
                   f.comment, f.rating, f.created_at
            FROM feedbacks f
            JOIN users u ON u.id = f.user_id
            WHERE f.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Feedback with id {} not found", id)))
    }
}

#[async_trait]
impl super::FeedbackRepository for FeedbacksRepository {
    async fn get_by_book_id(&self, book_id: i32) -> AppResult<Vec<Feedback>> {
        let feedbacks = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT f.id, f.book_id, f.user_id, u.name AS user_name,
                   f.comment, f.rating, f.created_at
            FROM feedbacks f
            JOIN users u ON u.id = f.user_id
            WHERE f.book_id = $1
            ORDER BY f.created_at DESC, f.id DESC
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(feedbacks)
    }

    async fn create(&self, book_id: i32, feedback: &CreateFeedback) -> AppResult<Feedback> {
        let now = Utc::now();

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO feedbacks (book_id, user_id, comment, rating, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(book_id)
        .bind(feedback.user_id)
        .bind(&feedback.comment)
        .bind(feedback.rating)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_constraint(e, "Feedback"))?;

        self.get_by_id(id).await
    }
}

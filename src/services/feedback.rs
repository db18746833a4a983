//! Book feedback service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::feedback::{CreateFeedback, Feedback},
    repository::Repository,
};

#[derive(Clone)]
pub struct FeedbackService {
    repository: Repository,
}

impl FeedbackService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    async fn require_book(&self, book_id: i32) -> AppResult<()> {
        self.repository
            .books
            .get_by_id(book_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    /// Feedback left on a book, newest first
    pub async fn list_feedback(&self, book_id: i32) -> AppResult<Vec<Feedback>> {
        self.require_book(book_id).await?;
        self.repository.feedbacks.get_by_book_id(book_id).await
    }

    pub async fn create_feedback(&self, book_id: i32, mut feedback: CreateFeedback) -> AppResult<Feedback> {
        feedback.validate()?;
        feedback.comment = feedback
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        self.require_book(book_id).await?;
        // Verify user exists
        self.repository
            .users
            .get_by_id(feedback.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", feedback.user_id)))?;

        let created = self.repository.feedbacks.create(book_id, &feedback).await?;
        tracing::info!(book_id, user_id = created.user_id, feedback_id = created.id, "Feedback added");
        Ok(created)
    }
}

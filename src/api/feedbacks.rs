//! Book feedback endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::feedback::{CreateFeedback, Feedback},
};

/// List feedback for a book
#[utoipa::path(
    get,
    path = "/books/{id}/feedbacks",
    tag = "feedbacks",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Feedback, newest first", body = Vec<Feedback>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn list_feedbacks(
    State(state): State<crate::AppState>,
    Path(book_id): Path<i32>,
) -> AppResult<Json<Vec<Feedback>>> {
    let feedbacks = state.services.feedback.list_feedback(book_id).await?;
    Ok(Json(feedbacks))
}

/// Leave feedback on a book
#[utoipa::path(
    post,
    path = "/books/{id}/feedbacks",
    tag = "feedbacks",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = CreateFeedback,
    responses(
        (status = 201, description = "Feedback created", body = Feedback),
        (status = 400, description = "Invalid rating or comment"),
        (status = 404, description = "Book or user not found")
    )
)]
pub async fn create_feedback(
    State(state): State<crate::AppState>,
    Path(book_id): Path<i32>,
    Json(feedback): Json<CreateFeedback>,
) -> AppResult<(StatusCode, Json<Feedback>)> {
    let created = state.services.feedback.create_feedback(book_id, feedback).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

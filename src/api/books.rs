//! Book (catalog) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{BookCreate, BookDetails, BookQuery},
        rental::Rental,
    },
};

use super::CallerIdentity;

/// Force-available request
#[derive(Deserialize, ToSchema)]
pub struct ForceAvailableRequest {
    /// Must be true; the operation closes any active rental
    #[serde(default)]
    pub confirm: bool,
}

/// Force-available result
#[derive(Serialize, ToSchema)]
pub struct ForceAvailableResponse {
    /// The book after the repair
    pub book: BookDetails,
    /// Rental that was open and got closed, if any
    pub closed_rental: Option<Rental>,
}

/// Search books
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookDetails>)
    )
)]
pub async fn search_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<BookDetails>>> {
    let books = state.services.catalog.search_books(&query).await?;
    Ok(Json(books))
}

/// Recommended books, newest first
#[utoipa::path(
    get,
    path = "/books/recommended",
    tag = "books",
    responses(
        (status = 200, description = "Recommended books", body = Vec<BookDetails>)
    )
)]
pub async fn get_recommended_books(State(state): State<crate::AppState>) -> AppResult<Json<Vec<BookDetails>>> {
    let books = state.services.catalog.get_recommended_books().await?;
    Ok(Json(books))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookCreate,
    responses(
        (status = 201, description = "Book created", body = BookDetails),
        (status = 400, description = "Invalid input or unknown reference")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    Json(book): Json<BookCreate>,
) -> AppResult<(StatusCode, Json<BookDetails>)> {
    book.validate()?;

    let created = state.services.catalog.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a book and replace its authors
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookCreate,
    responses(
        (status = 200, description = "Book updated", body = BookDetails),
        (status = 400, description = "Invalid input or unknown reference"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(book): Json<BookCreate>,
) -> AppResult<Json<BookDetails>> {
    book.validate()?;

    let updated = state.services.catalog.update_book(id, book).await?;
    Ok(Json(updated))
}

/// Force a book back to available, closing any active rental (staff only)
#[utoipa::path(
    post,
    path = "/books/{id}/force-available",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = ForceAvailableRequest,
    responses(
        (status = 200, description = "Book is available", body = ForceAvailableResponse),
        (status = 403, description = "Caller is not administrative staff"),
        (status = 404, description = "Book not found"),
        (status = 428, description = "Confirmation missing")
    )
)]
pub async fn force_set_available(
    State(state): State<crate::AppState>,
    CallerIdentity(caller): CallerIdentity,
    Path(id): Path<i32>,
    Json(request): Json<ForceAvailableRequest>,
) -> AppResult<Json<ForceAvailableResponse>> {
    let closed_rental = state
        .services
        .lending
        .force_set_available(&caller, id, request.confirm)
        .await?;
    let book = state.services.catalog.get_book(id).await?;

    Ok(Json(ForceAvailableResponse { book, closed_rental }))
}

/// Rental history of a book
#[utoipa::path(
    get,
    path = "/books/{id}/rentals",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Rentals, oldest first", body = Vec<Rental>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_rental_history(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<Rental>>> {
    let rentals = state.services.lending.rental_history(id).await?;
    Ok(Json(rentals))
}

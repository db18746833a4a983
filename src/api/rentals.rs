//! Rental (lending) endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::rental::{BookRentalRequest, BorrowRequest, Rental, RentalDetails},
};

use super::CallerIdentity;

/// List unreturned rentals
#[utoipa::path(
    get,
    path = "/rentals/active",
    tag = "rentals",
    responses(
        (status = 200, description = "Active rentals, soonest due first", body = Vec<RentalDetails>)
    )
)]
pub async fn list_active_rentals(State(state): State<crate::AppState>) -> AppResult<Json<Vec<RentalDetails>>> {
    let rentals = state.services.lending.list_active_rentals().await?;
    Ok(Json(rentals))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/rentals/borrow",
    tag = "rentals",
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Rental created", body = Rental),
        (status = 404, description = "Book or user not found"),
        (status = 409, description = "Book already rented")
    )
)]
pub async fn borrow(
    State(state): State<crate::AppState>,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<Rental>)> {
    let rental = state
        .services
        .lending
        .borrow(request.book_id, request.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(rental)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/rentals/return",
    tag = "rentals",
    request_body = BookRentalRequest,
    responses(
        (status = 200, description = "Book returned", body = Rental),
        (status = 404, description = "Book not found or not rented")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    Json(request): Json<BookRentalRequest>,
) -> AppResult<Json<Rental>> {
    let rental = state.services.lending.return_book(request.book_id).await?;
    Ok(Json(rental))
}

/// Extend the active rental of a book by one loan period
#[utoipa::path(
    post,
    path = "/rentals/extend",
    tag = "rentals",
    request_body = BookRentalRequest,
    responses(
        (status = 200, description = "Rental extended", body = Rental),
        (status = 404, description = "Book not found or not rented")
    )
)]
pub async fn extend(
    State(state): State<crate::AppState>,
    Json(request): Json<BookRentalRequest>,
) -> AppResult<Json<Rental>> {
    let rental = state.services.lending.extend(request.book_id).await?;
    Ok(Json(rental))
}

/// Lend a book regardless of its state (staff only)
#[utoipa::path(
    post,
    path = "/rentals/force-borrow",
    tag = "rentals",
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Rental created", body = Rental),
        (status = 403, description = "Caller is not administrative staff"),
        (status = 404, description = "Book or user not found")
    )
)]
pub async fn force_borrow(
    State(state): State<crate::AppState>,
    CallerIdentity(caller): CallerIdentity,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<Rental>)> {
    let rental = state
        .services
        .lending
        .force_borrow(&caller, request.book_id, request.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(rental)))
}

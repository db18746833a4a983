//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, dashboard, feedbacks, health, rentals};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Book Library API",
        version = "0.3.0",
        description = "Book lending library REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::search_books,
        books::get_recommended_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::force_set_available,
        books::get_rental_history,
        // Feedback
        feedbacks::list_feedbacks,
        feedbacks::create_feedback,
        // Rentals
        rentals::list_active_rentals,
        rentals::borrow,
        rentals::return_book,
        rentals::extend,
        rentals::force_borrow,
        // Dashboard
        dashboard::get_stats,
    ),
    components(
        schemas(
            // Books
            crate::models::book::BookStatus,
            crate::models::book::BookAuthor,
            crate::models::book::BookDetails,
            crate::models::book::BookCreate,
            books::ForceAvailableRequest,
            books::ForceAvailableResponse,
            // Feedback
            crate::models::feedback::Feedback,
            crate::models::feedback::CreateFeedback,
            // Rentals
            crate::models::rental::Rental,
            crate::models::rental::RentalDetails,
            crate::models::rental::BorrowRequest,
            crate::models::rental::BookRentalRequest,
            // Dashboard
            crate::models::dashboard::DashboardStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "feedbacks", description = "Reader feedback"),
        (name = "rentals", description = "Lending"),
        (name = "dashboard", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

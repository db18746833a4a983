//! API handlers for the library REST endpoints

pub mod books;
pub mod dashboard;
pub mod feedbacks;
pub mod health;
pub mod openapi;
pub mod rentals;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::Caller, AppState};

/// Header carrying the id of the calling user
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header flagging the caller as administrative staff
pub const ADMIN_STAFF_HEADER: &str = "x-admin-staff";

/// Extractor for the caller identity supplied by the upstream gateway.
///
/// Both headers are optional; an absent flag means an unprivileged caller.
pub struct CallerIdentity(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Result<Option<String>, AppError> {
            parts
                .headers
                .get(name)
                .map(|value| {
                    value
                        .to_str()
                        .map(|s| s.trim().to_string())
                        .map_err(|_| AppError::BadRequest(format!("Invalid {} header", name)))
                })
                .transpose()
        };

        let user_id = header(USER_ID_HEADER)?
            .map(|raw| {
                raw.parse::<i32>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid {} header: {}", USER_ID_HEADER, raw)))
            })
            .transpose()?;

        let is_admin_staff = match header(ADMIN_STAFF_HEADER)?.as_deref() {
            None => false,
            Some(flag) if flag.eq_ignore_ascii_case("true") || flag == "1" => true,
            Some(flag) if flag.eq_ignore_ascii_case("false") || flag == "0" => false,
            Some(flag) => {
                return Err(AppError::BadRequest(format!(
                    "Invalid {} header: {}",
                    ADMIN_STAFF_HEADER, flag
                )))
            }
        };

        Ok(CallerIdentity(Caller {
            user_id,
            is_admin_staff,
        }))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books", get(books::search_books).post(books::create_book))
        .route("/books/recommended", get(books::get_recommended_books))
        .route("/books/:id", get(books::get_book).put(books::update_book))
        .route("/books/:id/force-available", post(books::force_set_available))
        .route("/books/:id/rentals", get(books::get_rental_history))
        .route(
            "/books/:id/feedbacks",
            get(feedbacks::list_feedbacks).post(feedbacks::create_feedback),
        )
        // Rentals
        .route("/rentals/active", get(rentals::list_active_rentals))
        .route("/rentals/borrow", post(rentals::borrow))
        .route("/rentals/return", post(rentals::return_book))
        .route("/rentals/extend", post(rentals::extend))
        .route("/rentals/force-borrow", post(rentals::force_borrow))
        // Dashboard
        .route("/dashboard/stats", get(dashboard::get_stats))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::{AppConfig, StorageBackend},
        repository::Repository,
        services::Services,
        testing::{self, ADMIN_ID, ALICE_ID, BOB_ID, HERBERT_ID, LE_GUIN_ID},
    };

    async fn app() -> Router {
        let store = testing::seeded_store().await;
        testing::add_book(&store, 10, "The Word for World Is Forest").await;

        let config = AppConfig::default();
        let services = Services::new(Repository::in_memory(store), config.lending.clone());
        create_router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn as_staff(mut request: Request<Body>) -> Request<Body> {
        let headers = request.headers_mut();
        headers.insert(USER_ID_HEADER, ADMIN_ID.to_string().parse().unwrap());
        headers.insert(ADMIN_STAFF_HEADER, "true".parse().unwrap());
        request
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;

        let (status, body) = send(&app, get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, get("/api/v1/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    /// Router wired like the binary does for the `memory` backend
    fn seeded_memory_app() -> Router {
        let mut config = AppConfig::default();
        config.database.backend = StorageBackend::Memory;
        config.database.seed = Some("config/seed.toml".to_string());

        let repository = Repository::memory_from_config(&config.database).unwrap();
        let services = Services::new(repository, config.lending.clone());
        create_router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        })
    }

    #[tokio::test]
    async fn test_memory_backend_accepts_writes_from_seed() {
        let app = seeded_memory_app();

        let (status, book) = send(
            &app,
            post_json("/api/v1/books", json!({ "title": "The Dispossessed", "author_ids": [1] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let book_id = book["id"].as_i64().unwrap();

        let (status, rental) = send(
            &app,
            post_json("/api/v1/rentals/borrow", json!({ "book_id": book_id, "user_id": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(rental["user_id"], 1);

        let (status, rental) = send(
            &app,
            as_staff(post_json(
                "/api/v1/rentals/force-borrow",
                json!({ "book_id": book_id, "user_id": 2 }),
            )),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(rental["user_id"], 2);
    }

    #[tokio::test]
    async fn test_memory_backend_without_seed_rejects_writes() {
        let mut config = AppConfig::default();
        config.database.backend = StorageBackend::Memory;

        let repository = Repository::memory_from_config(&config.database).unwrap();
        let services = Services::new(repository, config.lending.clone());
        let app = create_router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        });

        let (status, _) = send(
            &app,
            post_json("/api/v1/books", json!({ "title": "The Dispossessed", "author_ids": [1] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_and_fetch_book() {
        let app = app().await;

        let (status, created) = send(
            &app,
            post_json(
                "/api/v1/books",
                json!({ "title": "Dune", "author_ids": [HERBERT_ID, HERBERT_ID, LE_GUIN_ID] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status_name"], "Available");
        assert_eq!(created["authors"].as_array().unwrap().len(), 2);

        let uri = format!("/api/v1/books/{}", created["id"]);
        let (status, fetched) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["title"], "Dune");

        let (status, found) = send(&app, get("/api/v1/books?keyword=herb")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_book_requires_authors() {
        let app = app().await;

        let (status, body) = send(&app, post_json("/api/v1/books", json!({ "title": "Dune" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 6);
    }

    #[tokio::test]
    async fn test_update_missing_book() {
        let app = app().await;

        let request = Request::builder()
            .method("PUT")
            .uri("/api/v1/books/404")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "title": "Dune", "author_ids": [HERBERT_ID] }).to_string()))
            .unwrap();
        let (status, _) = send(&app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_borrow_conflict_and_return() {
        let app = app().await;
        let borrow = |user_id: i32| post_json("/api/v1/rentals/borrow", json!({ "book_id": 10, "user_id": user_id }));

        let (status, rental) = send(&app, borrow(ALICE_ID)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(rental["user_id"], ALICE_ID);

        let (status, body) = send(&app, borrow(BOB_ID)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "BookAlreadyRented");

        let (status, active) = send(&app, get("/api/v1/rentals/active")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(active[0]["book_title"], "The Word for World Is Forest");
        assert_eq!(active[0]["user_name"], "Alice");

        let (status, returned) = send(&app, post_json("/api/v1/rentals/return", json!({ "book_id": 10 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!returned["return_time"].is_null());

        let (status, _) = send(&app, post_json("/api/v1/rentals/return", json!({ "book_id": 10 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_force_borrow_requires_staff_header() {
        let app = app().await;
        let body = json!({ "book_id": 10, "user_id": BOB_ID });

        let (status, _) = send(&app, post_json("/api/v1/rentals/force-borrow", body.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, rental) = send(&app, as_staff(post_json("/api/v1/rentals/force-borrow", body))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(rental["user_id"], BOB_ID);
    }

    #[tokio::test]
    async fn test_force_available_needs_confirmation() {
        let app = app().await;
        send(
            &app,
            post_json("/api/v1/rentals/borrow", json!({ "book_id": 10, "user_id": ALICE_ID })),
        )
        .await;

        let uri = "/api/v1/books/10/force-available";
        let (status, _) = send(&app, as_staff(post_json(uri, json!({})))).await;
        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);

        let (status, body) = send(&app, as_staff(post_json(uri, json!({ "confirm": true })))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["book"]["status_name"], "Available");
        assert_eq!(body["closed_rental"]["user_id"], ALICE_ID);
    }

    #[tokio::test]
    async fn test_invalid_caller_header() {
        let app = app().await;

        let mut request = post_json("/api/v1/rentals/force-borrow", json!({ "book_id": 10, "user_id": BOB_ID }));
        request
            .headers_mut()
            .insert(ADMIN_STAFF_HEADER, "maybe".parse().unwrap());
        let (status, _) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_feedback_and_dashboard() {
        let app = app().await;

        let (status, created) = send(
            &app,
            post_json(
                "/api/v1/books/10/feedbacks",
                json!({ "user_id": ALICE_ID, "comment": "Haunting", "rating": 4 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["user_name"], "Alice");

        let (status, _) = send(
            &app,
            post_json("/api/v1/books/10/feedbacks", json!({ "user_id": ALICE_ID, "rating": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, listed) = send(&app, get("/api/v1/books/10/feedbacks")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, stats) = send(&app, get("/api/v1/dashboard/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_books"], 1);
        assert_eq!(stats["total_users"], 3);
        assert_eq!(stats["rented_books"], 0);
    }
}

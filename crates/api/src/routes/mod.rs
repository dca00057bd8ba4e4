//! HTTP route handlers for the BookNest API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness check
//! GET    /health/ready            - Readiness check (pings the database)
//!
//! # Auth
//! POST   /api/auth/signup         - Register an account
//! GET    /api/auth/verify/{token} - Confirm an email address
//! POST   /api/auth/login          - Login, returns a bearer token
//! POST   /api/auth/refresh        - Fresh token for a valid session
//!
//! # Account (requires bearer token)
//! GET    /api/users/me            - Current profile
//! PATCH  /api/users/me            - Update profile fields
//!
//! # Cart (requires bearer token)
//! GET    /api/cart                - Current cart
//! POST   /api/cart                - Add an item (additive merge)
//! PATCH  /api/cart                - Set a line's quantity (0 removes)
//! DELETE /api/cart                - Remove a line (idempotent)
//! DELETE /api/cart/all            - Empty the cart
//!
//! # Orders (requires bearer token)
//! GET    /api/orders              - Paid orders, newest first
//! POST   /api/orders              - Checkout
//!
//! # Catalog (public)
//! GET    /api/books               - Search the catalog
//! GET    /api/books/{id}          - Book detail
//! ```

pub mod account;
pub mod auth;
pub mod books;
pub mod cart;
pub mod orders;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/verify/{token}", get(auth::verify))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
}

/// Create the account routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new().route("/me", get(account::me).patch(account::update_me))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(cart::show)
                .post(cart::add)
                .patch(cart::set_quantity)
                .delete(cart::remove),
        )
        .route("/all", axum::routing::delete(cart::clear))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/", get(orders::list).post(orders::checkout))
}

/// Create the catalog routes router.
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(books::search))
        .route("/{id}", get(books::show))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/users", user_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/books", book_routes())
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

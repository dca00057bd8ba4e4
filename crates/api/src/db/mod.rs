//! Database operations for the BookNest `PostgreSQL` store.
//!
//! # Tables
//!
//! - `users` - accounts, credentials, verification state
//! - `carts` / `cart_items` - one active cart per user
//! - `orders` / `order_items` - append-only purchase ledger
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p booknest-cli -- migrate
//! ```
//!
//! # Store seams
//!
//! The cart store and order ledger are traits so the checkout
//! orchestrator can be exercised against in-memory implementations,
//! including injected partial failures. Production code uses the
//! `PostgreSQL`-backed repositories in [`carts`] and [`orders`].

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use booknest_core::UserId;

use crate::models::{Cart, CartItem, Order, order::NewOrder};

pub mod carts;
pub mod orders;
pub mod users;

#[cfg(test)]
pub mod memory;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// The bounded `acquire_timeout` is what turns a down database into a
/// [`RepositoryError::Unavailable`] instead of a hung request.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Query failed.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// The store itself is unreachable (pool exhausted, connection down).
    /// Surfaces to clients as 503, distinct from request-level failures.
    #[error("store unavailable: {0}")]
    Unavailable(sqlx::Error),

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Row not found.
    #[error("not found")]
    NotFound,

    /// A stored value failed to parse back into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            e @ (sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)) => Self::Unavailable(e),
            e => Self::Database(e),
        }
    }
}

/// Per-user cart storage.
///
/// Implementations must serialize concurrent writes to the same user's
/// cart: `add_quantity` in particular is an atomic merge, never a
/// read-modify-write that could drop a concurrent add.
pub trait CartStore {
    /// Load the user's cart, creating an empty one on first access.
    fn load(&self, user_id: UserId)
    -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Add `item.quantity` to the line for `item.book_id`, creating the
    /// line if absent (the "add to cart" path).
    fn add_quantity(
        &self,
        user_id: UserId,
        item: CartItem,
    ) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Replace the quantity of an existing line (the "set quantity"
    /// path). Quantity 0 removes the line; a missing line is `NotFound`.
    fn set_quantity(
        &self,
        user_id: UserId,
        book_id: &str,
        quantity: i32,
    ) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Remove a line. Removing an absent `book_id` is a successful no-op.
    fn remove_item(
        &self,
        user_id: UserId,
        book_id: &str,
    ) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Empty the cart. Idempotent.
    fn clear(&self, user_id: UserId)
    -> impl Future<Output = Result<Cart, RepositoryError>> + Send;
}

/// Append-only order storage. No update or delete operations exist.
pub trait OrderLedger {
    /// Persist an immutable order snapshot.
    ///
    /// When the order carries an idempotency key that was already used,
    /// the previously created order is returned instead of inserting a
    /// duplicate.
    fn create(&self, order: NewOrder)
    -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// All paid orders for a user, newest first.
    fn list_paid(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_errors_are_split_from_query_errors() {
        let err = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Unavailable(_)));

        let err = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}

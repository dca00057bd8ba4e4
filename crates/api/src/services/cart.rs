//! Cart service.
//!
//! Validates line items before they reach the store and keeps the two
//! mutation flavors distinct: adding merges quantities into an existing
//! line, setting replaces the quantity outright (and removes the line
//! at zero).

use rust_decimal::Decimal;
use thiserror::Error;

use booknest_core::UserId;

use crate::db::{CartStore, RepositoryError};
use crate::models::{Cart, CartItem};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Line item failed validation.
    #[error("invalid cart item: {0}")]
    InvalidItem(&'static str),

    /// Quantity outside the allowed range for the operation.
    #[error("invalid quantity")]
    InvalidQuantity,

    /// The referenced line is not in the cart.
    #[error("item not in cart")]
    ItemNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart service over any [`CartStore`] backend.
pub struct CartService<'a, S> {
    store: &'a S,
}

impl<'a, S: CartStore> CartService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Load the user's cart, creating an empty one on first touch.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn cart(&self, user_id: UserId) -> Result<Cart, CartError> {
        Ok(self.store.load(user_id).await?)
    }

    /// Add an item to the cart. If the book is already in the cart the
    /// quantities are merged additively.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidItem` or `CartError::InvalidQuantity`
    /// on validation failure.
    pub async fn add_item(&self, user_id: UserId, item: CartItem) -> Result<Cart, CartError> {
        if item.quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        validate_item(&item)?;
        Ok(self.store.add_quantity(user_id, item).await?)
    }

    /// Set the quantity of an existing line. Zero removes the line and,
    /// like [`Self::remove_item`], is idempotent on an absent one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` for a positive quantity on a
    /// book not in the cart, and `CartError::InvalidQuantity` for
    /// negative quantities.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        book_id: &str,
        quantity: i32,
    ) -> Result<Cart, CartError> {
        if quantity < 0 {
            return Err(CartError::InvalidQuantity);
        }
        self.store
            .set_quantity(user_id, book_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::ItemNotFound,
                other => CartError::Repository(other),
            })
    }

    /// Remove a line from the cart. Removing an absent line is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn remove_item(&self, user_id: UserId, book_id: &str) -> Result<Cart, CartError> {
        Ok(self.store.remove_item(user_id, book_id).await?)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the store fails.
    pub async fn clear(&self, user_id: UserId) -> Result<Cart, CartError> {
        Ok(self.store.clear(user_id).await?)
    }
}

fn validate_item(item: &CartItem) -> Result<(), CartError> {
    if item.book_id.trim().is_empty() {
        return Err(CartError::InvalidItem("book id must not be empty"));
    }
    if item.title.trim().is_empty() {
        return Err(CartError::InvalidItem("title must not be empty"));
    }
    if item.price < Decimal::ZERO {
        return Err(CartError::InvalidItem("price must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::memory::InMemoryCartStore;

    fn item(book_id: &str, quantity: i32) -> CartItem {
        CartItem {
            book_id: book_id.to_owned(),
            title: format!("Book {book_id}"),
            authors: vec!["Anne Author".to_owned()],
            price: Decimal::new(1099, 2),
            quantity,
            thumbnail: None,
        }
    }

    fn user() -> UserId {
        UserId::new(1)
    }

    #[tokio::test]
    async fn empty_cart_on_first_load() {
        let store = InMemoryCartStore::new();
        let svc = CartService::new(&store);
        let cart = svc.cart(user()).await.unwrap();
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn add_merges_quantities_for_same_book() {
        let store = InMemoryCartStore::new();
        let svc = CartService::new(&store);
        svc.add_item(user(), item("b1", 2)).await.unwrap();
        let cart = svc.add_item(user(), item("b1", 3)).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[tokio::test]
    async fn concurrent_adds_lose_no_quantity() {
        let store = Arc::new(InMemoryCartStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                CartService::new(&*store)
                    .add_item(user(), item("b1", 1))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let cart = CartService::new(&*store).cart(user()).await.unwrap();
        assert_eq!(cart.items[0].quantity, 8);
    }

    #[tokio::test]
    async fn set_replaces_instead_of_merging() {
        let store = InMemoryCartStore::new();
        let svc = CartService::new(&store);
        svc.add_item(user(), item("b1", 4)).await.unwrap();
        let cart = svc.set_quantity(user(), "b1", 2).await.unwrap();
        assert_eq!(cart.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn set_to_zero_removes_the_line() {
        let store = InMemoryCartStore::new();
        let svc = CartService::new(&store);
        svc.add_item(user(), item("b1", 4)).await.unwrap();
        let cart = svc.set_quantity(user(), "b1", 0).await.unwrap();
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn set_on_missing_line_is_not_found() {
        let store = InMemoryCartStore::new();
        let svc = CartService::new(&store);
        assert!(matches!(
            svc.set_quantity(user(), "ghost", 2).await,
            Err(CartError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn set_zero_on_missing_line_is_a_noop() {
        let store = InMemoryCartStore::new();
        let svc = CartService::new(&store);
        svc.add_item(user(), item("b1", 1)).await.unwrap();
        let cart = svc.set_quantity(user(), "ghost", 0).await.unwrap();
        assert_eq!(cart.items.len(), 1);
    }

    #[tokio::test]
    async fn remove_absent_line_is_a_noop() {
        let store = InMemoryCartStore::new();
        let svc = CartService::new(&store);
        svc.add_item(user(), item("b1", 1)).await.unwrap();
        let cart = svc.remove_item(user(), "ghost").await.unwrap();
        assert_eq!(cart.items.len(), 1);
    }

    #[tokio::test]
    async fn rejects_bad_items() {
        let store = InMemoryCartStore::new();
        let svc = CartService::new(&store);
        assert!(matches!(
            svc.add_item(user(), item("b1", 0)).await,
            Err(CartError::InvalidQuantity)
        ));
        assert!(matches!(
            svc.add_item(user(), item("  ", 1)).await,
            Err(CartError::InvalidItem(_))
        ));
        let mut bad = item("b1", 1);
        bad.price = Decimal::new(-1, 0);
        assert!(matches!(
            svc.add_item(user(), bad).await,
            Err(CartError::InvalidItem(_))
        ));
    }
}

//! In-memory store implementations for tests.
//!
//! These mirror the SQL-backed semantics (additive merge, idempotency
//! keys, lazy cart creation, `updated_at` bumped only on mutation) so
//! cart and checkout behavior can be exercised without `PostgreSQL`.
//! [`InMemoryCartStore::fail_next_clears`] injects clear failures to
//! test the checkout partial-failure path.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use chrono::{DateTime, Utc};

use booknest_core::{CartId, OrderId, UserId};

use super::{CartStore, OrderLedger, RepositoryError};
use crate::models::order::NewOrder;
use crate::models::{Cart, CartItem, Order, OrderStatus};

struct CartCell {
    items: Vec<CartItem>,
    updated_at: DateTime<Utc>,
}

impl CartCell {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    fn snapshot(&self, user_id: UserId) -> Cart {
        Cart {
            id: CartId::new(user_id.as_i64()),
            user_id,
            items: self.items.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// In-memory cart store with fault injection for clears.
#[derive(Default)]
pub struct InMemoryCartStore {
    carts: Mutex<HashMap<UserId, CartCell>>,
    failing_clears: AtomicU32,
}

#[allow(clippy::unwrap_used)]
impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls to `clear` fail with a database error.
    pub fn fail_next_clears(&self, n: u32) {
        self.failing_clears.store(n, Ordering::SeqCst);
    }

    /// Seed the store with a cart.
    pub fn seed(&self, user_id: UserId, items: Vec<CartItem>) {
        let mut cell = CartCell::empty();
        cell.items = items;
        self.carts.lock().unwrap().insert(user_id, cell);
    }
}

#[allow(clippy::unwrap_used)]
impl CartStore for InMemoryCartStore {
    async fn load(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut carts = self.carts.lock().unwrap();
        let cell = carts.entry(user_id).or_insert_with(CartCell::empty);
        Ok(cell.snapshot(user_id))
    }

    async fn add_quantity(
        &self,
        user_id: UserId,
        item: CartItem,
    ) -> Result<Cart, RepositoryError> {
        let mut carts = self.carts.lock().unwrap();
        let cell = carts.entry(user_id).or_insert_with(CartCell::empty);
        match cell.items.iter_mut().find(|i| i.book_id == item.book_id) {
            Some(line) => {
                line.quantity += item.quantity;
                if item.thumbnail.is_some() {
                    line.thumbnail = item.thumbnail;
                }
            }
            None => cell.items.push(item),
        }
        cell.updated_at = Utc::now();
        Ok(cell.snapshot(user_id))
    }

    async fn set_quantity(
        &self,
        user_id: UserId,
        book_id: &str,
        quantity: i32,
    ) -> Result<Cart, RepositoryError> {
        let mut carts = self.carts.lock().unwrap();
        let cell = carts.entry(user_id).or_insert_with(CartCell::empty);
        let Some(pos) = cell.items.iter().position(|i| i.book_id == book_id) else {
            if quantity == 0 {
                return Ok(cell.snapshot(user_id));
            }
            return Err(RepositoryError::NotFound);
        };
        if quantity == 0 {
            cell.items.remove(pos);
        } else {
            cell.items[pos].quantity = quantity;
        }
        cell.updated_at = Utc::now();
        Ok(cell.snapshot(user_id))
    }

    async fn remove_item(&self, user_id: UserId, book_id: &str) -> Result<Cart, RepositoryError> {
        let mut carts = self.carts.lock().unwrap();
        let cell = carts.entry(user_id).or_insert_with(CartCell::empty);
        cell.items.retain(|i| i.book_id != book_id);
        cell.updated_at = Utc::now();
        Ok(cell.snapshot(user_id))
    }

    async fn clear(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        if self
            .failing_clears
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        let mut carts = self.carts.lock().unwrap();
        let cell = carts.entry(user_id).or_insert_with(CartCell::empty);
        cell.items.clear();
        cell.updated_at = Utc::now();
        Ok(cell.snapshot(user_id))
    }
}

/// In-memory append-only order ledger honoring idempotency keys.
#[derive(Default)]
pub struct InMemoryOrderLedger {
    orders: Mutex<Vec<(Option<String>, Order)>>,
    next_id: AtomicI64,
}

#[allow(clippy::unwrap_used)]
impl InMemoryOrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders ever created.
    pub fn len(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[allow(clippy::unwrap_used)]
impl OrderLedger for InMemoryOrderLedger {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut orders = self.orders.lock().unwrap();

        // A reused idempotency key returns the original order, never a
        // duplicate, matching the SQL ON CONFLICT path.
        if let Some(key) = &order.idempotency_key
            && let Some((_, existing)) = orders
                .iter()
                .find(|(k, _)| k.as_deref() == Some(key.as_str()))
        {
            return Ok(existing.clone());
        }

        let id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let created = Order {
            id,
            user_id: order.user_id,
            items: order.items,
            total: order.total,
            shipping_address: order.shipping_address,
            status: order.status,
            created_at: Utc::now(),
        };
        orders.push((order.idempotency_key, created.clone()));
        Ok(created)
    }

    async fn list_paid(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .iter()
            .filter(|(_, o)| o.user_id == user_id && o.status == OrderStatus::Paid)
            .map(|(_, o)| o.clone())
            .collect())
    }
}

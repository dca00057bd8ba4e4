//! Order domain types.
//!
//! An order is an immutable snapshot of purchased cart lines. Prices and
//! titles are copied at purchase time so history stays stable even when
//! catalog data changes later.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use booknest_core::{OrderId, UserId};

/// Lifecycle status of an order.
///
/// `Pending` is representable but no current flow creates one: checkout
/// always produces `Paid` orders. Once paid, an order never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
}

impl OrderStatus {
    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    /// Parse from the database/wire representation.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// One purchased line: a snapshot of a [`crate::models::CartItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Catalog book identifier.
    pub book_id: String,
    /// Title at purchase time.
    pub title: String,
    /// Authors at purchase time.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Unit price at purchase time.
    pub price: Decimal,
    /// Purchased quantity.
    pub quantity: i32,
}

impl OrderItem {
    /// Line total: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

impl From<crate::models::CartItem> for OrderItem {
    fn from(item: crate::models::CartItem) -> Self {
        Self {
            book_id: item.book_id,
            title: item.title,
            authors: item.authors,
            price: item.price,
            quantity: item.quantity,
        }
    }
}

/// A finalized purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Purchasing user.
    pub user_id: UserId,
    /// Immutable item snapshot.
    pub items: Vec<OrderItem>,
    /// Subtotal plus shipping, fixed at creation.
    pub total: Decimal,
    /// Free-form shipping address string.
    pub shipping_address: String,
    /// Order status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}

/// Rejected order snapshot.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidOrder {
    /// An order must contain at least one item.
    #[error("order has no items")]
    NoItems,
    /// An order total must be a positive amount.
    #[error("order total must be positive")]
    NonPositiveTotal,
}

/// A not-yet-persisted order, validated at construction.
///
/// The order ledger only accepts this type, so an empty or non-positive
/// order can never reach storage.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub shipping_address: String,
    pub status: OrderStatus,
    /// Deduplicates retried checkouts; `None` skips deduplication.
    pub idempotency_key: Option<String>,
}

impl NewOrder {
    /// Validate and build an order snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOrder`] when `items` is empty or `total` is not
    /// positive.
    pub fn new(
        user_id: UserId,
        items: Vec<OrderItem>,
        total: Decimal,
        shipping_address: String,
        status: OrderStatus,
        idempotency_key: Option<String>,
    ) -> Result<Self, InvalidOrder> {
        if items.is_empty() {
            return Err(InvalidOrder::NoItems);
        }
        if total <= Decimal::ZERO {
            return Err(InvalidOrder::NonPositiveTotal);
        }
        Ok(Self {
            user_id,
            items,
            total,
            shipping_address,
            status,
            idempotency_key,
        })
    }
}

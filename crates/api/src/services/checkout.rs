//! Checkout orchestrator.
//!
//! Turns a cart snapshot into a paid order. The order write is the
//! authoritative step: once it lands, checkout reports success even if
//! the follow-up cart clear fails. A retried checkout over the same
//! snapshot carries the same idempotency key and resolves to the
//! already-created order instead of charging twice.
//!
//! Prices always come from the stored cart, never from the client; a
//! client-supplied total is only checked against the server's own
//! arithmetic.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use booknest_core::UserId;

use crate::db::{CartStore, OrderLedger, RepositoryError};
use crate::models::order::{InvalidOrder, NewOrder};
use crate::models::{Cart, Order, OrderItem, OrderStatus};

/// Shipping pricing knobs.
///
/// Shipping is free strictly above the threshold; at or below it the
/// flat fee applies.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub free_shipping_threshold: Decimal,
    pub shipping_fee: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::from(5000),
            shipping_fee: Decimal::from(500),
        }
    }
}

/// Server-computed checkout amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Compute subtotal, shipping, and total for a set of order lines.
#[must_use]
pub fn compute_totals(items: &[OrderItem], pricing: &PricingConfig) -> Totals {
    let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();
    let shipping = if subtotal > pricing.free_shipping_threshold {
        Decimal::ZERO
    } else {
        pricing.shipping_fee
    };
    Totals {
        subtotal,
        shipping,
        total: subtotal + shipping,
    }
}

/// A checkout request, already authenticated.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Book ids to purchase. Empty means the whole cart.
    pub item_ids: Vec<String>,
    /// Where to ship.
    pub shipping_address: String,
    /// Client's idea of the total, if it sent one. Verified, not trusted.
    pub expected_total: Option<Decimal>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// False when the order was created but the cart could not be
    /// cleared; the stale cart reconciles on the next checkout.
    pub cart_cleared: bool,
}

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Cart is empty, or the selection matched no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// Client-supplied total disagrees with the server's arithmetic.
    #[error("total mismatch: expected {expected}, got {supplied}")]
    TotalMismatch {
        expected: Decimal,
        supplied: Decimal,
    },

    /// Shipping address missing.
    #[error("shipping address must not be empty")]
    MissingAddress,

    /// The assembled order failed validation.
    #[error(transparent)]
    Invalid(#[from] InvalidOrder),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Checkout orchestrator over any cart store and order ledger.
pub struct CheckoutService<'a, C, L> {
    carts: &'a C,
    ledger: &'a L,
    pricing: &'a PricingConfig,
}

impl<'a, C: CartStore, L: OrderLedger> CheckoutService<'a, C, L> {
    #[must_use]
    pub const fn new(carts: &'a C, ledger: &'a L, pricing: &'a PricingConfig) -> Self {
        Self {
            carts,
            ledger,
            pricing,
        }
    }

    /// Run the checkout flow for a user.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` when nothing is purchasable,
    /// `CheckoutError::TotalMismatch` when the client's total disagrees
    /// with the server's, and `CheckoutError::Repository` when the
    /// order write itself fails. A failed cart clear after a successful
    /// order write is NOT an error; see [`CheckoutOutcome::cart_cleared`].
    pub async fn checkout(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if request.shipping_address.trim().is_empty() {
            return Err(CheckoutError::MissingAddress);
        }

        let cart = self.carts.load(user_id).await?;
        let items = select_items(&cart, &request.item_ids);
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let totals = compute_totals(&items, self.pricing);
        if let Some(supplied) = request.expected_total
            && supplied != totals.total
        {
            return Err(CheckoutError::TotalMismatch {
                expected: totals.total,
                supplied,
            });
        }

        let key = idempotency_key(user_id, &cart, &items);
        let order = NewOrder::new(
            user_id,
            items,
            totals.total,
            request.shipping_address,
            OrderStatus::Paid,
            Some(key),
        )?;
        let order = self.ledger.create(order).await?;

        let cart_cleared = self.clear_with_retry(user_id).await;

        Ok(CheckoutOutcome {
            order,
            cart_cleared,
        })
    }

    /// Clear the cart, retrying once. Returns whether the cart ended up
    /// cleared; the order already exists either way.
    async fn clear_with_retry(&self, user_id: UserId) -> bool {
        let first = match self.carts.clear(user_id).await {
            Ok(_) => return true,
            Err(e) => e,
        };
        warn!(user_id = %user_id, error = %first, "cart clear failed after order creation, retrying");

        match self.carts.clear(user_id).await {
            Ok(_) => true,
            Err(second) => {
                warn!(
                    user_id = %user_id,
                    error = %second,
                    "cart clear failed twice; order stands, cart left stale"
                );
                false
            }
        }
    }
}

/// Resolve the requested book ids against the live cart. An empty
/// selection means the whole cart.
fn select_items(cart: &Cart, item_ids: &[String]) -> Vec<OrderItem> {
    cart.items
        .iter()
        .filter(|i| item_ids.is_empty() || item_ids.iter().any(|id| *id == i.book_id))
        .cloned()
        .map(OrderItem::from)
        .collect()
}

/// Deterministic key for this (user, cart snapshot, selection) triple.
///
/// Includes the cart's `updated_at` so that a retry over an untouched
/// cart dedupes, while a genuinely new purchase of the same books after
/// the cart was rebuilt gets a fresh key.
fn idempotency_key(user_id: UserId, cart: &Cart, items: &[OrderItem]) -> String {
    let mut lines: Vec<String> = items
        .iter()
        .map(|i| format!("{}:{}:{}", i.book_id, i.quantity, i.price))
        .collect();
    lines.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(user_id.as_i64().to_be_bytes());
    hasher.update(
        cart.updated_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| cart.updated_at.timestamp_millis())
            .to_be_bytes(),
    );
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update([0]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{InMemoryCartStore, InMemoryOrderLedger};
    use crate::models::CartItem;

    fn item(book_id: &str, price: i64, quantity: i32) -> CartItem {
        CartItem {
            book_id: book_id.to_owned(),
            title: format!("Book {book_id}"),
            authors: vec![],
            price: Decimal::from(price),
            quantity,
            thumbnail: None,
        }
    }

    fn user() -> UserId {
        UserId::new(7)
    }

    fn request(item_ids: Vec<String>) -> CheckoutRequest {
        CheckoutRequest {
            item_ids,
            shipping_address: "1 Main St".to_owned(),
            expected_total: None,
        }
    }

    fn pricing() -> PricingConfig {
        PricingConfig::default()
    }

    #[test]
    fn shipping_is_free_strictly_above_threshold() {
        let p = pricing();
        let at = compute_totals(&[item("b", 5000, 1).into()], &p);
        assert_eq!(at.shipping, Decimal::from(500));
        assert_eq!(at.total, Decimal::from(5500));

        let above = compute_totals(&[item("b", 5001, 1).into()], &p);
        assert_eq!(above.shipping, Decimal::ZERO);
        assert_eq!(above.total, Decimal::from(5001));
    }

    #[tokio::test]
    async fn full_cart_checkout_creates_paid_order_and_clears_cart() {
        let carts = InMemoryCartStore::new();
        let ledger = InMemoryOrderLedger::new();
        carts.seed(user(), vec![item("b1", 1200, 2), item("b2", 800, 1)]);
        let p = pricing();
        let svc = CheckoutService::new(&carts, &ledger, &p);

        let outcome = svc.checkout(user(), request(vec![])).await.unwrap();
        assert!(outcome.cart_cleared);
        assert_eq!(outcome.order.status, OrderStatus::Paid);
        // 2*1200 + 800 = 3200, below threshold => +500 shipping
        assert_eq!(outcome.order.total, Decimal::from(3700));

        assert!(carts.load(user()).await.unwrap().items.is_empty());
        let paid = ledger.list_paid(user()).await.unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].id, outcome.order.id);
    }

    #[tokio::test]
    async fn subset_checkout_charges_only_selected_lines() {
        let carts = InMemoryCartStore::new();
        let ledger = InMemoryOrderLedger::new();
        carts.seed(user(), vec![item("b1", 1000, 1), item("b2", 2000, 3)]);
        let p = pricing();
        let svc = CheckoutService::new(&carts, &ledger, &p);

        let outcome = svc
            .checkout(user(), request(vec!["b2".to_owned()]))
            .await
            .unwrap();
        assert_eq!(outcome.order.items.len(), 1);
        assert_eq!(outcome.order.items[0].book_id, "b2");
        // 3*2000 = 6000 > threshold => free shipping
        assert_eq!(outcome.order.total, Decimal::from(6000));
    }

    #[tokio::test]
    async fn order_totals_never_trust_the_client() {
        let carts = InMemoryCartStore::new();
        let ledger = InMemoryOrderLedger::new();
        carts.seed(user(), vec![item("b1", 1000, 1)]);
        let p = pricing();
        let svc = CheckoutService::new(&carts, &ledger, &p);

        let mut req = request(vec![]);
        req.expected_total = Some(Decimal::ONE);
        let err = svc.checkout(user(), req).await.unwrap_err();
        assert!(matches!(err, CheckoutError::TotalMismatch { .. }));
        assert!(ledger.is_empty());

        let mut req = request(vec![]);
        req.expected_total = Some(Decimal::from(1500));
        svc.checkout(user(), req).await.unwrap();
    }

    #[tokio::test]
    async fn empty_cart_and_empty_selection_are_rejected() {
        let carts = InMemoryCartStore::new();
        let ledger = InMemoryOrderLedger::new();
        let p = pricing();
        let svc = CheckoutService::new(&carts, &ledger, &p);

        assert!(matches!(
            svc.checkout(user(), request(vec![])).await,
            Err(CheckoutError::EmptyCart)
        ));

        carts.seed(user(), vec![item("b1", 1000, 1)]);
        assert!(matches!(
            svc.checkout(user(), request(vec!["ghost".to_owned()])).await,
            Err(CheckoutError::EmptyCart)
        ));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn order_survives_cart_clear_failure_and_retry_does_not_duplicate() {
        let carts = InMemoryCartStore::new();
        let ledger = InMemoryOrderLedger::new();
        carts.seed(user(), vec![item("b1", 1000, 2)]);
        // Both the clear and its retry fail.
        carts.fail_next_clears(2);
        let p = pricing();
        let svc = CheckoutService::new(&carts, &ledger, &p);

        let outcome = svc.checkout(user(), request(vec![])).await.unwrap();
        assert!(!outcome.cart_cleared);
        assert_eq!(ledger.len(), 1);
        // Cart is stale: items still there.
        assert_eq!(carts.load(user()).await.unwrap().items.len(), 1);

        // User retries the same checkout over the untouched cart: same
        // order comes back, nothing new in the ledger, cart now clears.
        let retry = svc.checkout(user(), request(vec![])).await.unwrap();
        assert!(retry.cart_cleared);
        assert_eq!(retry.order.id, outcome.order.id);
        assert_eq!(ledger.len(), 1);
        assert!(carts.load(user()).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn rebuilt_cart_gets_a_fresh_order() {
        let carts = InMemoryCartStore::new();
        let ledger = InMemoryOrderLedger::new();
        let p = pricing();
        let svc = CheckoutService::new(&carts, &ledger, &p);

        carts.seed(user(), vec![item("b1", 1000, 1)]);
        let first = svc.checkout(user(), request(vec![])).await.unwrap();

        // Same book, bought again later: the snapshot changed, so this
        // is a new order, not a dedupe hit.
        carts.add_quantity(user(), item("b1", 1000, 1)).await.unwrap();
        let second = svc.checkout(user(), request(vec![])).await.unwrap();

        assert_ne!(first.order.id, second.order.id);
        assert_eq!(ledger.len(), 2);
    }

    #[tokio::test]
    async fn missing_address_is_rejected() {
        let carts = InMemoryCartStore::new();
        let ledger = InMemoryOrderLedger::new();
        carts.seed(user(), vec![item("b1", 1000, 1)]);
        let p = pricing();
        let svc = CheckoutService::new(&carts, &ledger, &p);

        let mut req = request(vec![]);
        req.shipping_address = "  ".to_owned();
        assert!(matches!(
            svc.checkout(user(), req).await,
            Err(CheckoutError::MissingAddress)
        ));
    }
}

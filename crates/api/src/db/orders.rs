//! Order ledger repository.
//!
//! Orders are append-only: rows are inserted once, with their item
//! snapshot, inside a transaction, and never updated or deleted. An
//! idempotency key deduplicates retried checkouts.

use sqlx::PgPool;

use booknest_core::{OrderId, UserId};

use super::{OrderLedger, RepositoryError};
use crate::models::order::NewOrder;
use crate::models::{Order, OrderItem, OrderStatus};

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    total: rust_decimal::Decimal,
    shipping_address: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    book_id: String,
    title: String,
    authors: Vec<String>,
    unit_price: rust_decimal::Decimal,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            book_id: row.book_id,
            title: row.title,
            authors: row.authors,
            price: row.unit_price,
            quantity: row.quantity,
        }
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status = OrderStatus::from_str_opt(&self.status).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("invalid order status: {}", self.status))
        })?;

        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            items,
            total: self.total,
            shipping_address: self.shipping_address,
            status,
            created_at: self.created_at,
        })
    }
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn items_for(&self, order_id: i64) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT book_id, title, authors, unit_price, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    /// Fetch a previously created order by its idempotency key.
    async fn get_by_idempotency_key(&self, key: &str) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total, shipping_address, status, created_at
            FROM orders
            WHERE idempotency_key = $1
            ",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let items = self.items_for(row.id).await?;
        row.into_order(items)
    }
}

impl OrderLedger for OrderRepository<'_> {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (user_id, total, shipping_address, status, idempotency_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (idempotency_key) DO NOTHING
            RETURNING id, user_id, total, shipping_address, status, created_at
            ",
        )
        .bind(order.user_id)
        .bind(order.total)
        .bind(&order.shipping_address)
        .bind(order.status.as_str())
        .bind(&order.idempotency_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = inserted else {
            // Key already used: this checkout was already persisted.
            // Return the authoritative order instead of a duplicate.
            tx.rollback().await?;
            let key = order
                .idempotency_key
                .as_deref()
                .ok_or_else(|| {
                    RepositoryError::DataCorruption(
                        "insert without idempotency key returned no row".to_owned(),
                    )
                })?;
            return self.get_by_idempotency_key(key).await;
        };

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, book_id, title, authors, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(row.id)
            .bind(&item.book_id)
            .bind(&item.title)
            .bind(&item.authors)
            .bind(item.price)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.into_order(order.items)
    }

    async fn list_paid(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total, shipping_address, status, created_at
            FROM orders
            WHERE user_id = $1 AND status = 'paid'
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.items_for(row.id).await?;
            orders.push(row.into_order(items)?);
        }

        Ok(orders)
    }
}

//! Cart repository for database operations.
//!
//! Every mutation is a single SQL statement, so concurrent writers to the
//! same cart serialize at the row level inside `PostgreSQL` and an add can
//! never be lost to a racing full-document write.

use sqlx::PgPool;

use booknest_core::{CartId, UserId};

use super::{CartStore, RepositoryError};
use crate::models::{Cart, CartItem};

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i64,
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    book_id: String,
    title: String,
    authors: Vec<String>,
    unit_price: rust_decimal::Decimal,
    quantity: i32,
    thumbnail: Option<String>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            book_id: row.book_id,
            title: row.title,
            authors: row.authors,
            price: row.unit_price,
            quantity: row.quantity,
            thumbnail: row.thumbnail,
        }
    }
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Ensure the user's cart row exists and return its ID.
    ///
    /// Carts are created lazily on first access; the upsert makes this
    /// safe under concurrent first reads.
    async fn ensure_cart(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, updated_at FROM carts WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(CartId::new(row.id))
    }

    /// Fetch the full cart with items in insertion order.
    async fn fetch(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let cart = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, updated_at FROM carts WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        let items = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT book_id, title, authors, unit_price, quantity, thumbnail
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY position ASC
            ",
        )
        .bind(cart.id)
        .fetch_all(self.pool)
        .await?;

        Ok(Cart {
            id: CartId::new(cart.id),
            user_id,
            items: items.into_iter().map(CartItem::from).collect(),
            updated_at: cart.updated_at,
        })
    }

    /// Bump the cart's `updated_at` after a mutation.
    async fn touch(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE carts SET updated_at = now() WHERE id = $1
            ",
        )
        .bind(cart_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

impl CartStore for CartRepository<'_> {
    async fn load(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        self.ensure_cart(user_id).await?;
        self.fetch(user_id).await
    }

    async fn add_quantity(
        &self,
        user_id: UserId,
        item: CartItem,
    ) -> Result<Cart, RepositoryError> {
        let cart_id = self.ensure_cart(user_id).await?;

        // Atomic merge: the addition happens inside the database, so two
        // concurrent adds for the same book both land.
        sqlx::query(
            r"
            INSERT INTO cart_items (cart_id, book_id, title, authors, unit_price, quantity, thumbnail)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (cart_id, book_id) DO UPDATE
            SET quantity = cart_items.quantity + EXCLUDED.quantity,
                thumbnail = COALESCE(EXCLUDED.thumbnail, cart_items.thumbnail)
            ",
        )
        .bind(cart_id)
        .bind(&item.book_id)
        .bind(&item.title)
        .bind(&item.authors)
        .bind(item.price)
        .bind(item.quantity)
        .bind(&item.thumbnail)
        .execute(self.pool)
        .await?;

        self.touch(cart_id).await?;
        self.fetch(user_id).await
    }

    async fn set_quantity(
        &self,
        user_id: UserId,
        book_id: &str,
        quantity: i32,
    ) -> Result<Cart, RepositoryError> {
        let cart_id = self.ensure_cart(user_id).await?;

        if quantity == 0 {
            // A line set to zero is removed; zeroing an absent line is
            // idempotent like remove.
            sqlx::query(
                r"
                DELETE FROM cart_items WHERE cart_id = $1 AND book_id = $2
                ",
            )
            .bind(cart_id)
            .bind(book_id)
            .execute(self.pool)
            .await?;
        } else {
            let result = sqlx::query(
                r"
                UPDATE cart_items SET quantity = $3
                WHERE cart_id = $1 AND book_id = $2
                ",
            )
            .bind(cart_id)
            .bind(book_id)
            .bind(quantity)
            .execute(self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
        }

        self.touch(cart_id).await?;
        self.fetch(user_id).await
    }

    async fn remove_item(&self, user_id: UserId, book_id: &str) -> Result<Cart, RepositoryError> {
        let cart_id = self.ensure_cart(user_id).await?;

        // Idempotent: removing an absent line succeeds with no-op.
        sqlx::query(
            r"
            DELETE FROM cart_items WHERE cart_id = $1 AND book_id = $2
            ",
        )
        .bind(cart_id)
        .bind(book_id)
        .execute(self.pool)
        .await?;

        self.touch(cart_id).await?;
        self.fetch(user_id).await
    }

    async fn clear(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let cart_id = self.ensure_cart(user_id).await?;

        sqlx::query(
            r"
            DELETE FROM cart_items WHERE cart_id = $1
            ",
        )
        .bind(cart_id)
        .execute(self.pool)
        .await?;

        self.touch(cart_id).await?;
        self.fetch(user_id).await
    }
}

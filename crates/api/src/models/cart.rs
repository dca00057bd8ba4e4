//! Cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use booknest_core::{CartId, UserId};

/// One line in a cart.
///
/// Lines are unique per `book_id`; adding the same book twice merges into
/// a single line with the summed quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalog book identifier.
    pub book_id: String,
    /// Book title at the time it was added.
    pub title: String,
    /// Book authors.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Unit price at the time it was added.
    pub price: Decimal,
    /// Line quantity, always >= 1.
    pub quantity: i32,
    /// Cover thumbnail URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl CartItem {
    /// Line total: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A user's cart: the mutable staging list of items not yet purchased.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Owning user.
    pub user_id: UserId,
    /// Lines in insertion order, unique by `book_id`.
    pub items: Vec<CartItem>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Look up a line by book ID.
    #[must_use]
    pub fn item(&self, book_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.book_id == book_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(book_id: &str, price: Decimal, quantity: i32) -> CartItem {
        CartItem {
            book_id: book_id.to_owned(),
            title: format!("Book {book_id}"),
            authors: vec!["Author".to_owned()],
            price,
            quantity,
            thumbnail: None,
        }
    }

    #[test]
    fn test_line_total() {
        let line = item("b1", Decimal::new(1099, 2), 3);
        assert_eq!(line.line_total(), Decimal::new(3297, 2));
    }

    #[test]
    fn test_item_lookup() {
        let cart = Cart {
            id: CartId::new(1),
            user_id: UserId::new(1),
            items: vec![item("b1", Decimal::from(10), 1)],
            updated_at: Utc::now(),
        };
        assert!(cart.item("b1").is_some());
        assert!(cart.item("b2").is_none());
    }

    #[test]
    fn test_cart_item_wire_shape() {
        let json = r#"{"bookId":"b1","title":"Dune","authors":["Frank Herbert"],"price":"10.99","quantity":2}"#;
        let line: CartItem = serde_json::from_str(json).unwrap();
        assert_eq!(line.book_id, "b1");
        assert_eq!(line.price, Decimal::new(1099, 2));
        assert!(line.thumbnail.is_none());
    }
}

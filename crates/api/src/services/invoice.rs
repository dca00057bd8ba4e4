//! Plain-text invoice rendering.
//!
//! Invoices are rendered from the immutable order snapshot, so they
//! stay correct even if catalog prices change later. Rendering runs on
//! a spawned task after checkout and is best-effort only.

use rust_decimal::Decimal;
use tracing::info;

use crate::models::{Order, OrderItem};

/// Render an order as a plain-text invoice.
#[must_use]
pub fn render(order: &Order) -> String {
    let subtotal: Decimal = order.items.iter().map(OrderItem::line_total).sum();
    let shipping = order.total - subtotal;

    let mut out = String::new();
    out.push_str(&format!("BookNest invoice #{}\n", order.id));
    out.push_str(&format!(
        "Placed: {}\n",
        order.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!("Ship to: {}\n", order.shipping_address));
    out.push('\n');

    for item in &order.items {
        out.push_str(&format!(
            "  {:<40} {:>3} x {:>10} = {:>12}\n",
            truncate(&item.title, 40),
            item.quantity,
            item.price,
            item.line_total(),
        ));
    }

    out.push('\n');
    out.push_str(&format!("  Subtotal: {subtotal:>12}\n"));
    out.push_str(&format!("  Shipping: {shipping:>12}\n"));
    out.push_str(&format!("  Total:    {:>12}\n", order.total));
    out
}

/// Render and log the invoice off the request path. Never fails the
/// caller.
pub fn spawn_render(order: Order) {
    tokio::spawn(async move {
        let invoice = render(&order);
        info!(order_id = %order.id, bytes = invoice.len(), "invoice rendered");
    });
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::OrderStatus;
    use booknest_core::{OrderId, UserId};

    #[test]
    fn renders_lines_and_totals() {
        let order = Order {
            id: OrderId::new(42),
            user_id: UserId::new(1),
            items: vec![
                OrderItem {
                    book_id: "b1".to_owned(),
                    title: "Dune".to_owned(),
                    authors: vec!["Frank Herbert".to_owned()],
                    price: Decimal::from(1200),
                    quantity: 2,
                },
                OrderItem {
                    book_id: "b2".to_owned(),
                    title: "Hyperion".to_owned(),
                    authors: vec![],
                    price: Decimal::from(800),
                    quantity: 1,
                },
            ],
            total: Decimal::from(3700),
            shipping_address: "1 Main St".to_owned(),
            status: OrderStatus::Paid,
            created_at: Utc::now(),
        };

        let invoice = render(&order);
        assert!(invoice.contains("invoice #42"));
        assert!(invoice.contains("Dune"));
        assert!(invoice.contains(&format!("Subtotal: {:>12}", Decimal::from(3200))));
        assert!(invoice.contains(&format!("Shipping: {:>12}", Decimal::from(500))));
        assert!(invoice.contains(&format!("Total:    {:>12}", Decimal::from(3700))));
        assert!(invoice.contains("Ship to: 1 Main St"));
    }

    #[test]
    fn truncates_long_titles() {
        assert_eq!(truncate("short", 40), "short");
        let long = "x".repeat(60);
        assert_eq!(truncate(&long, 40).len(), 40);
    }
}

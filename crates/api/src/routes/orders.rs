//! Order route handlers: history and checkout.

use axum::{extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::OrderLedger;
use crate::db::carts::CartRepository;
use crate::db::orders::OrderRepository;
use crate::error::Result;
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::models::Order;
use crate::services::checkout::{CheckoutRequest, CheckoutService};
use crate::services::invoice;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    /// Book ids to purchase; empty buys the whole cart.
    #[serde(default)]
    pub items: Vec<String>,
    pub shipping_address: String,
    /// Optional client-side total, verified against the server's.
    #[serde(default)]
    pub total: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub message: String,
    pub order: Order,
    /// Present when the order was placed but the cart is left stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// GET /api/orders
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Order>>> {
    let ledger = OrderRepository::new(state.pool());
    let orders = ledger.list_paid(user_id).await?;
    Ok(Json(orders))
}

/// POST /api/orders
///
/// Runs the checkout flow and kicks off invoice rendering off the
/// request path.
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let carts = CartRepository::new(state.pool());
    let ledger = OrderRepository::new(state.pool());
    let service = CheckoutService::new(&carts, &ledger, &state.config().pricing);

    let outcome = service
        .checkout(
            user_id,
            CheckoutRequest {
                item_ids: body.items,
                shipping_address: body.shipping_address,
                expected_total: body.total,
            },
        )
        .await?;

    invoice::spawn_render(outcome.order.clone());

    let warning = (!outcome.cart_cleared)
        .then(|| "Order placed, but the cart could not be emptied. It will reconcile on your next checkout.".to_string());

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            message: "Order placed successfully".to_string(),
            order: outcome.order,
            warning,
        }),
    ))
}

//! Cart route handlers.
//!
//! POST adds (merging quantities), PATCH sets a line's quantity
//! outright. The two are distinct on purpose: a double-tapped "add to
//! cart" should stack, a quantity picker should not.

use axum::extract::State;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::carts::CartRepository;
use crate::error::Result;
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::models::{Cart, CartItem};
use crate::services::cart::CartService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub book_id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    pub price: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

const fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityRequest {
    pub book_id: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub book_id: String,
}

/// GET /api/cart
pub async fn show(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Cart>> {
    let store = CartRepository::new(state.pool());
    let cart = CartService::new(&store).cart(user_id).await?;
    Ok(Json(cart))
}

/// POST /api/cart
pub async fn add(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<Cart>> {
    let store = CartRepository::new(state.pool());
    let item = CartItem {
        book_id: body.book_id,
        title: body.title,
        authors: body.authors,
        price: body.price,
        quantity: body.quantity,
        thumbnail: body.thumbnail,
    };
    let cart = CartService::new(&store).add_item(user_id, item).await?;
    Ok(Json(cart))
}

/// PATCH /api/cart
pub async fn set_quantity(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SetQuantityRequest>,
) -> Result<Json<Cart>> {
    let store = CartRepository::new(state.pool());
    let cart = CartService::new(&store)
        .set_quantity(user_id, &body.book_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /api/cart
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<RemoveItemRequest>,
) -> Result<Json<Cart>> {
    let store = CartRepository::new(state.pool());
    let cart = CartService::new(&store)
        .remove_item(user_id, &body.book_id)
        .await?;
    Ok(Json(cart))
}

/// DELETE /api/cart/all
pub async fn clear(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Cart>> {
    let store = CartRepository::new(state.pool());
    let cart = CartService::new(&store).clear(user_id).await?;
    Ok(Json(cart))
}

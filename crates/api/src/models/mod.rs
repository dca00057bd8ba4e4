//! Domain models.
//!
//! These types represent validated domain objects separate from database
//! row types. All wire-facing models serialize as camelCase JSON.

pub mod cart;
pub mod order;
pub mod user;

pub use cart::{Cart, CartItem};
pub use order::{Order, OrderItem, OrderStatus};
pub use user::User;

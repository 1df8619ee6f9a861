//! Application services sitting between the HTTP layer and the storage ports
pub mod cart;
pub mod orders;

pub use cart::{CartItemView, CartService};
pub use orders::{CheckoutOutcome, OrderService};

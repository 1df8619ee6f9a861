//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{Product, ProductSummary};
pub use order::{Order, OrderDetail, OrderDraft, OrderError, OrderLine, OrderStatus, OrderWithDetails};
pub use cart::{Cart, CartEntry, CartError};
pub use user::{Role, UnknownRole, UserProfile};

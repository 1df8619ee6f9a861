//! Storage backends and outbound adapters
pub mod events;
pub mod memory;
pub mod postgres;

pub use events::EventSink;
pub use memory::InMemoryStore;
pub use postgres::PgStore;

pub(crate) const CART_CONFLICT: &str = "Cart changed during checkout, please retry";

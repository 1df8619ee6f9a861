//! Storefront domain: aggregates, value objects, events and the storage ports
pub mod aggregates;
pub mod events;
pub mod ports;
pub mod value_objects;

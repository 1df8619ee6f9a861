//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::{OrderId, ProductId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Cart(CartEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: OrderId, user_id: UserId, total: Decimal, line_count: usize },
    StatusChanged { order_id: OrderId, from: OrderStatus, to: OrderStatus },
    Deleted { order_id: OrderId },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CartEvent {
    /// Entries dropped at checkout because their product no longer resolves
    Pruned { user_id: UserId, products: Vec<ProductId> },
}

impl DomainEvent {
    /// NATS subject the event is published on
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "storefront.order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "storefront.order.status_changed",
            Self::Order(OrderEvent::Deleted { .. }) => "storefront.order.deleted",
            Self::Cart(CartEvent::Pruned { .. }) => "storefront.cart.pruned",
        }
    }
}

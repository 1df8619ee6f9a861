//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use crate::domain::aggregates::{CartEntry, Product, ProductSummary};
use crate::domain::value_objects::{Money, OrderDetailId, OrderId, ProductId, Quantity, UserId};

/// Immutable record of a checkout. Only the status moves after creation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    user: UserId,
    total_amount: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// One purchased product with its unit price frozen at checkout
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    id: OrderDetailId,
    order: OrderId,
    product: ProductId,
    quantity: Quantity,
    price_each: Money,
}

/// Order detail with the product display fields resolved
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: OrderDetailId,
    pub order: OrderId,
    pub product: ProductSummary,
    pub quantity: Quantity,
    pub price_each: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithDetails {
    #[serde(flatten)]
    pub order: Order,
    pub order_details: Vec<OrderLine>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    /// Exact, case-sensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|status| status.as_str() == s).ok_or(OrderError::InvalidStatus)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl Order {
    pub fn restore(id: OrderId, user: UserId, total_amount: Money, status: OrderStatus, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self { id, user, total_amount, status, created_at, updated_at }
    }

    pub fn id(&self) -> OrderId { self.id }
    pub fn user(&self) -> UserId { self.user }
    pub fn total_amount(&self) -> Money { self.total_amount }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Any status may follow any other, backwards included.
    pub fn set_status(&mut self, status: OrderStatus) { self.status = status; self.updated_at = Utc::now(); }
}

impl OrderDetail {
    pub fn restore(id: OrderDetailId, order: OrderId, product: ProductId, quantity: Quantity, price_each: Money) -> Self {
        Self { id, order, product, quantity, price_each }
    }

    pub fn id(&self) -> OrderDetailId { self.id }
    pub fn order(&self) -> OrderId { self.order }
    pub fn product(&self) -> ProductId { self.product }
    pub fn quantity(&self) -> Quantity { self.quantity }
    pub fn price_each(&self) -> Money { self.price_each }
    pub fn line_total(&self) -> Money { self.price_each.multiply(self.quantity) }

    pub fn resolve(&self, catalog: &HashMap<ProductId, Product>) -> OrderLine {
        let product = catalog.get(&self.product).map(Product::summary).unwrap_or_else(|| ProductSummary::unresolved(self.product));
        OrderLine { id: self.id, order: self.order, product, quantity: self.quantity, price_each: self.price_each }
    }
}

/// A priced order that has not been written yet
#[derive(Clone, Debug)]
pub struct OrderDraft {
    order: Order,
    details: Vec<OrderDetail>,
}

impl OrderDraft {
    /// Prices `entries` against `catalog`. Entries whose product is not in the
    /// catalog are skipped; callers prune those from the cart beforehand.
    pub fn price(user: UserId, entries: &[CartEntry], catalog: &HashMap<ProductId, Product>) -> Result<Self, OrderError> {
        let now = Utc::now();
        let id = OrderId::new();
        let details: Vec<OrderDetail> = entries.iter()
            .filter_map(|entry| catalog.get(&entry.product).map(|p| OrderDetail {
                id: OrderDetailId::new(), order: id, product: entry.product,
                quantity: entry.quantity, price_each: p.unit_price(),
            }))
            .collect();
        if details.is_empty() { return Err(OrderError::NoItems); }
        let total_amount = details.iter().fold(Money::ZERO, |acc, d| acc.add(&d.line_total()));
        let order = Order { id, user, total_amount, status: OrderStatus::default(), created_at: now, updated_at: now };
        Ok(Self { order, details })
    }

    pub fn order(&self) -> &Order { &self.order }
    pub fn details(&self) -> &[OrderDetail] { &self.details }
    pub fn into_parts(self) -> (Order, Vec<OrderDetail>) { (self.order, self.details) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems, InvalidStatus }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "Products in cart are no longer available"),
            Self::InvalidStatus => write!(f, "Invalid order status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn entry(product: ProductId, qty: i64) -> CartEntry {
        CartEntry { product, quantity: Quantity::new(qty).unwrap(), added_at: Utc::now() }
    }

    #[test]
    fn test_draft_snapshots_prices() {
        let a = Product::new("A", Decimal::new(10, 0));
        let b = Product::new("B", Decimal::new(8, 0)).with_sale_price(Decimal::new(5, 0));
        let entries = vec![entry(a.id, 2), entry(b.id, 1)];
        let catalog = HashMap::from([(a.id, a.clone()), (b.id, b.clone())]);

        let draft = OrderDraft::price(UserId::new(), &entries, &catalog).unwrap();
        assert_eq!(draft.order().total_amount().amount(), Decimal::new(25, 0));
        assert_eq!(draft.order().status(), OrderStatus::Processing);
        assert_eq!(draft.details().len(), 2);
        assert!(draft.details().iter().all(|d| d.order() == draft.order().id()));
        let b_line = draft.details().iter().find(|d| d.product() == b.id).unwrap();
        assert_eq!(b_line.price_each().amount(), Decimal::new(5, 0));
    }

    #[test]
    fn test_draft_without_resolvable_products_fails() {
        let entries = vec![entry(ProductId::new(), 1)];
        let result = OrderDraft::price(UserId::new(), &entries, &HashMap::new());
        assert_eq!(result.unwrap_err(), OrderError::NoItems);
    }

    #[test]
    fn test_status_parse_is_exact() {
        assert_eq!("shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert_eq!("Shipped".parse::<OrderStatus>(), Err(OrderError::InvalidStatus));
        assert_eq!("bogus".parse::<OrderStatus>(), Err(OrderError::InvalidStatus));
    }

    #[test]
    fn test_status_moves_backwards() {
        let now = Utc::now();
        let mut order = Order::restore(OrderId::new(), UserId::new(), Money::ZERO, OrderStatus::Delivered, now, now);
        order.set_status(OrderStatus::Processing);
        assert_eq!(order.status(), OrderStatus::Processing);
    }
}

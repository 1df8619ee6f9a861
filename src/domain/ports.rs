//! Storage and collaborator ports.
//!
//! Every coordination guarantee lives behind these traits: one cart per user,
//! atomic cart increments, and an all-or-nothing checkout write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::domain::aggregates::{Cart, CartEntry, Order, OrderDetail, OrderDraft, OrderStatus, Product, UserProfile};
use crate::domain::value_objects::{OrderId, ProductId, Quantity, UserId};
use crate::Result;

/// Read-only product lookup. Deleted products do not resolve.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Resolves the products that still exist; unknown ids are left out.
    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_cart(&self, user: UserId) -> Result<Option<Cart>>;

    /// Creates the cart if needed and increments the entry for `product` in a
    /// single atomic step.
    async fn add_entry(&self, user: UserId, product: ProductId, quantity: Quantity) -> Result<CartEntry>;

    /// `None` when the user has no entry for `product`.
    async fn set_quantity(&self, user: UserId, product: ProductId, quantity: Quantity) -> Result<Option<CartEntry>>;

    /// Returns the removed entry, `None` when there was nothing to remove.
    async fn remove_entry(&self, user: UserId, product: ProductId) -> Result<Option<CartEntry>>;

    /// Drops the given products from a cart still at `expected_version` and
    /// returns the new version. `Conflict` if the cart moved in between.
    async fn prune_entries(&self, user: UserId, products: &[ProductId], expected_version: i64) -> Result<i64>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Writes the order, its details and deletes the owner's cart as one unit.
    /// A cart created afterwards never reuses a version of the deleted one.
    /// Fails with `Conflict` and writes nothing if the cart is no longer at
    /// `cart_version`.
    async fn place_order(&self, draft: OrderDraft, cart_version: i64) -> Result<(Order, Vec<OrderDetail>)>;

    /// Newest first.
    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>>;

    /// Newest first, with the total number of matching orders.
    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<(Vec<Order>, u64)>;

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    async fn order_details(&self, id: OrderId) -> Result<Vec<OrderDetail>>;

    /// Returns the previous status along with the updated order.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<(OrderStatus, Order)>>;

    /// Deletes details then the order. `false` when the order did not exist.
    async fn delete_order(&self, id: OrderId) -> Result<bool>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub user: Option<UserId>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |s| order.status() == s)
            && self.user.map_or(true, |u| order.user() == u)
            && self.start_date.map_or(true, |d| order.created_at() >= d)
            && self.end_date.map_or(true, |d| order.created_at() <= d)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Pages start at one; the limit is clamped to `1..=MAX_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn page(&self) -> u32 { self.page }
    pub fn limit(&self) -> u32 { self.limit }
    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.limit) }
}

impl Default for PageRequest {
    fn default() -> Self { Self::new(None, None) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u32,
}

impl Pagination {
    pub fn new(page: PageRequest, total_items: u64) -> Self {
        Self {
            current_page: page.page(),
            total_pages: total_items.div_ceil(u64::from(page.limit())),
            total_items,
            items_per_page: page.limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        let page = PageRequest::new(Some(0), Some(500));
        assert_eq!((page.page(), page.limit(), page.offset()), (1, 100, 0));
        let page = PageRequest::new(Some(3), None);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_pagination_rounds_up() {
        let p = Pagination::new(PageRequest::new(Some(2), Some(10)), 21);
        assert_eq!(p.total_pages, 3);
        assert_eq!(Pagination::new(PageRequest::default(), 0).total_pages, 0);
    }
}

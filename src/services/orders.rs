//! Order service: checkout and the order lifecycle

use std::collections::HashMap;
use std::sync::Arc;
use crate::domain::aggregates::{CartEntry, Order, OrderDetail, OrderDraft, OrderLine, OrderStatus, Product, OrderWithDetails};
use crate::domain::events::{CartEvent, DomainEvent, OrderEvent};
use crate::domain::ports::{CartRepository, CatalogReader, OrderFilter, OrderRepository, PageRequest, Pagination, UserDirectory};
use crate::domain::value_objects::{OrderId, ProductId, UserId};
use crate::infrastructure::EventSink;
use crate::{Result, StorefrontError};

/// Result of a successful checkout
#[derive(Clone, Debug)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub details: Vec<OrderDetail>,
    /// Cart entries dropped because their product no longer exists
    pub pruned: Vec<CartEntry>,
}

#[derive(Clone)]
pub struct OrderService {
    users: Arc<dyn UserDirectory>,
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogReader>,
    orders: Arc<dyn OrderRepository>,
    events: EventSink,
}

impl OrderService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        carts: Arc<dyn CartRepository>,
        catalog: Arc<dyn CatalogReader>,
        orders: Arc<dyn OrderRepository>,
        events: EventSink,
    ) -> Self {
        Self { users, carts, catalog, orders, events }
    }

    /// Turns the user's cart into an order.
    ///
    /// Entries pointing at products that no longer exist are pruned from the
    /// cart (and kept pruned even if checkout then fails). The order, its
    /// details and the cart deletion are written in one storage transaction.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, user: UserId) -> Result<CheckoutOutcome> {
        let profile = self.users.find_user(user).await?
            .ok_or_else(|| StorefrontError::not_found("User not found"))?;
        if !profile.has_delivery_contact() {
            return Err(StorefrontError::validation("Phone and address are required to place an order"));
        }
        let mut cart = self.carts.find_cart(user).await?
            .filter(|c| !c.is_empty())
            .ok_or_else(|| StorefrontError::validation("Cart is empty"))?;

        let ids: Vec<ProductId> = cart.items().iter().map(|i| i.product).collect();
        let catalog: HashMap<ProductId, Product> = self.catalog.find_products(&ids).await?
            .into_iter().map(|p| (p.id, p)).collect();

        let mut version = cart.version();
        let pruned = cart.retain_products(|p| catalog.contains_key(p));
        if !pruned.is_empty() {
            let gone: Vec<ProductId> = pruned.iter().map(|e| e.product).collect();
            tracing::warn!(%user, pruned = gone.len(), "Pruning cart entries for products no longer in the catalog");
            version = self.carts.prune_entries(user, &gone, version).await?;
            self.events.emit(DomainEvent::Cart(CartEvent::Pruned { user_id: user, products: gone })).await;
        }

        let draft = OrderDraft::price(user, cart.items(), &catalog)?;
        let (order, details) = self.orders.place_order(draft, version).await?;
        tracing::info!(order = %order.id(), %user, total = %order.total_amount(), lines = details.len(), "Order placed");
        self.events.emit(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id(), user_id: user, total: order.total_amount().amount(), line_count: details.len(),
        })).await;

        Ok(CheckoutOutcome { order, details, pruned })
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_orders(&self, user: UserId) -> Result<Vec<Order>> {
        self.orders.orders_for_user(user).await
    }

    pub async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        self.orders.find_order(id).await
    }

    /// Line items of an order. An unknown order has no lines.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_details(&self, id: OrderId) -> Result<Vec<OrderLine>> {
        let details = self.orders.order_details(id).await?;
        self.resolve(&details).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_id(&self, id: OrderId) -> Result<OrderWithDetails> {
        let order = self.orders.find_order(id).await?
            .ok_or_else(|| StorefrontError::not_found("Order not found"))?;
        let order_details = self.get_order_details(id).await?;
        Ok(OrderWithDetails { order, order_details })
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(&self, filter: OrderFilter, page: PageRequest) -> Result<(Vec<Order>, Pagination)> {
        let (orders, total) = self.orders.list_orders(&filter, page).await?;
        Ok((orders, Pagination::new(page, total)))
    }

    /// Assigns any of the four statuses; there is no transition graph.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, status: &str) -> Result<Order> {
        let status: OrderStatus = status.parse()?;
        let (previous, order) = self.orders.update_status(id, status).await?
            .ok_or_else(|| StorefrontError::not_found("Order not found"))?;
        tracing::info!(order = %id, from = %previous, to = %status, "Order status updated");
        self.events.emit(DomainEvent::Order(OrderEvent::StatusChanged { order_id: id, from: previous, to: status })).await;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<()> {
        if !self.orders.delete_order(id).await? {
            return Err(StorefrontError::not_found("Order not found"));
        }
        tracing::info!(order = %id, "Order deleted");
        self.events.emit(DomainEvent::Order(OrderEvent::Deleted { order_id: id })).await;
        Ok(())
    }

    async fn resolve(&self, details: &[OrderDetail]) -> Result<Vec<OrderLine>> {
        let ids: Vec<ProductId> = details.iter().map(OrderDetail::product).collect();
        let catalog: HashMap<ProductId, Product> = self.catalog.find_products(&ids).await?
            .into_iter().map(|p| (p.id, p)).collect();
        Ok(details.iter().map(|d| d.resolve(&catalog)).collect())
    }
}

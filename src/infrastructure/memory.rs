//! In-memory storage backend.
//!
//! Serves development runs without a database and the test suite. A single
//! mutex guards all collections, so every port operation is atomic.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use crate::domain::aggregates::{Cart, CartEntry, Order, OrderDetail, OrderDraft, OrderStatus, Product, UserProfile};
use crate::domain::ports::{CartRepository, CatalogReader, OrderFilter, OrderRepository, PageRequest, UserDirectory};
use crate::domain::value_objects::{OrderId, ProductId, Quantity, UserId};
use crate::infrastructure::CART_CONFLICT;
use crate::{Result, StorefrontError};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    users: HashMap<UserId, UserProfile>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    details: Vec<OrderDetail>,
    /// Last version of each user's checked-out cart
    retired_versions: HashMap<UserId, i64>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

/// Products and users loaded into a fresh in-memory store
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub users: Vec<UserProfile>,
}

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_seed(seed: Seed) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            state.products.extend(seed.products.into_iter().map(|p| (p.id, p)));
            state.users.extend(seed.users.into_iter().map(|u| (u.id, u)));
        }
        store
    }

    pub fn from_seed_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let seed: Seed = serde_json::from_str(&raw)?;
        tracing::info!(products = seed.products.len(), users = seed.users.len(), path = %path.display(), "Loaded in-memory seed");
        Ok(Self::from_seed(seed))
    }

    pub fn insert_product(&self, product: Product) -> Result<()> {
        self.state()?.products.insert(product.id, product);
        Ok(())
    }

    /// Removes a product from the catalog, leaving any cart entries pointing at it.
    pub fn delete_product(&self, id: ProductId) -> Result<()> {
        self.state()?.products.remove(&id);
        Ok(())
    }

    pub fn insert_user(&self, user: UserProfile) -> Result<()> {
        self.state()?.users.insert(user.id, user);
        Ok(())
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| StorefrontError::Internal("in-memory store lock poisoned".into()))
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
}

#[async_trait]
impl CatalogReader for InMemoryStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state()?.products.get(&id).cloned())
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state()?;
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>> {
        Ok(self.state()?.users.get(&id).cloned())
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn find_cart(&self, user: UserId) -> Result<Option<Cart>> {
        Ok(self.state()?.carts.get(&user).cloned())
    }

    async fn add_entry(&self, user: UserId, product: ProductId, quantity: Quantity) -> Result<CartEntry> {
        let mut state = self.state()?;
        let state = &mut *state;
        let retired = state.retired_versions.get(&user).copied().unwrap_or_default();
        let cart = state.carts.entry(user).or_insert_with(|| Cart::succeeding(user, retired));
        Ok(cart.add_item(product, quantity)?)
    }

    async fn set_quantity(&self, user: UserId, product: ProductId, quantity: Quantity) -> Result<Option<CartEntry>> {
        let mut state = self.state()?;
        let Some(cart) = state.carts.get_mut(&user) else { return Ok(None) };
        if cart.entry(product).is_none() { return Ok(None); }
        Ok(cart.set_quantity(product, i64::from(quantity.value()))?)
    }

    async fn remove_entry(&self, user: UserId, product: ProductId) -> Result<Option<CartEntry>> {
        let mut state = self.state()?;
        let Some(cart) = state.carts.get_mut(&user) else { return Ok(None) };
        Ok(cart.remove_item(product).ok())
    }

    async fn prune_entries(&self, user: UserId, products: &[ProductId], expected_version: i64) -> Result<i64> {
        let mut state = self.state()?;
        let cart = state.carts.get_mut(&user)
            .filter(|c| c.version() == expected_version)
            .ok_or_else(|| StorefrontError::Conflict(CART_CONFLICT.into()))?;
        cart.retain_products(|p| !products.contains(p));
        Ok(cart.version())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn place_order(&self, draft: OrderDraft, cart_version: i64) -> Result<(Order, Vec<OrderDetail>)> {
        let mut state = self.state()?;
        let (order, details) = draft.into_parts();
        let current = state.carts.get(&order.user()).map(Cart::version);
        if current != Some(cart_version) {
            return Err(StorefrontError::Conflict(CART_CONFLICT.into()));
        }
        state.carts.remove(&order.user());
        state.retired_versions.insert(order.user(), cart_version);
        state.orders.insert(order.id(), order.clone());
        state.details.extend(details.iter().cloned());
        Ok((order, details))
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.state()?.orders.values().filter(|o| o.user() == user).cloned().collect();
        newest_first(&mut orders);
        Ok(orders)
    }

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<(Vec<Order>, u64)> {
        let mut orders: Vec<Order> = self.state()?.orders.values().filter(|o| filter.matches(o)).cloned().collect();
        newest_first(&mut orders);
        let total = orders.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let page = orders.into_iter().skip(offset).take(page.limit() as usize).collect();
        Ok((page, total))
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state()?.orders.get(&id).cloned())
    }

    async fn order_details(&self, id: OrderId) -> Result<Vec<OrderDetail>> {
        Ok(self.state()?.details.iter().filter(|d| d.order() == id).cloned().collect())
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<(OrderStatus, Order)>> {
        let mut state = self.state()?;
        let Some(order) = state.orders.get_mut(&id) else { return Ok(None) };
        let previous = order.status();
        order.set_status(status);
        Ok(Some((previous, order.clone())))
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let mut state = self.state()?;
        if !state.orders.contains_key(&id) { return Ok(false); }
        state.details.retain(|d| d.order() != id);
        state.orders.remove(&id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::collections::HashMap as Map;

    fn qty(n: i64) -> Quantity { Quantity::new(n).unwrap() }

    #[tokio::test]
    async fn test_place_order_rejects_stale_cart_version() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let product = Product::new("Lamp", Decimal::new(30, 0));
        store.insert_product(product.clone()).unwrap();
        store.add_entry(user, product.id, qty(1)).await.unwrap();
        let cart = store.find_cart(user).await.unwrap().unwrap();

        store.add_entry(user, product.id, qty(1)).await.unwrap();

        let catalog = Map::from([(product.id, product)]);
        let draft = OrderDraft::price(user, cart.items(), &catalog).unwrap();
        let result = store.place_order(draft, cart.version()).await;
        assert!(matches!(result, Err(StorefrontError::Conflict(_))), "expected Conflict, got {result:?}");
        assert!(store.orders_for_user(user).await.unwrap().is_empty());
        assert_eq!(store.find_cart(user).await.unwrap().unwrap().items()[0].quantity.value(), 2);
    }

    #[tokio::test]
    async fn test_list_orders_pages_newest_first() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let product = Product::new("Pen", Decimal::new(2, 0));
        store.insert_product(product.clone()).unwrap();
        let catalog = Map::from([(product.id, product.clone())]);
        let mut placed = vec![];
        for _ in 0..3 {
            let entry = store.add_entry(user, product.id, qty(1)).await.unwrap();
            let version = store.find_cart(user).await.unwrap().unwrap().version();
            let draft = OrderDraft::price(user, &[entry], &catalog).unwrap();
            placed.push(store.place_order(draft, version).await.unwrap().0);
        }

        let (page, total) = store.list_orders(&OrderFilter::default(), PageRequest::new(Some(1), Some(2))).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id(), placed[2].id());

        let filter = OrderFilter { status: Some(OrderStatus::Shipped), ..OrderFilter::default() };
        let (page, total) = store.list_orders(&filter, PageRequest::default()).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_second_checkout_of_same_cart_conflicts_after_refill() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let (p, q) = (Product::new("Plate", Decimal::new(4, 0)), Product::new("Cup", Decimal::new(3, 0)));
        store.insert_product(p.clone()).unwrap();
        store.insert_product(q.clone()).unwrap();
        let catalog = Map::from([(p.id, p.clone()), (q.id, q.clone())]);

        store.add_entry(user, p.id, qty(2)).await.unwrap();
        let priced = store.find_cart(user).await.unwrap().unwrap();
        let first = OrderDraft::price(user, priced.items(), &catalog).unwrap();
        let second = OrderDraft::price(user, priced.items(), &catalog).unwrap();

        store.place_order(first, priced.version()).await.unwrap();
        store.add_entry(user, q.id, qty(1)).await.unwrap();

        let result = store.place_order(second, priced.version()).await;
        assert!(matches!(result, Err(StorefrontError::Conflict(_))), "expected Conflict, got {result:?}");
        assert_eq!(store.orders_for_user(user).await.unwrap().len(), 1);
        let cart = store.find_cart(user).await.unwrap().unwrap();
        assert!(cart.version() > priced.version());
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product, q.id);
    }

    #[tokio::test]
    async fn test_add_entry_rejects_overflowing_sum() {
        let store = InMemoryStore::new();
        let (user, product) = (UserId::new(), ProductId::new());
        store.add_entry(user, product, qty(2_000_000_000)).await.unwrap();
        let result = store.add_entry(user, product, qty(2_000_000_000)).await;
        assert!(matches!(result, Err(StorefrontError::Validation(ref m)) if m == "Quantity is too large"), "got {result:?}");
        let cart = store.find_cart(user).await.unwrap().unwrap();
        assert_eq!(cart.items()[0].quantity.value(), 2_000_000_000);
    }

    #[tokio::test]
    async fn test_demo_seed_file_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/seed.json");
        let store = InMemoryStore::from_seed_file(&path).unwrap();

        let tote: ProductId = "0190a0f0-0000-7000-8000-000000000002".parse::<uuid::Uuid>().unwrap().into();
        let tote = store.find_product(tote).await.unwrap().expect("seeded product");
        assert_eq!(tote.name, "Linen Tote");
        assert_eq!(tote.unit_price().amount(), Decimal::new(5, 0));
        assert_eq!(tote.stock, 12);

        let mug: ProductId = "0190a0f0-0000-7000-8000-000000000001".parse::<uuid::Uuid>().unwrap().into();
        let mug = store.find_product(mug).await.unwrap().expect("seeded product");
        assert_eq!(mug.image_url.as_deref(), Some("https://cdn.example.com/mug.png"));
        assert_eq!(mug.unit_price().amount(), Decimal::new(10, 0));

        let shopper: UserId = "0190a0f0-0000-7000-8000-0000000000a1".parse::<uuid::Uuid>().unwrap().into();
        let shopper = store.find_user(shopper).await.unwrap().expect("seeded user");
        assert!(shopper.has_delivery_contact());
        assert_eq!(shopper.role, crate::domain::aggregates::Role::User);

        let admin: UserId = "0190a0f0-0000-7000-8000-0000000000a2".parse::<uuid::Uuid>().unwrap().into();
        let admin = store.find_user(admin).await.unwrap().expect("seeded user");
        assert_eq!(admin.role, crate::domain::aggregates::Role::Admin);
    }
}

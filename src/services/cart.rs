//! Cart service

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use crate::domain::aggregates::{CartEntry, ProductSummary};
use crate::domain::ports::{CartRepository, CatalogReader};
use crate::domain::value_objects::{ProductId, Quantity, UserId};
use crate::{Result, StorefrontError};

/// Cart entry as returned to clients, with the product resolved for display
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub user: UserId,
    pub product: ProductSummary,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl CartItemView {
    fn new(user: UserId, entry: &CartEntry, product: ProductSummary) -> Self {
        Self { user, product, quantity: entry.quantity.value(), added_at: Some(entry.added_at) }
    }

    /// What an update that removed the entry hands back
    fn removed(user: UserId, product: ProductId) -> Self {
        Self { user, product: ProductSummary::unresolved(product), quantity: 0, added_at: None }
    }
}

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogReader>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, catalog: Arc<dyn CatalogReader>) -> Self {
        Self { carts, catalog }
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, user: UserId, product: ProductId, quantity: i64) -> Result<CartItemView> {
        let quantity = Quantity::new(quantity)?;
        let product = self.catalog.find_product(product).await?
            .ok_or_else(|| StorefrontError::not_found("Product not found"))?;
        let entry = self.carts.add_entry(user, product.id, quantity).await?;
        tracing::debug!(product = %product.id, quantity = entry.quantity.value(), "Cart entry added");
        Ok(CartItemView::new(user, &entry, product.summary()))
    }

    /// Sets an absolute quantity. Anything below one removes the entry.
    #[tracing::instrument(skip(self))]
    pub async fn set_quantity(&self, user: UserId, product: ProductId, quantity: i64) -> Result<CartItemView> {
        if quantity < 1 {
            return match self.carts.remove_entry(user, product).await? {
                Some(_) => Ok(CartItemView::removed(user, product)),
                None => Err(self.missing_entry(user).await),
            };
        }
        let quantity = Quantity::new(quantity)?;
        let Some(entry) = self.carts.set_quantity(user, product, quantity).await? else {
            return Err(self.missing_entry(user).await);
        };
        Ok(CartItemView::new(user, &entry, self.summary(product).await?))
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, user: UserId, product: ProductId) -> Result<CartItemView> {
        let Some(entry) = self.carts.remove_entry(user, product).await? else {
            return Err(self.missing_entry(user).await);
        };
        Ok(CartItemView::new(user, &entry, self.summary(product).await?))
    }

    /// Entries in the order they were added; empty when the user has no cart.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, user: UserId) -> Result<Vec<CartItemView>> {
        let Some(cart) = self.carts.find_cart(user).await? else { return Ok(vec![]) };
        let ids: Vec<ProductId> = cart.items().iter().map(|i| i.product).collect();
        let products: HashMap<_, _> = self.catalog.find_products(&ids).await?.into_iter().map(|p| (p.id, p)).collect();
        Ok(cart.items().iter().map(|entry| {
            let summary = products.get(&entry.product).map(|p| p.summary()).unwrap_or_else(|| ProductSummary::unresolved(entry.product));
            CartItemView::new(user, entry, summary)
        }).collect())
    }

    async fn summary(&self, product: ProductId) -> Result<ProductSummary> {
        Ok(self.catalog.find_product(product).await?
            .map(|p| p.summary())
            .unwrap_or_else(|| ProductSummary::unresolved(product)))
    }

    async fn missing_entry(&self, user: UserId) -> StorefrontError {
        match self.carts.find_cart(user).await {
            Ok(None) => StorefrontError::not_found("Cart is empty"),
            Ok(Some(_)) => StorefrontError::not_found("Cart item not found"),
            Err(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Product;
    use crate::infrastructure::InMemoryStore;
    use rust_decimal::Decimal;

    fn setup() -> (Arc<InMemoryStore>, CartService, Product) {
        let store = Arc::new(InMemoryStore::new());
        let product = Product::new("Kettle", Decimal::new(10, 0));
        store.insert_product(product.clone()).unwrap();
        let service = CartService::new(store.clone(), store.clone());
        (store, service, product)
    }

    #[tokio::test]
    async fn test_add_twice_sums_quantities() {
        let (_, carts, product) = setup();
        let user = UserId::new();
        carts.add_item(user, product.id, 2).await.unwrap();
        let view = carts.add_item(user, product.id, 3).await.unwrap();
        assert_eq!(view.quantity, 5);
        assert_eq!(view.product.name.as_deref(), Some("Kettle"));

        let items = carts.get(user).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let (_, carts, _) = setup();
        let result = carts.add_item(UserId::new(), ProductId::new(), 1).await;
        assert!(matches!(result, Err(StorefrontError::NotFound(ref m)) if m == "Product not found"), "got {result:?}");
    }

    #[tokio::test]
    async fn test_add_rejects_zero_quantity() {
        let (_, carts, product) = setup();
        let result = carts.add_item(UserId::new(), product.id, 0).await;
        assert!(matches!(result, Err(StorefrontError::Validation(_))), "got {result:?}");
    }

    #[tokio::test]
    async fn test_set_quantity_below_one_removes_entry() {
        let (_, carts, product) = setup();
        let user = UserId::new();
        carts.add_item(user, product.id, 4).await.unwrap();

        let view = carts.set_quantity(user, product.id, -1).await.unwrap();
        assert_eq!(view.quantity, 0);
        assert_eq!(view.added_at, None);
        assert!(carts.get(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_replaces() {
        let (_, carts, product) = setup();
        let user = UserId::new();
        carts.add_item(user, product.id, 4).await.unwrap();
        let view = carts.set_quantity(user, product.id, 1).await.unwrap();
        assert_eq!(view.quantity, 1);
    }

    #[tokio::test]
    async fn test_missing_cart_and_missing_entry() {
        let (_, carts, product) = setup();
        let user = UserId::new();
        let result = carts.set_quantity(user, product.id, 2).await;
        assert!(matches!(result, Err(StorefrontError::NotFound(ref m)) if m == "Cart is empty"), "got {result:?}");

        carts.add_item(user, product.id, 1).await.unwrap();
        let result = carts.remove(user, ProductId::new()).await;
        assert!(matches!(result, Err(StorefrontError::NotFound(ref m)) if m == "Cart item not found"), "got {result:?}");
    }

    #[tokio::test]
    async fn test_remove_returns_snapshot() {
        let (_, carts, product) = setup();
        let user = UserId::new();
        carts.add_item(user, product.id, 3).await.unwrap();
        let removed = carts.remove(user, product.id).await.unwrap();
        assert_eq!(removed.quantity, 3);
        assert_eq!(removed.product.id, product.id);
        assert!(carts.get(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_without_cart_is_empty() {
        let (_, carts, _) = setup();
        assert!(carts.get(UserId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_shows_deleted_product_as_bare_id() {
        let (store, carts, product) = setup();
        let user = UserId::new();
        carts.add_item(user, product.id, 1).await.unwrap();
        store.delete_product(product.id).unwrap();
        let items = carts.get(user).await.unwrap();
        assert_eq!(items[0].product, ProductSummary::unresolved(product.id));
    }

    #[tokio::test]
    async fn test_add_rejects_quantities_past_the_limit() {
        let (_, carts, product) = setup();
        let user = UserId::new();
        let result = carts.add_item(user, product.id, 4_000_000_000).await;
        assert!(matches!(result, Err(StorefrontError::Validation(ref m)) if m == "Quantity is too large"), "got {result:?}");

        carts.add_item(user, product.id, 2_000_000_000).await.unwrap();
        let result = carts.add_item(user, product.id, 2_000_000_000).await;
        assert!(matches!(result, Err(StorefrontError::Validation(_))), "got {result:?}");
        assert_eq!(carts.get(user).await.unwrap()[0].quantity, 2_000_000_000);
    }
}

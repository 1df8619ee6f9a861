//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::domain::value_objects::{ProductId, Quantity, QuantityError, UserId};

/// One cart per user. `version` moves on every mutation so checkout can
/// detect a cart that changed under it.
#[derive(Clone, Debug)]
pub struct Cart {
    user: UserId,
    items: Vec<CartEntry>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product: ProductId,
    pub quantity: Quantity,
    pub added_at: DateTime<Utc>,
}

impl Cart {
    pub fn for_user(user: UserId) -> Self { Self::succeeding(user, 0) }

    /// A fresh cart whose versions continue after `version`, the last one
    /// handed out for this user.
    pub fn succeeding(user: UserId, version: i64) -> Self {
        let now = Utc::now();
        Self { user, items: vec![], version, created_at: now, updated_at: now }
    }

    pub fn restore(user: UserId, items: Vec<CartEntry>, version: i64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self { user, items, version, created_at, updated_at }
    }

    pub fn user(&self) -> UserId { self.user }
    pub fn items(&self) -> &[CartEntry] { &self.items }
    pub fn version(&self) -> i64 { self.version }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn entry(&self, product: ProductId) -> Option<&CartEntry> { self.items.iter().find(|i| i.product == product) }

    /// Adds `quantity` to the entry for `product`, appending a new entry if needed.
    /// A sum past `Quantity::MAX` leaves the cart untouched.
    pub fn add_item(&mut self, product: ProductId, quantity: Quantity) -> Result<CartEntry, CartError> {
        let entry = match self.items.iter_mut().find(|i| i.product == product) {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(quantity).map_err(CartError::InvalidQuantity)?;
                existing.clone()
            }
            None => {
                let entry = CartEntry { product, quantity, added_at: Utc::now() };
                self.items.push(entry.clone());
                entry
            }
        };
        self.touch();
        Ok(entry)
    }

    /// Replaces the quantity of an entry. Anything below one removes it, in
    /// which case `None` is returned.
    pub fn set_quantity(&mut self, product: ProductId, quantity: i64) -> Result<Option<CartEntry>, CartError> {
        if quantity < 1 {
            self.remove_item(product)?;
            return Ok(None);
        }
        let quantity = Quantity::new(quantity).map_err(CartError::InvalidQuantity)?;
        let item = self.items.iter_mut().find(|i| i.product == product).ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        let updated = item.clone();
        self.touch();
        Ok(Some(updated))
    }

    pub fn remove_item(&mut self, product: ProductId) -> Result<CartEntry, CartError> {
        let index = self.items.iter().position(|i| i.product == product).ok_or(CartError::ItemNotFound)?;
        let removed = self.items.remove(index);
        self.touch();
        Ok(removed)
    }

    /// Drops entries whose product fails `keep`, returning what was dropped.
    pub fn retain_products(&mut self, keep: impl Fn(&ProductId) -> bool) -> Vec<CartEntry> {
        let (kept, dropped): (Vec<_>, Vec<_>) = self.items.drain(..).partition(|i| keep(&i.product));
        self.items = kept;
        if !dropped.is_empty() { self.touch(); }
        dropped
    }

    fn touch(&mut self) { self.version += 1; self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity(QuantityError) }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::ItemNotFound => write!(f, "Cart item not found"), Self::InvalidQuantity(e) => write!(f, "{e}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Quantity { Quantity::new(n).unwrap() }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::for_user(UserId::new());
        let p1 = ProductId::new();
        cart.add_item(p1, qty(2)).unwrap();
        let merged = cart.add_item(p1, qty(3)).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(merged.quantity.value(), 5);
        assert_eq!(cart.version(), 2);
    }

    #[test]
    fn test_set_quantity_replaces_or_removes() {
        let mut cart = Cart::for_user(UserId::new());
        let p1 = ProductId::new();
        cart.add_item(p1, qty(2)).unwrap();
        let updated = cart.set_quantity(p1, 9).unwrap().unwrap();
        assert_eq!(updated.quantity.value(), 9);
        assert_eq!(cart.set_quantity(p1, 0).unwrap(), None);
        assert!(cart.is_empty());
        assert_eq!(cart.set_quantity(p1, 1), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_retain_products_reports_dropped() {
        let mut cart = Cart::for_user(UserId::new());
        let (keep, gone) = (ProductId::new(), ProductId::new());
        cart.add_item(keep, qty(1)).unwrap();
        cart.add_item(gone, qty(4)).unwrap();
        let dropped = cart.retain_products(|p| *p == keep);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].product, gone);
        assert_eq!(cart.items().len(), 1);
        assert!(cart.entry(keep).is_some());
    }

    #[test]
    fn test_add_past_max_keeps_entry() {
        let mut cart = Cart::for_user(UserId::new());
        let p1 = ProductId::new();
        cart.add_item(p1, qty(2_000_000_000)).unwrap();
        let version = cart.version();
        let result = cart.add_item(p1, qty(2_000_000_000));
        assert_eq!(result, Err(CartError::InvalidQuantity(QuantityError::TooLarge)));
        assert_eq!(cart.entry(p1).unwrap().quantity.value(), 2_000_000_000);
        assert_eq!(cart.version(), version);
    }

    #[test]
    fn test_succeeding_cart_continues_versions() {
        let user = UserId::new();
        let mut cart = Cart::succeeding(user, 7);
        assert!(cart.is_empty());
        cart.add_item(ProductId::new(), qty(1)).unwrap();
        assert_eq!(cart.version(), 8);
    }
}

//! Product, as seen by the storefront through the catalog reader

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
}

/// Display fields resolved for cart entries and order lines
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: ProductId::new(), name: name.into(), price: Some(price), sale_price: None,
            stock: 0, category_id: None, image_url: None,
        }
    }

    pub fn with_sale_price(mut self, sale_price: Decimal) -> Self { self.sale_price = Some(sale_price); self }
    pub fn with_stock(mut self, stock: i32) -> Self { self.stock = stock; self }

    pub fn list_price(&self) -> Money { self.price.map(Money::new).unwrap_or(Money::ZERO) }

    /// Price charged per unit: the sale price when it is set and undercuts the
    /// list price, otherwise the list price. Missing prices count as zero.
    pub fn unit_price(&self) -> Money {
        let list = self.list_price();
        match self.sale_price.map(Money::new) {
            Some(sale) if !sale.is_zero() && (sale < list || list.is_zero()) => sale,
            _ => list,
        }
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id, name: Some(self.name.clone()), price: Some(self.list_price()),
            image_url: self.image_url.clone(),
        }
    }
}

impl ProductSummary {
    /// Placeholder for a product the catalog no longer resolves
    pub fn unresolved(id: ProductId) -> Self { Self { id, name: None, price: None, image_url: None } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_price_prefers_lower_sale_price() {
        let p = Product::new("Mug", Decimal::new(8, 0)).with_sale_price(Decimal::new(5, 0));
        assert_eq!(p.unit_price().amount(), Decimal::new(5, 0));
    }

    #[test]
    fn test_unit_price_ignores_invalid_sale_price() {
        let p = Product::new("Mug", Decimal::new(8, 0)).with_sale_price(Decimal::new(9, 0));
        assert_eq!(p.unit_price().amount(), Decimal::new(8, 0));
        let p = Product::new("Mug", Decimal::new(8, 0)).with_sale_price(Decimal::ZERO);
        assert_eq!(p.unit_price().amount(), Decimal::new(8, 0));
    }

    #[test]
    fn test_unit_price_defaults_to_zero() {
        let mut p = Product::new("Sample", Decimal::ZERO);
        p.price = None;
        assert!(p.unit_price().is_zero());
        p.price = Some(Decimal::new(-4, 0));
        assert!(p.unit_price().is_zero());
    }
}

//! Postgres storage backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use crate::domain::aggregates::{Cart, CartEntry, Order, OrderDetail, OrderDraft, OrderStatus, Product, Role, UnknownRole, UserProfile};
use crate::domain::ports::{CartRepository, CatalogReader, OrderFilter, OrderRepository, PageRequest, UserDirectory};
use crate::domain::value_objects::{Money, OrderId, ProductId, Quantity, QuantityError, UserId};
use crate::infrastructure::CART_CONFLICT;
use crate::{Result, StorefrontError};

const PRODUCT_COLUMNS: &str = "id, name, price, sale_price, stock, category_id, image_url";
const ORDER_COLUMNS: &str = "id, user_id, total_amount, status, created_at, updated_at";
const ORDER_FILTER: &str = "($1::text IS NULL OR status = $1) AND ($2::uuid IS NULL OR user_id = $2) \
    AND ($3::timestamptz IS NULL OR created_at >= $3) AND ($4::timestamptz IS NULL OR created_at <= $4)";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow { id: Uuid, name: String, price: Option<Decimal>, sale_price: Option<Decimal>, stock: i32, category_id: Option<Uuid>, image_url: Option<String> }

#[derive(Debug, sqlx::FromRow)]
struct UserRow { id: Uuid, name: String, email: String, phone: Option<String>, address: Option<String>, role: String }

#[derive(Debug, sqlx::FromRow)]
struct CartRow { version: i64, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow { product_id: Uuid, quantity: i32, added_at: DateTime<Utc> }

#[derive(Debug, sqlx::FromRow)]
struct OrderRow { id: Uuid, user_id: Uuid, total_amount: Decimal, status: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

#[derive(Debug, sqlx::FromRow)]
struct StatusChangeRow { #[sqlx(flatten)] order: OrderRow, previous_status: String }

#[derive(Debug, sqlx::FromRow)]
struct OrderDetailRow { id: Uuid, order_id: Uuid, product_id: Uuid, quantity: i32, price_each: Decimal }

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StorefrontError {
    StorefrontError::Internal(format!("corrupt {what} row: {detail}"))
}

fn quantity(value: i32) -> Result<Quantity> {
    Quantity::new(i64::from(value)).map_err(|e| corrupt("quantity", e))
}

fn status(value: &str) -> Result<OrderStatus> {
    value.parse().map_err(|e| corrupt("order status", e))
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product { id: r.id.into(), name: r.name, price: r.price, sale_price: r.sale_price, stock: r.stock, category_id: r.category_id, image_url: r.image_url }
    }
}

impl TryFrom<UserRow> for UserProfile {
    type Error = StorefrontError;
    fn try_from(r: UserRow) -> Result<Self> {
        let role: Role = r.role.parse().map_err(|e: UnknownRole| corrupt("user", e))?;
        Ok(UserProfile { id: r.id.into(), name: r.name, email: r.email, phone: r.phone, address: r.address, role })
    }
}

impl TryFrom<CartItemRow> for CartEntry {
    type Error = StorefrontError;
    fn try_from(r: CartItemRow) -> Result<Self> {
        Ok(CartEntry { product: r.product_id.into(), quantity: quantity(r.quantity)?, added_at: r.added_at })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StorefrontError;
    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order::restore(r.id.into(), r.user_id.into(), Money::new(r.total_amount), status(&r.status)?, r.created_at, r.updated_at))
    }
}

impl TryFrom<OrderDetailRow> for OrderDetail {
    type Error = StorefrontError;
    fn try_from(r: OrderDetailRow) -> Result<Self> {
        Ok(OrderDetail::restore(r.id.into(), r.order_id.into(), r.product_id.into(), quantity(r.quantity)?, Money::new(r.price_each)))
    }
}

fn orders_from(rows: Vec<OrderRow>) -> Result<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl CatalogReader for PgStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND status <> 'deleted'"))
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    async fn find_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) AND status <> 'deleted'"))
            .bind(ids).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user(&self, id: UserId) -> Result<Option<UserProfile>> {
        sqlx::query_as::<_, UserRow>("SELECT id, name, email, phone, address, role FROM users WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?
            .map(UserProfile::try_from).transpose()
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn find_cart(&self, user: UserId) -> Result<Option<Cart>> {
        let mut tx = self.pool.begin().await?;
        let Some(cart) = sqlx::query_as::<_, CartRow>("SELECT version, created_at, updated_at FROM carts WHERE user_id = $1")
            .bind(user).fetch_optional(&mut *tx).await? else { return Ok(None) };
        let items = sqlx::query_as::<_, CartItemRow>("SELECT product_id, quantity, added_at FROM cart_items WHERE user_id = $1 ORDER BY position")
            .bind(user).fetch_all(&mut *tx).await?
            .into_iter().map(CartEntry::try_from).collect::<Result<Vec<_>>>()?;
        tx.commit().await?;
        Ok(Some(Cart::restore(user, items, cart.version, cart.created_at, cart.updated_at)))
    }

    async fn add_entry(&self, user: UserId, product: ProductId, quantity: Quantity) -> Result<CartEntry> {
        let mut tx = self.pool.begin().await?;
        // Locks the cart row, serialising concurrent adds for the same user.
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO UPDATE SET version = nextval('cart_versions'), updated_at = NOW()")
            .bind(user).execute(&mut *tx).await?;
        // The guard skips the update instead of overflowing the INTEGER column.
        let row = sqlx::query_as::<_, CartItemRow>(
            "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
             WHERE cart_items.quantity <= $4 - EXCLUDED.quantity \
             RETURNING product_id, quantity, added_at")
            .bind(user).bind(product).bind(i32::from(quantity)).bind(Quantity::MAX as i32)
            .fetch_optional(&mut *tx).await?;
        let Some(row) = row else { return Err(QuantityError::TooLarge.into()) };
        tx.commit().await?;
        row.try_into()
    }

    async fn set_quantity(&self, user: UserId, product: ProductId, quantity: Quantity) -> Result<Option<CartEntry>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, CartItemRow>(
            "UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2 RETURNING product_id, quantity, added_at")
            .bind(user).bind(product).bind(i32::from(quantity))
            .fetch_optional(&mut *tx).await?;
        if row.is_some() { bump_version(&mut tx, user).await?; }
        tx.commit().await?;
        row.map(CartEntry::try_from).transpose()
    }

    async fn remove_entry(&self, user: UserId, product: ProductId) -> Result<Option<CartEntry>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, CartItemRow>(
            "DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2 RETURNING product_id, quantity, added_at")
            .bind(user).bind(product)
            .fetch_optional(&mut *tx).await?;
        if row.is_some() { bump_version(&mut tx, user).await?; }
        tx.commit().await?;
        row.map(CartEntry::try_from).transpose()
    }

    async fn prune_entries(&self, user: UserId, products: &[ProductId], expected_version: i64) -> Result<i64> {
        let ids: Vec<Uuid> = products.iter().map(ProductId::as_uuid).collect();
        let mut tx = self.pool.begin().await?;
        let version: Option<i64> = sqlx::query_scalar(
            "UPDATE carts SET version = nextval('cart_versions'), updated_at = NOW() WHERE user_id = $1 AND version = $2 RETURNING version")
            .bind(user).bind(expected_version)
            .fetch_optional(&mut *tx).await?;
        let Some(version) = version else { return Err(StorefrontError::Conflict(CART_CONFLICT.into())) };
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
            .bind(user).bind(ids).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(version)
    }
}

async fn bump_version(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, user: UserId) -> Result<()> {
    sqlx::query("UPDATE carts SET version = nextval('cart_versions'), updated_at = NOW() WHERE user_id = $1")
        .bind(user).execute(&mut **tx).await?;
    Ok(())
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn place_order(&self, draft: OrderDraft, cart_version: i64) -> Result<(Order, Vec<OrderDetail>)> {
        let (order, details) = draft.into_parts();
        let mut tx = self.pool.begin().await?;

        // Consume the cart first; a moved version means it was priced stale.
        // Versions come from one sequence, so a recreated cart never matches.
        let consumed = sqlx::query("DELETE FROM carts WHERE user_id = $1 AND version = $2")
            .bind(order.user()).bind(cart_version)
            .execute(&mut *tx).await?.rows_affected();
        if consumed == 0 {
            return Err(StorefrontError::Conflict(CART_CONFLICT.into()));
        }

        sqlx::query("INSERT INTO orders (id, user_id, total_amount, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(order.id()).bind(order.user()).bind(order.total_amount().amount()).bind(order.status().as_str())
            .bind(order.created_at()).bind(order.updated_at())
            .execute(&mut *tx).await?;

        let ids: Vec<Uuid> = details.iter().map(|d| d.id().as_uuid()).collect();
        let order_ids: Vec<Uuid> = details.iter().map(|d| d.order().as_uuid()).collect();
        let products: Vec<Uuid> = details.iter().map(|d| d.product().as_uuid()).collect();
        let quantities: Vec<i32> = details.iter().map(|d| i32::from(d.quantity())).collect();
        let prices: Vec<Decimal> = details.iter().map(|d| d.price_each().amount()).collect();
        sqlx::query(
            "INSERT INTO order_details (id, order_id, product_id, quantity, price_each) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[], $4::int4[], $5::numeric[])")
            .bind(ids).bind(order_ids).bind(products).bind(quantities).bind(prices)
            .execute(&mut *tx).await?;

        tx.commit().await?;
        Ok((order, details))
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"))
            .bind(user).fetch_all(&self.pool).await?;
        orders_from(rows)
    }

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<(Vec<Order>, u64)> {
        let status = filter.status.map(|s| s.as_str());
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {ORDER_FILTER} ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"))
            .bind(status).bind(filter.user).bind(filter.start_date).bind(filter.end_date)
            .bind(i64::from(page.limit())).bind(offset)
            .fetch_all(&self.pool).await?;
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {ORDER_FILTER}"))
            .bind(status).bind(filter.user).bind(filter.start_date).bind(filter.end_date)
            .fetch_one(&self.pool).await?;
        Ok((orders_from(rows)?, u64::try_from(total).unwrap_or_default()))
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn order_details(&self, id: OrderId) -> Result<Vec<OrderDetail>> {
        sqlx::query_as::<_, OrderDetailRow>("SELECT id, order_id, product_id, quantity, price_each FROM order_details WHERE order_id = $1 ORDER BY id")
            .bind(id).fetch_all(&self.pool).await?
            .into_iter().map(OrderDetail::try_from).collect()
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Option<(OrderStatus, Order)>> {
        let row = sqlx::query_as::<_, StatusChangeRow>(
            "UPDATE orders o SET status = $2, updated_at = NOW() \
             FROM (SELECT id, status FROM orders WHERE id = $1 FOR UPDATE) previous \
             WHERE o.id = previous.id \
             RETURNING o.id, o.user_id, o.total_amount, o.status, o.created_at, o.updated_at, previous.status AS previous_status")
            .bind(id).bind(status.as_str())
            .fetch_optional(&self.pool).await?;
        let Some(row) = row else { return Ok(None) };
        let previous = self::status(&row.previous_status)?;
        Ok(Some((previous, row.order.try_into()?)))
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id).fetch_optional(&mut *tx).await?;
        if exists.is_none() { return Ok(false); }
        sqlx::query("DELETE FROM order_details WHERE order_id = $1").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(true)
    }
}

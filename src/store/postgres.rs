//! PostgreSQL store

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::aggregates::{
    Category, Component, ComponentKind, CustomerInfo, Order, OrderAddress, OrderItem, OrderStatus, Product, Rate, Review,
};
use crate::domain::value_objects::{Quantity, Rating};
use crate::store::{Store, Transaction};
use crate::{EcommerceError, Result};

/// SQLSTATE `numeric_value_out_of_range`, raised when a stock counter overflows.
const OUT_OF_RANGE: &str = "22003";

/// Constraint violations and out-of-range counters become [`EcommerceError::Integrity`];
/// anything else is passed through.
pub(crate) fn map_db_error(err: sqlx::Error) -> EcommerceError {
    if let sqlx::Error::Database(db) = &err {
        let out_of_range = db.code().is_some_and(|code| code == OUT_OF_RANGE);
        if db.is_foreign_key_violation() || db.is_check_violation() || db.is_unique_violation() || out_of_range {
            return EcommerceError::Integrity(db.message().to_string());
        }
    }
    EcommerceError::Database(err)
}

fn corrupt(what: &str, value: impl std::fmt::Display) -> EcommerceError {
    EcommerceError::Integrity(format!("stored {what} is invalid: {value}"))
}

#[derive(Debug, FromRow)]
struct ComponentRow { id: Uuid, kind: String, name: String, description: Option<String>, cost: Decimal, stock: i32, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

impl TryFrom<ComponentRow> for Component {
    type Error = EcommerceError;
    fn try_from(r: ComponentRow) -> Result<Self> {
        let kind = ComponentKind::parse(&r.kind).ok_or_else(|| corrupt("component kind", &r.kind))?;
        Ok(Component { id: r.id, kind, name: r.name, description: r.description, cost: r.cost, stock: r.stock, created_at: r.created_at, updated_at: r.updated_at })
    }
}

#[derive(Debug, FromRow)]
struct ProductRow { id: Uuid, name: String, description: Option<String>, price: Decimal, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

#[derive(Debug, FromRow)]
struct CategoryRow { id: Uuid, name: String, parent_id: Option<Uuid>, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self { Category { id: r.id, name: r.name, parent_id: r.parent_id, created_at: r.created_at, updated_at: r.updated_at } }
}

#[derive(Debug, FromRow)]
struct ReviewRow { id: Uuid, user_id: Uuid, product_id: Uuid, text: Option<String>, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self { Review { id: r.id, user_id: r.user_id, product_id: r.product_id, text: r.text, created_at: r.created_at, updated_at: r.updated_at } }
}

#[derive(Debug, FromRow)]
struct RateRow { id: Uuid, user_id: Uuid, product_id: Uuid, value: i16 }

impl TryFrom<RateRow> for Rate {
    type Error = EcommerceError;
    fn try_from(r: RateRow) -> Result<Self> {
        let value = u8::try_from(r.value).ok().and_then(|v| Rating::new(v).ok()).ok_or_else(|| corrupt("rating", r.value))?;
        Ok(Rate { id: r.id, user_id: r.user_id, product_id: r.product_id, value })
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid, status: String, support_id: Option<Uuid>,
    customer: Option<Json<CustomerInfo>>, address: Option<Json<OrderAddress>>,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = EcommerceError;
    fn try_from(r: OrderRow) -> Result<Self> {
        let status = OrderStatus::from_code(r.status.trim()).ok_or_else(|| corrupt("order status", &r.status))?;
        Ok(Order {
            id: r.id, status, support_id: r.support_id,
            customer: r.customer.map(|j| j.0), address: r.address.map(|j| j.0),
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow { id: Uuid, order_id: Uuid, product_id: Option<Uuid>, quantity: i32, unit_price: Decimal, unit_cost: Decimal, created_at: DateTime<Utc>, updated_at: DateTime<Utc> }

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = EcommerceError;
    fn try_from(r: OrderItemRow) -> Result<Self> {
        let quantity = u32::try_from(r.quantity).ok().and_then(|q| Quantity::new(q).ok()).ok_or_else(|| corrupt("quantity", r.quantity))?;
        Ok(OrderItem {
            id: r.id, order_id: r.order_id, product_id: r.product_id, quantity,
            unit_price: r.unit_price, unit_cost: r.unit_cost, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

pub struct PgTx { tx: sqlx::Transaction<'static, Postgres> }

impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(PgTx { tx })
    }
}

impl PgTx {
    async fn write_product_links(&mut self, product: &Product) -> Result<()> {
        sqlx::query("DELETE FROM product_components WHERE product_id = $1")
            .bind(product.id).execute(&mut *self.tx).await.map_err(map_db_error)?;
        sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
            .bind(product.id).execute(&mut *self.tx).await.map_err(map_db_error)?;
        for (position, component_id) in product.component_ids().enumerate() {
            sqlx::query("INSERT INTO product_components (product_id, component_id, position) VALUES ($1, $2, $3)")
                .bind(product.id).bind(component_id).bind(position as i32)
                .execute(&mut *self.tx).await.map_err(map_db_error)?;
        }
        for category_id in &product.category_ids {
            sqlx::query("INSERT INTO product_categories (product_id, category_id) VALUES ($1, $2)")
                .bind(product.id).bind(category_id)
                .execute(&mut *self.tx).await.map_err(map_db_error)?;
        }
        Ok(())
    }
}

impl Transaction for PgTx {
    async fn component(&mut self, id: Uuid) -> Result<Option<Component>> {
        sqlx::query_as::<_, ComponentRow>("SELECT * FROM components WHERE id = $1")
            .bind(id).fetch_optional(&mut *self.tx).await.map_err(map_db_error)?
            .map(Component::try_from).transpose()
    }

    async fn insert_component(&mut self, c: &Component) -> Result<()> {
        sqlx::query("INSERT INTO components (id, kind, name, description, cost, stock, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
            .bind(c.id).bind(c.kind.as_str()).bind(&c.name).bind(&c.description).bind(c.cost).bind(c.stock).bind(c.created_at).bind(c.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        Ok(())
    }

    async fn update_component(&mut self, c: &Component) -> Result<()> {
        let done = sqlx::query("UPDATE components SET name = $2, description = $3, cost = $4, stock = $5, updated_at = $6 WHERE id = $1")
            .bind(c.id).bind(&c.name).bind(&c.description).bind(c.cost).bind(c.stock).bind(c.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        if done.rows_affected() == 0 { return Err(EcommerceError::ComponentNotFound(c.id)); }
        Ok(())
    }

    async fn delete_component(&mut self, id: Uuid) -> Result<()> {
        let done = sqlx::query("DELETE FROM components WHERE id = $1")
            .bind(id).execute(&mut *self.tx).await.map_err(map_db_error)?;
        if done.rows_affected() == 0 { return Err(EcommerceError::ComponentNotFound(id)); }
        Ok(())
    }

    async fn adjust_component_stock(&mut self, id: Uuid, delta: i32) -> Result<i32> {
        sqlx::query_scalar::<_, i32>("UPDATE components SET stock = stock + $2, updated_at = NOW() WHERE id = $1 RETURNING stock")
            .bind(id).bind(delta).fetch_optional(&mut *self.tx).await.map_err(map_db_error)?
            .ok_or(EcommerceError::ComponentNotFound(id))
    }

    async fn product(&mut self, id: Uuid) -> Result<Option<Product>> {
        let Some(row) = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id).fetch_optional(&mut *self.tx).await.map_err(map_db_error)? else { return Ok(None) };
        let links: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT c.id, c.kind FROM product_components pc JOIN components c ON c.id = pc.component_id WHERE pc.product_id = $1 ORDER BY pc.position",
        )
        .bind(id).fetch_all(&mut *self.tx).await.map_err(map_db_error)?;
        let category_ids: Vec<Uuid> = sqlx::query_scalar("SELECT category_id FROM product_categories WHERE product_id = $1")
            .bind(id).fetch_all(&mut *self.tx).await.map_err(map_db_error)?;
        let mut product = Product {
            id: row.id, name: row.name, description: row.description, price: row.price,
            category_ids, plant_ids: vec![], accessory_ids: vec![],
            created_at: row.created_at, updated_at: row.updated_at,
        };
        for (component_id, kind) in links {
            match ComponentKind::parse(&kind).ok_or_else(|| corrupt("component kind", &kind))? {
                ComponentKind::Plant => product.plant_ids.push(component_id),
                ComponentKind::Accessory => product.accessory_ids.push(component_id),
            }
        }
        Ok(Some(product))
    }

    async fn components_of(&mut self, product_id: Uuid) -> Result<Vec<Component>> {
        sqlx::query_as::<_, ComponentRow>(
            "SELECT c.* FROM product_components pc JOIN components c ON c.id = pc.component_id WHERE pc.product_id = $1 ORDER BY (c.kind = 'plant'), pc.position",
        )
        .bind(product_id).fetch_all(&mut *self.tx).await.map_err(map_db_error)?
        .into_iter().map(Component::try_from).collect()
    }

    async fn insert_product(&mut self, p: &Product) -> Result<()> {
        sqlx::query("INSERT INTO products (id, name, description, price, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(p.id).bind(&p.name).bind(&p.description).bind(p.price).bind(p.created_at).bind(p.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        self.write_product_links(p).await
    }

    async fn update_product(&mut self, p: &Product) -> Result<()> {
        let done = sqlx::query("UPDATE products SET name = $2, description = $3, price = $4, updated_at = $5 WHERE id = $1")
            .bind(p.id).bind(&p.name).bind(&p.description).bind(p.price).bind(p.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        if done.rows_affected() == 0 { return Err(EcommerceError::ProductNotFound(p.id)); }
        self.write_product_links(p).await
    }

    async fn delete_product(&mut self, id: Uuid) -> Result<()> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id).execute(&mut *self.tx).await.map_err(map_db_error)?;
        if done.rows_affected() == 0 { return Err(EcommerceError::ProductNotFound(id)); }
        Ok(())
    }

    async fn category(&mut self, id: Uuid) -> Result<Option<Category>> {
        Ok(sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1")
            .bind(id).fetch_optional(&mut *self.tx).await.map_err(map_db_error)?.map(Category::from))
    }

    async fn categories(&mut self) -> Result<Vec<Category>> {
        Ok(sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&mut *self.tx).await.map_err(map_db_error)?
            .into_iter().map(Category::from).collect())
    }

    async fn insert_category(&mut self, c: &Category) -> Result<()> {
        sqlx::query("INSERT INTO categories (id, name, parent_id, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(c.id).bind(&c.name).bind(c.parent_id).bind(c.created_at).bind(c.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        Ok(())
    }

    async fn delete_category(&mut self, id: Uuid) -> Result<()> {
        let done = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id).execute(&mut *self.tx).await.map_err(map_db_error)?;
        if done.rows_affected() == 0 { return Err(EcommerceError::CategoryNotFound(id)); }
        Ok(())
    }

    async fn insert_review(&mut self, r: &Review) -> Result<()> {
        sqlx::query("INSERT INTO reviews (id, user_id, product_id, text, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(r.id).bind(r.user_id).bind(r.product_id).bind(&r.text).bind(r.created_at).bind(r.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        Ok(())
    }

    async fn reviews_for(&mut self, product_id: Uuid) -> Result<Vec<Review>> {
        Ok(sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(product_id).fetch_all(&mut *self.tx).await.map_err(map_db_error)?
            .into_iter().map(Review::from).collect())
    }

    async fn insert_rate(&mut self, r: &Rate) -> Result<()> {
        sqlx::query("INSERT INTO rates (id, user_id, product_id, value) VALUES ($1, $2, $3, $4)")
            .bind(r.id).bind(r.user_id).bind(r.product_id).bind(i16::from(r.value.value()))
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        Ok(())
    }

    async fn rates_for(&mut self, product_id: Uuid) -> Result<Vec<Rate>> {
        sqlx::query_as::<_, RateRow>("SELECT * FROM rates WHERE product_id = $1")
            .bind(product_id).fetch_all(&mut *self.tx).await.map_err(map_db_error)?
            .into_iter().map(Rate::try_from).collect()
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id).fetch_optional(&mut *self.tx).await.map_err(map_db_error)?
            .map(Order::try_from).transpose()
    }

    async fn insert_order(&mut self, o: &Order) -> Result<()> {
        sqlx::query("INSERT INTO orders (id, status, support_id, customer, address, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(o.id).bind(o.status.code()).bind(o.support_id)
            .bind(o.customer.as_ref().map(Json)).bind(o.address.as_ref().map(Json))
            .bind(o.created_at).bind(o.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        Ok(())
    }

    async fn update_order(&mut self, o: &Order) -> Result<()> {
        let done = sqlx::query("UPDATE orders SET status = $2, support_id = $3, customer = $4, address = $5, updated_at = $6 WHERE id = $1")
            .bind(o.id).bind(o.status.code()).bind(o.support_id)
            .bind(o.customer.as_ref().map(Json)).bind(o.address.as_ref().map(Json)).bind(o.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        if done.rows_affected() == 0 { return Err(EcommerceError::OrderNotFound(o.id)); }
        Ok(())
    }

    async fn delete_order(&mut self, id: Uuid) -> Result<()> {
        let done = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id).execute(&mut *self.tx).await.map_err(map_db_error)?;
        if done.rows_affected() == 0 { return Err(EcommerceError::OrderNotFound(id)); }
        Ok(())
    }

    async fn order_item(&mut self, id: Uuid) -> Result<Option<OrderItem>> {
        sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE id = $1")
            .bind(id).fetch_optional(&mut *self.tx).await.map_err(map_db_error)?
            .map(OrderItem::try_from).transpose()
    }

    async fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at, id")
            .bind(order_id).fetch_all(&mut *self.tx).await.map_err(map_db_error)?
            .into_iter().map(OrderItem::try_from).collect()
    }

    async fn insert_order_item(&mut self, i: &OrderItem) -> Result<()> {
        sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, unit_cost, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)")
            .bind(i.id).bind(i.order_id).bind(i.product_id).bind(i.quantity.as_delta())
            .bind(i.unit_price).bind(i.unit_cost).bind(i.created_at).bind(i.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        Ok(())
    }

    async fn update_order_item(&mut self, i: &OrderItem) -> Result<()> {
        let done = sqlx::query("UPDATE order_items SET product_id = $2, quantity = $3, updated_at = $4 WHERE id = $1")
            .bind(i.id).bind(i.product_id).bind(i.quantity.as_delta()).bind(i.updated_at)
            .execute(&mut *self.tx).await.map_err(map_db_error)?;
        if done.rows_affected() == 0 { return Err(EcommerceError::OrderItemNotFound(i.id)); }
        Ok(())
    }

    async fn delete_order_item(&mut self, id: Uuid) -> Result<()> {
        let done = sqlx::query("DELETE FROM order_items WHERE id = $1")
            .bind(id).execute(&mut *self.tx).await.map_err(map_db_error)?;
        if done.rows_affected() == 0 { return Err(EcommerceError::OrderItemNotFound(id)); }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(map_db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::fmt;

    use sqlx::error::{DatabaseError, ErrorKind};

    #[derive(Debug)]
    struct PgFailure { code: &'static str, foreign_key: bool }

    impl fmt::Display for PgFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "pg failure {}", self.code) }
    }

    impl std::error::Error for PgFailure {}

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str { "violates constraint" }
        fn code(&self) -> Option<Cow<'_, str>> { Some(Cow::Borrowed(self.code)) }
        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) { self }
        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) { self }
        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> { self }
        fn kind(&self) -> ErrorKind {
            if self.foreign_key { ErrorKind::ForeignKeyViolation } else { ErrorKind::Other }
        }
    }

    fn db_error(code: &'static str, foreign_key: bool) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgFailure { code, foreign_key }))
    }

    fn order_row(status: &str) -> OrderRow {
        OrderRow {
            id: Uuid::now_v7(), status: status.to_string(), support_id: None,
            customer: None, address: None, created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    fn item_row(quantity: i32) -> OrderItemRow {
        OrderItemRow {
            id: Uuid::now_v7(), order_id: Uuid::now_v7(), product_id: None, quantity,
            unit_price: Decimal::new(90, 0), unit_cost: Decimal::new(55, 0), created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    fn rate_row(value: i16) -> RateRow {
        RateRow { id: Uuid::now_v7(), user_id: Uuid::now_v7(), product_id: Uuid::now_v7(), value }
    }

    #[test]
    fn test_map_db_error() {
        assert!(matches!(map_db_error(db_error("23503", true)), EcommerceError::Integrity(_)));
        assert!(matches!(map_db_error(db_error("22003", false)), EcommerceError::Integrity(_)));
        assert!(matches!(map_db_error(db_error("40001", false)), EcommerceError::Database(_)));
        assert!(matches!(map_db_error(sqlx::Error::RowNotFound), EcommerceError::Database(_)));
    }

    #[test]
    fn test_order_status_is_trimmed() {
        assert_eq!(Order::try_from(order_row("P")).unwrap().status, OrderStatus::PaymentCompleted);
        assert_eq!(Order::try_from(order_row("S ")).unwrap().status, OrderStatus::Submitted);
        assert!(matches!(Order::try_from(order_row("X")), Err(EcommerceError::Integrity(_))));
        assert!(matches!(Order::try_from(order_row("")), Err(EcommerceError::Integrity(_))));
    }

    #[test]
    fn test_order_with_json_customer() {
        let mut row = order_row("C");
        row.customer = Some(Json(CustomerInfo { name: "Sara".into(), phone_number: "0912".into(), email: None }));
        let order = Order::try_from(row).unwrap();
        assert_eq!(order.customer.map(|c| c.name), Some("Sara".to_string()));
    }

    #[test]
    fn test_corrupt_item_quantity() {
        assert_eq!(OrderItem::try_from(item_row(4)).unwrap().quantity.value(), 4);
        assert!(matches!(OrderItem::try_from(item_row(0)), Err(EcommerceError::Integrity(_))));
        assert!(matches!(OrderItem::try_from(item_row(-3)), Err(EcommerceError::Integrity(_))));
    }

    #[test]
    fn test_corrupt_rating() {
        assert_eq!(Rate::try_from(rate_row(5)).unwrap().value.value(), 5);
        assert!(matches!(Rate::try_from(rate_row(9)), Err(EcommerceError::Integrity(_))));
        assert!(matches!(Rate::try_from(rate_row(-1)), Err(EcommerceError::Integrity(_))));
    }

    #[test]
    fn test_corrupt_component_kind() {
        let row = ComponentRow {
            id: Uuid::now_v7(), kind: "shrub".into(), name: "Boxwood".into(), description: None,
            cost: Decimal::ONE, stock: 3, created_at: Utc::now(), updated_at: Utc::now(),
        };
        assert!(matches!(Component::try_from(row), Err(EcommerceError::Integrity(_))));
    }
}

//! Postgres implementation of MarketStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    CartItem, CartLine, CartLinePatch, Order, OrderItem, OrderPatch, OrderStatus, PaymentStatus,
    Product, ProductStatus, UserSummary,
};
use crate::ports::{
    MarketStore, OrderFilter, OrderPage, RepositoryError, RepositoryResult, StoreTransaction,
};

/// Product snapshot columns. Expects `products p` and `LEFT JOIN users u` on the owner.
/// A soft-deleted product reads as inactive.
const PRODUCT_COLUMNS: &str = r#"
    p.id, p.user_id, p.name, p.price, p.status,
    (p.is_active AND p.deleted_at IS NULL) AS is_active,
    p.image_url, p.created_at, p.updated_at,
    u.username AS seller_username, u.full_name AS seller_full_name
"#;

const CART_COLUMNS: &str = r#"
    c.id AS line_id, c.user_id AS line_user_id, c.product_id AS line_product_id, c.quantity,
    c.created_at AS line_created_at, c.updated_at AS line_updated_at
"#;

const ORDER_COLUMNS: &str = r#"
    o.id, o.user_id, o.total_amount, o.status, o.payment_method, o.payment_status,
    o.shipping_address, o.notes, o.created_at, o.updated_at,
    u.username AS customer_username, u.full_name AS customer_full_name
"#;

const ITEM_COLUMNS: &str = r#"
    i.id AS item_id, i.order_id, i.product_id AS item_product_id, i.quantity,
    i.price AS item_price, i.subtotal, i.created_at AS item_created_at
"#;

/// Postgres-backed marketplace store.
#[derive(Clone)]
pub struct PostgresMarketStore {
    pool: PgPool,
}

impl PostgresMarketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketStore for PostgresMarketStore {
    async fn begin(&self) -> RepositoryResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresStoreTransaction { tx }))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PostgresStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresStoreTransaction {
    async fn load_items(&mut self, order_ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, Vec<OrderItem>>> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}, {PRODUCT_COLUMNS}
            FROM order_items i
            JOIN products p ON p.id = i.product_id
            LEFT JOIN users u ON u.id = p.user_id
            WHERE i.order_id = ANY($1) AND i.deleted_at IS NULL
            ORDER BY i.created_at, i.id
            "#
        );
        let rows = sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(order_ids)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let item = row.into_domain()?;
            by_order.entry(item.order_id).or_default().push(item);
        }
        Ok(by_order)
    }
}

#[async_trait]
impl StoreTransaction for PostgresStoreTransaction {
    async fn cart_lines(&mut self, user_id: Uuid) -> RepositoryResult<Vec<CartItem>> {
        let sql = format!(
            r#"
            SELECT {CART_COLUMNS}, {PRODUCT_COLUMNS}
            FROM carts c
            JOIN products p ON p.id = c.product_id
            LEFT JOIN users u ON u.id = p.user_id
            WHERE c.user_id = $1
            ORDER BY c.created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(CartItemRow::into_domain).collect()
    }

    async fn lock_cart_lines(&mut self, user_id: Uuid) -> RepositoryResult<Vec<CartItem>> {
        // Lock in product id order so overlapping checkouts queue instead of deadlocking.
        let sql = format!(
            r#"
            SELECT {CART_COLUMNS}, {PRODUCT_COLUMNS}
            FROM carts c
            JOIN products p ON p.id = c.product_id
            LEFT JOIN users u ON u.id = p.user_id
            WHERE c.user_id = $1
            ORDER BY p.id
            FOR UPDATE OF c, p
            "#
        );
        let rows = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut items = rows
            .into_iter()
            .map(CartItemRow::into_domain)
            .collect::<RepositoryResult<Vec<_>>>()?;
        items.sort_by_key(|item| (item.line.created_at, item.line.id));
        Ok(items)
    }

    async fn add_to_cart(&mut self, line: &CartLine) -> RepositoryResult<CartLine> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r#"
            INSERT INTO carts (id, user_id, product_id, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = carts.quantity + EXCLUDED.quantity, updated_at = NOW()
            RETURNING id, user_id, product_id, quantity, created_at, updated_at
            "#,
        )
        .bind(line.id)
        .bind(line.user_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.created_at)
        .bind(line.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into_domain())
    }

    async fn update_cart_line(
        &mut self,
        line_id: Uuid,
        user_id: Uuid,
        patch: &CartLinePatch,
    ) -> RepositoryResult<u64> {
        let result = sqlx::query(
            "UPDATE carts SET quantity = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(line_id)
        .bind(user_id)
        .bind(patch.quantity)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_cart_line(&mut self, line_id: Uuid, user_id: Uuid) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1 AND user_id = $2")
            .bind(line_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn clear_cart(&mut self, user_id: Uuid) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_product(&mut self, product_id: Uuid) -> RepositoryResult<Option<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            LEFT JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            FOR UPDATE OF p
            "#
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(ProductRow::into_domain).transpose()
    }

    async fn set_product_status(
        &mut self,
        product_id: Uuid,
        status: ProductStatus,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE products SET status = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(product_id)
        .bind(status.as_str())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("product {}", product_id)));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, total_amount, status, payment_method, payment_status,
                shipping_address, notes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(&order.total_amount)
        .bind(order.status.as_str())
        .bind(&order.payment_method)
        .bind(order.payment_status.as_str())
        .bind(&order.shipping_address)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, quantity, price, subtotal, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(&item.price)
            .bind(&item.subtotal)
            .bind(item.created_at)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn find_order(
        &mut self,
        order_id: Uuid,
        owner_id: Uuid,
    ) -> RepositoryResult<Option<Order>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            WHERE o.id = $1 AND o.user_id = $2 AND o.deleted_at IS NULL
            FOR UPDATE OF o
            "#
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .bind(owner_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut items = self.load_items(&[order_id]).await?;
        let mut order = row.into_domain()?;
        order.items = items.remove(&order.id).unwrap_or_default();
        Ok(Some(order))
    }

    async fn list_orders(
        &mut self,
        owner_id: Uuid,
        filter: &OrderFilter,
    ) -> RepositoryResult<OrderPage> {
        let status = filter.status.map(|status| status.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE user_id = $1 AND deleted_at IS NULL AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(owner_id)
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await?;

        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            WHERE o.user_id = $1 AND o.deleted_at IS NULL AND ($2::text IS NULL OR o.status = $2)
            ORDER BY o.created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(owner_id)
            .bind(status)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&mut *self.tx)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut items = self.load_items(&ids).await?;

        let orders = rows
            .into_iter()
            .map(|row| {
                let mut order = row.into_domain()?;
                order.items = items.remove(&order.id).unwrap_or_default();
                Ok(order)
            })
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok(OrderPage { orders, total })
    }

    async fn update_order(
        &mut self,
        order_id: Uuid,
        owner_id: Uuid,
        patch: &OrderPatch,
    ) -> RepositoryResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = COALESCE($3, status),
                payment_status = COALESCE($4, payment_status),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(order_id)
        .bind(owner_id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.payment_status.map(|s| s.as_str()))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// Internal row types for SQLx. Not exposed outside the adapter.

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    price: BigDecimal,
    status: String,
    is_active: bool,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    seller_username: Option<String>,
    seller_full_name: Option<String>,
}

impl ProductRow {
    fn into_domain(self) -> RepositoryResult<Product> {
        let status = self.status.parse::<ProductStatus>().map_err(|status| {
            RepositoryError::Corrupt(format!("product {} has status {:?}", self.id, status))
        })?;
        let seller = self.seller_username.map(|username| UserSummary {
            id: self.user_id,
            username,
            full_name: self.seller_full_name,
        });

        Ok(Product {
            id: self.id,
            owner_id: self.user_id,
            name: self.name,
            price: self.price,
            status,
            is_active: self.is_active,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
            seller,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartLineRow {
    fn into_domain(self) -> CartLine {
        CartLine {
            id: self.id,
            user_id: self.user_id,
            product_id: self.product_id,
            quantity: self.quantity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    line_id: Uuid,
    line_user_id: Uuid,
    line_product_id: Uuid,
    quantity: i32,
    line_created_at: DateTime<Utc>,
    line_updated_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl CartItemRow {
    fn into_domain(self) -> RepositoryResult<CartItem> {
        Ok(CartItem {
            line: CartLine {
                id: self.line_id,
                user_id: self.line_user_id,
                product_id: self.line_product_id,
                quantity: self.quantity,
                created_at: self.line_created_at,
                updated_at: self.line_updated_at,
            },
            product: self.product.into_domain()?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    total_amount: BigDecimal,
    status: String,
    payment_method: Option<String>,
    payment_status: String,
    shipping_address: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_username: Option<String>,
    customer_full_name: Option<String>,
}

impl OrderRow {
    fn into_domain(self) -> RepositoryResult<Order> {
        let status = self.status.parse::<OrderStatus>().map_err(|_| {
            RepositoryError::Corrupt(format!("order {} has status {:?}", self.id, self.status))
        })?;
        let payment_status = self.payment_status.parse::<PaymentStatus>().map_err(|_| {
            RepositoryError::Corrupt(format!(
                "order {} has payment status {:?}",
                self.id, self.payment_status
            ))
        })?;
        let customer = self.customer_username.map(|username| UserSummary {
            id: self.user_id,
            username,
            full_name: self.customer_full_name,
        });

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            total_amount: self.total_amount,
            status,
            payment_method: self.payment_method.unwrap_or_default(),
            payment_status,
            shipping_address: self.shipping_address.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            items: Vec::new(),
            customer,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    item_id: Uuid,
    order_id: Uuid,
    item_product_id: Uuid,
    quantity: i32,
    item_price: BigDecimal,
    subtotal: BigDecimal,
    item_created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl OrderItemRow {
    fn into_domain(self) -> RepositoryResult<OrderItem> {
        Ok(OrderItem {
            id: self.item_id,
            order_id: self.order_id,
            product_id: self.item_product_id,
            quantity: self.quantity,
            price: self.item_price,
            subtotal: self.subtotal,
            created_at: self.item_created_at,
            product: Some(self.product.into_domain()?),
        })
    }
}

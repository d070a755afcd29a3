//! Storage and notification seams.
//!
//! The workflows only see these traits; `adapters` provides the Postgres
//! implementation and an in-memory one for tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    CartItem, CartLine, CartLinePatch, Order, OrderPatch, OrderStatus, Product, ProductStatus,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Listing filter for a user's orders.
#[derive(Debug, Clone, Copy)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
}

/// Entry point to the relational store. Every read and write goes through a
/// transaction so multi-entity workflows share one atomic unit.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn begin(&self) -> RepositoryResult<Box<dyn StoreTransaction>>;

    async fn ping(&self) -> RepositoryResult<()>;
}

/// A unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait StoreTransaction: Send {
    /// The user's cart, newest line first.
    async fn cart_lines(&mut self, user_id: Uuid) -> RepositoryResult<Vec<CartItem>>;

    /// The user's cart in insertion order, with the cart and product rows
    /// locked until the transaction ends.
    async fn lock_cart_lines(&mut self, user_id: Uuid) -> RepositoryResult<Vec<CartItem>>;

    /// Inserts the line, or adds its quantity to the existing line for the
    /// same (user, product). Returns the stored line.
    async fn add_to_cart(&mut self, line: &CartLine) -> RepositoryResult<CartLine>;

    async fn update_cart_line(
        &mut self,
        line_id: Uuid,
        user_id: Uuid,
        patch: &CartLinePatch,
    ) -> RepositoryResult<u64>;

    async fn delete_cart_line(&mut self, line_id: Uuid, user_id: Uuid) -> RepositoryResult<u64>;

    async fn clear_cart(&mut self, user_id: Uuid) -> RepositoryResult<u64>;

    /// Reads a product and locks its row.
    async fn find_product(&mut self, product_id: Uuid) -> RepositoryResult<Option<Product>>;

    /// Fails with `NotFound` when the product does not exist.
    async fn set_product_status(
        &mut self,
        product_id: Uuid,
        status: ProductStatus,
    ) -> RepositoryResult<()>;

    /// Inserts the order row and all of its items.
    async fn insert_order(&mut self, order: &Order) -> RepositoryResult<()>;

    /// Reads an order owned by `owner_id` with its items, and locks the order row.
    async fn find_order(&mut self, order_id: Uuid, owner_id: Uuid)
        -> RepositoryResult<Option<Order>>;

    async fn list_orders(
        &mut self,
        owner_id: Uuid,
        filter: &OrderFilter,
    ) -> RepositoryResult<OrderPage>;

    /// Returns the number of orders touched (0 or 1).
    async fn update_order(
        &mut self,
        order_id: Uuid,
        owner_id: Uuid,
        patch: &OrderPatch,
    ) -> RepositoryResult<u64>;

    async fn commit(self: Box<Self>) -> RepositoryResult<()>;

    async fn rollback(self: Box<Self>) -> RepositoryResult<()>;
}

/// Receives user-facing events. Delivery is best effort.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        kind: &str,
    ) -> anyhow::Result<()>;
}

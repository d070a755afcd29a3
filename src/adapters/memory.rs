//! In-memory adapters.
//!
//! A transaction holds the store mutex for its whole lifetime and works on a
//! private copy of the state, which is published on commit. That gives the
//! same first-committer-wins behaviour as row locks in Postgres.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::{
    CartItem, CartLine, CartLinePatch, Order, OrderPatch, Product, ProductStatus, UserSummary,
};
use crate::ports::{
    MarketStore, NotificationSink, OrderFilter, OrderPage, RepositoryError, RepositoryResult,
    StoreTransaction,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, UserSummary>,
    products: HashMap<Uuid, Product>,
    // insertion order doubles as creation order
    cart: Vec<CartLine>,
    orders: Vec<Order>,
}

impl MemoryState {
    fn product(&self, product_id: Uuid) -> Option<Product> {
        self.products.get(&product_id).map(|product| {
            let mut product = product.clone();
            product.seller = self.users.get(&product.owner_id).cloned();
            product
        })
    }

    fn cart_item(&self, line: &CartLine) -> RepositoryResult<CartItem> {
        let product = self.product(line.product_id).ok_or_else(|| {
            RepositoryError::Corrupt(format!(
                "cart line {} references missing product {}",
                line.id, line.product_id
            ))
        })?;
        Ok(CartItem {
            line: line.clone(),
            product,
        })
    }

    fn hydrate(&self, order: &Order) -> Order {
        let mut order = order.clone();
        order.customer = self.users.get(&order.user_id).cloned();
        for item in order.items.iter_mut() {
            item.product = self.product(item.product_id);
        }
        order
    }
}

#[derive(Clone, Default)]
pub struct MemoryMarketStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryMarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserSummary) {
        self.state.lock().await.users.insert(user.id, user);
    }

    pub async fn insert_product(&self, mut product: Product) {
        product.seller = None;
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn product(&self, product_id: Uuid) -> Option<Product> {
        self.state.lock().await.product(product_id)
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn cart_len(&self, user_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .cart
            .iter()
            .filter(|line| line.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl MarketStore for MemoryMarketStore {
    async fn begin(&self) -> RepositoryResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn cart_lines(&mut self, user_id: Uuid) -> RepositoryResult<Vec<CartItem>> {
        self.working
            .cart
            .iter()
            .rev()
            .filter(|line| line.user_id == user_id)
            .map(|line| self.working.cart_item(line))
            .collect()
    }

    async fn lock_cart_lines(&mut self, user_id: Uuid) -> RepositoryResult<Vec<CartItem>> {
        self.working
            .cart
            .iter()
            .filter(|line| line.user_id == user_id)
            .map(|line| self.working.cart_item(line))
            .collect()
    }

    async fn add_to_cart(&mut self, line: &CartLine) -> RepositoryResult<CartLine> {
        if let Some(existing) = self
            .working
            .cart
            .iter_mut()
            .find(|l| l.user_id == line.user_id && l.product_id == line.product_id)
        {
            existing.quantity = existing
                .quantity
                .checked_add(line.quantity)
                .ok_or_else(|| {
                    RepositoryError::Corrupt(format!("cart line {} quantity overflow", existing.id))
                })?;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        self.working.cart.push(line.clone());
        Ok(line.clone())
    }

    async fn update_cart_line(
        &mut self,
        line_id: Uuid,
        user_id: Uuid,
        patch: &CartLinePatch,
    ) -> RepositoryResult<u64> {
        match self
            .working
            .cart
            .iter_mut()
            .find(|l| l.id == line_id && l.user_id == user_id)
        {
            Some(line) => {
                line.quantity = patch.quantity;
                line.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_cart_line(&mut self, line_id: Uuid, user_id: Uuid) -> RepositoryResult<u64> {
        let before = self.working.cart.len();
        self.working
            .cart
            .retain(|l| !(l.id == line_id && l.user_id == user_id));
        Ok((before - self.working.cart.len()) as u64)
    }

    async fn clear_cart(&mut self, user_id: Uuid) -> RepositoryResult<u64> {
        let before = self.working.cart.len();
        self.working.cart.retain(|l| l.user_id != user_id);
        Ok((before - self.working.cart.len()) as u64)
    }

    async fn find_product(&mut self, product_id: Uuid) -> RepositoryResult<Option<Product>> {
        Ok(self.working.product(product_id))
    }

    async fn set_product_status(
        &mut self,
        product_id: Uuid,
        status: ProductStatus,
    ) -> RepositoryResult<()> {
        let product = self
            .working
            .products
            .get_mut(&product_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("product {}", product_id)))?;
        product.status = status;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> RepositoryResult<()> {
        let mut stored = order.clone();
        stored.customer = None;
        for item in stored.items.iter_mut() {
            item.product = None;
        }
        self.working.orders.push(stored);
        Ok(())
    }

    async fn find_order(
        &mut self,
        order_id: Uuid,
        owner_id: Uuid,
    ) -> RepositoryResult<Option<Order>> {
        Ok(self
            .working
            .orders
            .iter()
            .find(|o| o.id == order_id && o.user_id == owner_id)
            .map(|o| self.working.hydrate(o)))
    }

    async fn list_orders(
        &mut self,
        owner_id: Uuid,
        filter: &OrderFilter,
    ) -> RepositoryResult<OrderPage> {
        let matching: Vec<&Order> = self
            .working
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == owner_id)
            .filter(|o| filter.status.map_or(true, |status| o.status == status))
            .collect();

        let total = matching.len() as i64;
        let orders = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(|o| self.working.hydrate(o))
            .collect();

        Ok(OrderPage { orders, total })
    }

    async fn update_order(
        &mut self,
        order_id: Uuid,
        owner_id: Uuid,
        patch: &OrderPatch,
    ) -> RepositoryResult<u64> {
        match self
            .working
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.user_id == owner_id)
        {
            Some(order) => {
                if let Some(status) = patch.status {
                    order.status = status;
                }
                if let Some(payment_status) = patch.payment_status {
                    order.payment_status = payment_status;
                }
                order.updated_at = Utc::now();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
}

/// Records notifications in memory. A failing sink rejects every delivery.
#[derive(Clone, Default)]
pub struct MemoryNotificationSink {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    failing: bool,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationSink {
    async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        kind: &str,
    ) -> anyhow::Result<()> {
        if self.failing {
            anyhow::bail!("notification sink unavailable");
        }

        self.sent.lock().await.push(SentNotification {
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            kind: kind.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::BigDecimal;

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = MemoryMarketStore::new();
        let product = Product::new(Uuid::new_v4(), "wheels", BigDecimal::from(40));
        let product_id = product.id;
        store.insert_product(product).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.set_product_status(product_id, ProductStatus::Sold)
                .await
                .unwrap();
        }

        let stored = store.product(product_id).await.unwrap();
        assert_eq!(stored.status, ProductStatus::Available);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryMarketStore::new();
        let product = Product::new(Uuid::new_v4(), "trucks", BigDecimal::from(60));
        let product_id = product.id;
        store.insert_product(product).await;

        let mut tx = store.begin().await.unwrap();
        tx.set_product_status(product_id, ProductStatus::Reserved)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let stored = store.product(product_id).await.unwrap();
        assert_eq!(stored.status, ProductStatus::Reserved);
    }

    #[tokio::test]
    async fn test_add_to_cart_merges_same_product() {
        let store = MemoryMarketStore::new();
        let user_id = Uuid::new_v4();
        let product = Product::new(Uuid::new_v4(), "bearings", BigDecimal::from(15));
        let product_id = product.id;
        store.insert_product(product).await;

        let mut tx = store.begin().await.unwrap();
        tx.add_to_cart(&CartLine::new(user_id, product_id, 1))
            .await
            .unwrap();
        let merged = tx
            .add_to_cart(&CartLine::new(user_id, product_id, 2))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(merged.quantity, 3);
        assert_eq!(store.cart_len(user_id).await, 1);
    }

    #[tokio::test]
    async fn test_add_to_cart_overflow_is_an_error() {
        let store = MemoryMarketStore::new();
        let user_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        tx.add_to_cart(&CartLine::new(user_id, product_id, i32::MAX))
            .await
            .unwrap();
        let err = tx
            .add_to_cart(&CartLine::new(user_id, product_id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_set_status_of_missing_product_is_not_found() {
        let store = MemoryMarketStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .set_product_status(Uuid::new_v4(), ProductStatus::Sold)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_sink_returns_error() {
        let sink = MemoryNotificationSink::failing();
        assert!(sink.notify(Uuid::new_v4(), "t", "m", "order").await.is_err());
        assert!(sink.sent().await.is_empty());
    }
}

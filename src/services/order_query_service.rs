use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{DomainError, Order, OrderStatus};
use crate::ports::{MarketStore, OrderFilter, OrderPage};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Read side of orders: listing and detail.
#[derive(Clone)]
pub struct OrderQueryService {
    store: Arc<dyn MarketStore>,
}

impl OrderQueryService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// Lists the user's orders, newest first, with the total matching count.
    pub async fn list(
        &self,
        user_id: Uuid,
        status: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<OrderPage, DomainError> {
        let status = status
            .filter(|s| !s.is_empty())
            .map(str::parse::<OrderStatus>)
            .transpose()?;
        let filter = OrderFilter {
            status,
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
        };

        let mut tx = self.store.begin().await?;
        let page = tx.list_orders(user_id, &filter).await?;
        tx.commit().await?;
        Ok(page)
    }

    pub async fn get(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;
        let order = tx.find_order(order_id, user_id).await?;
        tx.commit().await?;
        order.ok_or_else(|| DomainError::NotFound(format!("order {}", order_id)))
    }
}

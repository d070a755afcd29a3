use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{DomainError, Order, OrderPatch, OrderStatus};
use crate::ports::MarketStore;
use crate::use_cases::abandon;

/// Sets an order's fulfilment status. Any status may follow any other.
pub struct UpdateOrderStatus {
    store: Arc<dyn MarketStore>,
}

impl UpdateOrderStatus {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        order_id: Uuid,
        owner_id: Uuid,
        status: &str,
    ) -> Result<Order, DomainError> {
        let status: OrderStatus = status.parse()?;
        let mut tx = self.store.begin().await?;

        let patch = OrderPatch {
            status: Some(status),
            ..OrderPatch::default()
        };
        if tx.update_order(order_id, owner_id, &patch).await? == 0 {
            abandon(tx).await;
            return Err(DomainError::NotFound(format!("order {}", order_id)));
        }

        let order = tx
            .find_order(order_id, owner_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("order {}", order_id)))?;
        tx.commit().await?;

        tracing::info!(order_id = %order_id, status = %status, "Order status updated");
        Ok(order)
    }
}

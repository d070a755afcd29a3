//! Payment reconciliation.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{DomainError, Order, OrderPatch, OrderStatus, PaymentStatus, ProductStatus};
use crate::ports::{MarketStore, NotificationSink};
use crate::use_cases::{abandon, notify_best_effort};

/// Applies a payment status to an order.
///
/// A `paid` update also confirms the order and marks every product on it as
/// sold, in the same transaction. Repeating it rewrites the same values.
pub struct ReconcilePayment {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl ReconcilePayment {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, notifier }
    }

    pub async fn execute(
        &self,
        order_id: Uuid,
        owner_id: Uuid,
        payment_status: &str,
    ) -> Result<Order, DomainError> {
        let payment_status: PaymentStatus = payment_status.parse()?;
        let mut tx = self.store.begin().await?;

        let Some(order) = tx.find_order(order_id, owner_id).await? else {
            abandon(tx).await;
            return Err(DomainError::NotFound(format!("order {}", order_id)));
        };

        let paid = payment_status == PaymentStatus::Paid;
        let patch = OrderPatch {
            payment_status: Some(payment_status),
            status: paid.then_some(OrderStatus::Confirmed),
        };
        tx.update_order(order_id, owner_id, &patch).await?;

        if paid {
            for product_id in order.product_ids() {
                tx.set_product_status(product_id, ProductStatus::Sold).await?;
            }
        }

        let updated = tx
            .find_order(order_id, owner_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("order {}", order_id)))?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            payment_status = %payment_status,
            status = %updated.status,
            "Payment status applied"
        );

        if paid && order.payment_status != PaymentStatus::Paid {
            notify_best_effort(
                self.notifier.as_ref(),
                owner_id,
                "Payment confirmed",
                &format!("Payment for order {} was received.", order_id),
                "payment",
            )
            .await;
        }

        Ok(updated)
    }
}

//! Checkout: turns a user's cart into a pending order.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Checkout, DomainError, Order, ProductStatus};
use crate::ports::{MarketStore, NotificationSink};
use crate::use_cases::{abandon, notify_best_effort};

/// Input for the PlaceOrder use case.
#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    pub user_id: Uuid,
    pub payment_method: String,
    pub shipping_address: String,
    pub notes: String,
}

/// Use case for checking out a cart.
///
/// The cart and product rows are locked, validated, priced and turned into an
/// order with its items; the products are reserved and the cart emptied. All
/// of it commits together or not at all.
pub struct PlaceOrder {
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl PlaceOrder {
    pub fn new(store: Arc<dyn MarketStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, notifier }
    }

    pub async fn execute(&self, input: PlaceOrderInput) -> Result<Order, DomainError> {
        let user_id = input.user_id;
        let mut tx = self.store.begin().await?;

        let cart = tx.lock_cart_lines(user_id).await?;
        let checkout = Checkout {
            user_id,
            payment_method: input.payment_method,
            shipping_address: input.shipping_address,
            notes: input.notes,
        };

        let order = match Order::from_cart(checkout, &cart) {
            Ok(order) => order,
            Err(e) => {
                tracing::info!(user_id = %user_id, reason = %e, "Checkout rejected");
                abandon(tx).await;
                return Err(e);
            }
        };

        tx.insert_order(&order).await?;
        for product_id in order.product_ids() {
            tx.set_product_status(product_id, ProductStatus::Reserved)
                .await?;
        }
        tx.clear_cart(user_id).await?;

        let placed = tx
            .find_order(order.id, user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("order {}", order.id)))?;

        tx.commit().await?;

        tracing::info!(
            order_id = %placed.id,
            user_id = %user_id,
            items = placed.items.len(),
            total_amount = %placed.total_amount,
            "Order placed"
        );

        notify_best_effort(
            self.notifier.as_ref(),
            user_id,
            "Order placed",
            &format!(
                "Your order {} for {} is waiting for payment.",
                placed.id, placed.total_amount
            ),
            "order",
        )
        .await;

        Ok(placed)
    }
}

//! Order workflows. Each one runs inside a single store transaction.

pub mod place_order;
pub mod reconcile_payment;
pub mod update_order_status;

pub use place_order::{PlaceOrder, PlaceOrderInput};
pub use reconcile_payment::ReconcilePayment;
pub use update_order_status::UpdateOrderStatus;

use uuid::Uuid;

use crate::ports::{NotificationSink, StoreTransaction};

/// Delivers a notification without letting a failure reach the caller.
pub(crate) async fn notify_best_effort(
    sink: &dyn NotificationSink,
    user_id: Uuid,
    title: &str,
    message: &str,
    kind: &str,
) {
    if let Err(e) = sink.notify(user_id, title, message, kind).await {
        tracing::warn!(user_id = %user_id, kind, error = %e, "Failed to deliver notification");
    }
}

/// Rolls back after a rejected workflow. The rejection is what the caller
/// sees, so a failed rollback is only logged.
pub(crate) async fn abandon(tx: Box<dyn StoreTransaction>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Rollback failed");
    }
}

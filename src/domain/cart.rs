use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use super::product::Product;

/// One pending-purchase record. At most one line exists per (user, product).
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    pub fn new(user_id: Uuid, product_id: Uuid, quantity: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The only mutable field of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLinePatch {
    pub quantity: i32,
}

/// A cart line with the product snapshot it points at.
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub line: CartLine,
    pub product: Product,
}

impl CartItem {
    pub fn subtotal(&self) -> BigDecimal {
        &self.product.price * BigDecimal::from(self.line.quantity)
    }
}

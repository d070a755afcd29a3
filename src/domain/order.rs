//! Order aggregate.
//!
//! An order is created once from a cart snapshot and afterwards only its
//! `status` and `payment_status` change. Item prices are frozen at checkout.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::BigDecimal;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::cart::CartItem;
use super::error::DomainError;
use super::product::{Product, UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Expired,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Expired,
        PaymentStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::InvalidStatus(s.to_string()))
    }
}

/// Buyer-supplied checkout details.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub user_id: Uuid,
    pub payment_method: String,
    pub shipping_address: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: BigDecimal,
    pub subtotal: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: BigDecimal,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub shipping_address: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub customer: Option<UserSummary>,
}

impl Order {
    /// Builds a pending order from a cart snapshot.
    ///
    /// Every line is checked before anything is priced, so a single
    /// unavailable product rejects the whole cart.
    pub fn from_cart(checkout: Checkout, cart: &[CartItem]) -> Result<Self, DomainError> {
        if cart.is_empty() {
            return Err(DomainError::EmptyCart);
        }

        if let Some(item) = cart.iter().find(|item| !item.product.is_purchasable()) {
            return Err(DomainError::ProductUnavailable(item.product.id.to_string()));
        }

        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let items: Vec<OrderItem> = cart
            .iter()
            .map(|item| {
                let price = item.product.price.with_scale(2);
                let subtotal = &price * BigDecimal::from(item.line.quantity);
                OrderItem {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: item.product.id,
                    quantity: item.line.quantity,
                    price,
                    subtotal,
                    created_at: now,
                    product: Some(item.product.clone()),
                }
            })
            .collect();

        let total_amount = items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + &item.subtotal)
            .with_scale(2);

        Ok(Self {
            id: order_id,
            user_id: checkout.user_id,
            total_amount,
            status: OrderStatus::Pending,
            payment_method: checkout.payment_method,
            payment_status: PaymentStatus::Pending,
            shipping_address: checkout.shipping_address,
            notes: checkout.notes,
            created_at: now,
            updated_at: now,
            items,
            customer: None,
        })
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        self.items.iter().map(|item| item.product_id).collect()
    }
}

/// The mutable fields of an order. `None` leaves the column untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

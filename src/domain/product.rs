use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::BigDecimal;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Inventory state of a listing. Stock is a single unit, so the status flag
/// doubles as the reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Available,
    Reserved,
    Sold,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Reserved => "reserved",
            ProductStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ProductStatus::Available),
            "reserved" => Ok(ProductStatus::Reserved),
            "sold" => Ok(ProductStatus::Sold),
            other => Err(other.to_string()),
        }
    }
}

/// Display details of a user, joined onto products (seller) and orders (buyer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub status: ProductStatus,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub seller: Option<UserSummary>,
}

impl Product {
    pub fn new(owner_id: Uuid, name: impl Into<String>, price: BigDecimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            price: price.with_scale(2),
            status: ProductStatus::Available,
            is_active: true,
            image_url: None,
            created_at: now,
            updated_at: now,
            seller: None,
        }
    }

    /// Only active, available listings may enter a cart or an order.
    pub fn is_purchasable(&self) -> bool {
        self.is_active && self.status == ProductStatus::Available
    }
}

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{CartItem, CartLine, CartLinePatch, DomainError};
use crate::ports::MarketStore;
use crate::use_cases::abandon;

/// Cart mutations, always scoped to the requesting user.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn MarketStore>,
}

impl CartService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<CartItem>, DomainError> {
        let mut tx = self.store.begin().await?;
        let items = tx.cart_lines(user_id).await?;
        tx.commit().await?;
        Ok(items)
    }

    /// Adds `quantity` of a product, merging into an existing line for it.
    pub async fn add(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItem, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity(quantity));
        }

        let mut tx = self.store.begin().await?;
        let Some(product) = tx.find_product(product_id).await? else {
            abandon(tx).await;
            return Err(DomainError::NotFound(format!("product {}", product_id)));
        };
        if !product.is_purchasable() {
            abandon(tx).await;
            return Err(DomainError::ProductUnavailable(product_id.to_string()));
        }

        // The merged line must still fit the quantity column.
        let existing = tx
            .cart_lines(user_id)
            .await?
            .into_iter()
            .find(|item| item.line.product_id == product_id)
            .map_or(0, |item| item.line.quantity);
        if existing.checked_add(quantity).is_none() {
            abandon(tx).await;
            return Err(DomainError::InvalidQuantity(quantity));
        }

        let line = tx
            .add_to_cart(&CartLine::new(user_id, product_id, quantity))
            .await?;
        tx.commit().await?;

        tracing::debug!(
            user_id = %user_id,
            product_id = %product_id,
            quantity = line.quantity,
            "Cart line stored"
        );
        Ok(CartItem { line, product })
    }

    pub async fn update_quantity(
        &self,
        line_id: Uuid,
        user_id: Uuid,
        quantity: i32,
    ) -> Result<(), DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvalidQuantity(quantity));
        }

        let mut tx = self.store.begin().await?;
        let updated = tx
            .update_cart_line(line_id, user_id, &CartLinePatch { quantity })
            .await?;
        if updated == 0 {
            abandon(tx).await;
            return Err(DomainError::NotFound(format!("cart item {}", line_id)));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn remove(&self, line_id: Uuid, user_id: Uuid) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;
        if tx.delete_cart_line(line_id, user_id).await? == 0 {
            abandon(tx).await;
            return Err(DomainError::NotFound(format!("cart item {}", line_id)));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Empties the cart. Returns how many lines were removed.
    pub async fn clear(&self, user_id: Uuid) -> Result<u64, DomainError> {
        let mut tx = self.store.begin().await?;
        let removed = tx.clear_cart(user_id).await?;
        tx.commit().await?;
        Ok(removed)
    }
}

//! Framework-agnostic marketplace entities and the pure rules of checkout.

pub mod cart;
pub mod error;
pub mod order;
pub mod product;

pub use cart::{CartItem, CartLine, CartLinePatch};
pub use error::DomainError;
pub use order::{Checkout, Order, OrderItem, OrderPatch, OrderStatus, PaymentStatus};
pub use product::{Product, ProductStatus, UserSummary};

pub mod cart_service;
pub mod order_query_service;

pub use cart_service::CartService;
pub use order_query_service::OrderQueryService;

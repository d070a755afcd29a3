pub mod memory;
pub mod postgres_market_store;
pub mod postgres_notification_sink;

pub use memory::{MemoryMarketStore, MemoryNotificationSink, SentNotification};
pub use postgres_market_store::PostgresMarketStore;
pub use postgres_notification_sink::PostgresNotificationSink;

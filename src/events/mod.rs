pub mod bus;
pub mod types;

// Re-export key types for easier usage
pub use bus::{EventBus, Subscription};
pub use types::{EventMetadata, MarketDataEvent};

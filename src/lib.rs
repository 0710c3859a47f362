// Expose the modules
pub mod api;
pub mod config;
pub mod events;
pub mod matching_engine;
pub mod orderbook;
pub mod types;

// Re-export key types for easier usage
pub use api::Api;
pub use config::{Config, SymbolSpec};
pub use events::{EventBus, EventMetadata, MarketDataEvent, Subscription};
pub use matching_engine::{MatchingEngine, OrderRequest};
pub use orderbook::{BookSnapshot, OrderBook, PriceLevel, SubmitResult};
pub use types::{Bbo, Order, OrderStatus, OrderType, RejectReason, Sequence, Side, Trade};

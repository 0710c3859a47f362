use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::orderbook::BookSnapshot;
use crate::types::Trade;

/// Market-data events emitted by the engine after each book mutation. For one
/// submission, subscribers observe the trades in execution order followed by a
/// single snapshot of the post-mutation book.
#[derive(Debug, Clone)]
pub enum MarketDataEvent {
    /// One execution between a maker and a taker.
    Trade(Trade),
    /// Aggregated book state after a mutation.
    BookSnapshot(BookSnapshot),
}

impl MarketDataEvent {
    /// The streaming channel this event belongs to.
    pub fn channel(&self) -> &'static str {
        match self {
            MarketDataEvent::Trade(_) => "trades",
            MarketDataEvent::BookSnapshot(_) => "orderbook",
        }
    }

    /// The symbol the event concerns.
    pub fn symbol(&self) -> &str {
        match self {
            MarketDataEvent::Trade(trade) => &trade.symbol,
            MarketDataEvent::BookSnapshot(snapshot) => &snapshot.symbol,
        }
    }
}

/// Metadata stamped by the bus on every published event.
#[derive(Debug, Clone)]
pub struct EventMetadata {
    /// Unique identifier for the event.
    pub id: Uuid,
    /// Wall-clock publication time.
    pub timestamp: DateTime<Utc>,
    /// Bus-wide publication sequence.
    pub sequence: u64,
    /// Component that published the event.
    pub source: String,
}

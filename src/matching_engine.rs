//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the cross-symbol matching engine: the single entry point for
// order submission and cancellation. It routes requests to per-symbol order books,
// assigns ids and sequence stamps, maintains the bounded recent-trades tail, and
// publishes market-data events to subscribers.
//
// | Component       | Description                                                       |
// |-----------------|-------------------------------------------------------------------|
// | MatchingEngine  | Registry of order books keyed by symbol, trades tail, event bus   |
// | OrderRequest    | A client's submission intent before validation                    |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name            | Description                                   | Return Type            |
// |-----------------|-----------------------------------------------|------------------------|
// | submit          | Validate, route, match, publish               | SubmitResult           |
// | cancel          | Remove a resting order                        | bool                   |
// | orderbook       | Aggregated depth snapshot                     | Option<BookSnapshot>   |
// | bbo             | Best bid and offer                            | Option<Bbo>            |
// | recent_trades   | Filtered view of the bounded trades tail      | Vec<Trade>             |
// | subscribe       | Attach a market-data subscriber               | Subscription           |
//--------------------------------------------------------------------------------------------------

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SymbolSpec;
use crate::events::{EventBus, MarketDataEvent, Subscription};
use crate::orderbook::{BookSnapshot, OrderBook, SubmitResult};
use crate::types::{Bbo, Order, OrderType, RejectReason, Sequence, Side, Trade};

/// A client's intent to trade, as received from a collaborator. Ids are optional:
/// the engine generates one when absent, and rejects reuse of one it has seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

/// The cross-symbol matching engine. Each symbol's book is guarded by its own mutex,
/// so matching is serialized per symbol while symbols proceed in parallel; readers
/// take short locks and only ever observe post-mutation states.
#[derive(Debug)]
pub struct MatchingEngine {
    books: RwLock<HashMap<String, Arc<Mutex<OrderBook>>>>,
    recent_trades: Mutex<VecDeque<Trade>>,
    recent_trades_cap: usize,
    snapshot_depth: usize,
    bus: EventBus,
    sequence: Sequence,
}

impl MatchingEngine {
    /// Creates an engine with the default tail capacity (1000), snapshot depth (20),
    /// and subscriber queue capacity (1024). No symbols are registered.
    pub fn new() -> Self {
        Self::with_options(1000, 20, 1024)
    }

    /// Creates an engine with explicit capacities.
    pub fn with_options(
        recent_trades_cap: usize,
        snapshot_depth: usize,
        event_queue_cap: usize,
    ) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            recent_trades: Mutex::new(VecDeque::with_capacity(recent_trades_cap)),
            recent_trades_cap,
            snapshot_depth,
            bus: EventBus::new("matching-engine", event_queue_cap),
            sequence: Sequence::new(),
        }
    }

    /// Registers a trading pair and creates its book. The book persists for the
    /// engine's lifetime. Returns false when the symbol already exists.
    pub fn register_symbol(&self, spec: SymbolSpec) -> bool {
        let mut books = self.books.write();
        if books.contains_key(&spec.name) {
            return false;
        }
        info!(
            symbol = %spec.name,
            price_scale = spec.price_scale,
            quantity_scale = spec.quantity_scale,
            "registered trading pair"
        );
        books.insert(
            spec.name.clone(),
            Arc::new(Mutex::new(OrderBook::new(
                spec.name,
                spec.price_scale,
                spec.quantity_scale,
            ))),
        );
        true
    }

    /// All registered symbols.
    pub fn symbols(&self) -> Vec<String> {
        let books = self.books.read();
        let mut symbols: Vec<String> = books.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Submits an order: validates, assigns id and sequence, matches it inside the
    /// symbol's guard, records trades, and publishes the events. Rejections come
    /// back as values with `order.status == Rejected`; nothing is published for them.
    pub fn submit(&self, request: OrderRequest) -> SubmitResult {
        let id = request.order_id.unwrap_or_else(Uuid::new_v4);
        let order = Order::new(
            id,
            request.symbol.clone(),
            request.order_type,
            request.side,
            request.price,
            request.quantity,
        );

        let Some(book) = self.book(&request.symbol) else {
            debug!(symbol = %request.symbol, order_id = %id, "order rejected: unknown symbol");
            return SubmitResult::rejected(order, RejectReason::UnknownSymbol(request.symbol));
        };

        let mut book = book.lock();
        let result = book.submit(order, &self.sequence);

        if let Some(reason) = &result.reason {
            debug!(order_id = %result.order.id, %reason, "order rejected");
            return result;
        }

        info!(
            order_id = %result.order.id,
            symbol = %result.order.symbol,
            status = ?result.order.status,
            trades = result.trades.len(),
            "order processed"
        );

        if !result.trades.is_empty() {
            let mut tail = self.recent_trades.lock();
            for trade in &result.trades {
                info!(
                    trade_id = %trade.trade_id,
                    symbol = %trade.symbol,
                    price = %trade.price,
                    quantity = %trade.quantity,
                    "trade executed"
                );
                if tail.len() == self.recent_trades_cap {
                    tail.pop_front();
                }
                tail.push_back(trade.clone());
            }
        }

        // Published while the book guard is held: the bus never blocks, and the
        // guard keeps one submission's events contiguous per subscriber.
        for trade in &result.trades {
            self.bus.publish(MarketDataEvent::Trade(trade.clone()));
        }
        self.bus
            .publish(MarketDataEvent::BookSnapshot(book.snapshot(self.snapshot_depth)));

        result
    }

    /// Cancels a resting order. Returns false for unknown symbols, unknown ids, and
    /// already-terminal orders; no state changes and nothing is published in that case.
    pub fn cancel(&self, symbol: &str, order_id: Uuid) -> bool {
        let Some(book) = self.book(symbol) else {
            return false;
        };
        let mut book = book.lock();
        match book.cancel(order_id) {
            Some(_) => {
                info!(%order_id, symbol, "order cancelled");
                self.bus
                    .publish(MarketDataEvent::BookSnapshot(book.snapshot(self.snapshot_depth)));
                true
            }
            None => false,
        }
    }

    /// Aggregated depth snapshot, `None` for unknown symbols.
    pub fn orderbook(&self, symbol: &str, depth: usize) -> Option<BookSnapshot> {
        let book = self.book(symbol)?;
        let book = book.lock();
        Some(book.snapshot(depth))
    }

    /// Serializable snapshots of every book, for collaborators that persist engine
    /// state. Each book is consistent in itself; no cross-symbol ordering is implied.
    pub fn snapshot_all(&self, depth: usize) -> Vec<BookSnapshot> {
        let books: Vec<Arc<Mutex<OrderBook>>> = {
            let books = self.books.read();
            books.values().cloned().collect()
        };
        let mut snapshots: Vec<BookSnapshot> =
            books.iter().map(|book| book.lock().snapshot(depth)).collect();
        snapshots.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        snapshots
    }

    /// Best bid and offer, `None` for unknown symbols.
    pub fn bbo(&self, symbol: &str) -> Option<Bbo> {
        let book = self.book(symbol)?;
        let book = book.lock();
        Some(book.bbo())
    }

    /// The most recent trades, newest first, optionally filtered by symbol.
    pub fn recent_trades(&self, symbol: Option<&str>, limit: usize) -> Vec<Trade> {
        let tail = self.recent_trades.lock();
        tail.iter()
            .rev()
            .filter(|trade| symbol.map_or(true, |s| trade.symbol == s))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Attaches a market-data subscriber.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Detaches a subscriber. A detached subscriber's queue drains and closes.
    pub fn unsubscribe(&self, subscription_id: Uuid) -> bool {
        self.bus.unsubscribe(subscription_id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    fn book(&self, symbol: &str) -> Option<Arc<Mutex<OrderBook>>> {
        let books = self.books.read();
        books.get(symbol).cloned()
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

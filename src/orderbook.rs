//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single trading pair and the matching
// state machine that executes incoming orders against it. Orders are kept in strict
// price-time priority: better prices match first, and within a price level the queue
// is first-in-first-out by acceptance sequence.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | PriceLevel    | FIFO queue of resting orders sharing one price, with a cached total       |
// | OrderBook     | Both sides of one symbol's book plus the order-id index                   |
// | SubmitResult  | Outcome of one submission: final order state, trades, optional rejection  |
// | BookSnapshot  | Aggregated top-of-book view handed to market-data consumers               |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                                | Return Type            |
// |-----------------------|--------------------------------------------|------------------------|
// | submit                | Match an incoming order, rest any residual | SubmitResult           |
// | cancel                | Remove a resting order by id               | Option<Order>          |
// | snapshot              | Aggregated depth view of both sides        | BookSnapshot           |
// | best_bid / best_ask   | Top price per side                         | Option<Decimal>        |
// | spread / bbo          | Best-price derived views                   | Option<Decimal> / Bbo  |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::types::{Bbo, Order, OrderStatus, OrderType, RejectReason, Sequence, Side, Trade};

/// Outcome of one submission. Rejections are carried here as values; `order` always
/// reflects the final state (including `Rejected`), and `trades` lists the executions
/// this submission produced, in execution order.
#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub order: Order,
    pub trades: Vec<Trade>,
    pub reason: Option<RejectReason>,
}

impl SubmitResult {
    pub fn accepted(order: Order, trades: Vec<Trade>) -> Self {
        Self {
            order,
            trades,
            reason: None,
        }
    }

    pub fn rejected(mut order: Order, reason: RejectReason) -> Self {
        order.status = OrderStatus::Rejected;
        order.updated_at = Utc::now();
        Self {
            order,
            trades: Vec::new(),
            reason: Some(reason),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.reason.is_some()
    }
}

/// An immutable aggregated view of the top of the book: the best `depth` levels per
/// side as `(price, total_quantity)` pairs, bids descending and asks ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub symbol: String,
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
    /// Last engine stamp issued to this book when the snapshot was taken.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl BookSnapshot {
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.first().map(|(price, _)| *price)
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.first().map(|(price, _)| *price)
    }
}

/// Maintains the FIFO queue of resting orders at one price on one side. The total
/// of the queued orders' remaining quantities is kept as a running sum so depth
/// queries cost O(1) per level.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Decimal,
    orders: VecDeque<Order>,
    total_quantity: Decimal,
}

impl PriceLevel {
    fn new(price: Decimal) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_quantity: Decimal::ZERO,
        }
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Sum of `remaining` over the queued orders.
    pub fn total_quantity(&self) -> Decimal {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// The maker candidate: the oldest order at this price.
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    fn push_back(&mut self, order: Order) {
        self.total_quantity += order.remaining;
        self.orders.push_back(order);
    }

    fn remove(&mut self, order_id: Uuid) -> Option<Order> {
        let pos = self.orders.iter().position(|o| o.id == order_id)?;
        let order = self.orders.remove(pos)?;
        self.total_quantity -= order.remaining;
        Some(order)
    }
}

/// One symbol's order book: bids descending, asks ascending, and an index from
/// order id to its resting level for cancellation. All mutation happens through
/// `submit` and `cancel`; the caller serializes access.
#[derive(Debug)]
pub struct OrderBook {
    symbol: String,
    price_scale: u32,
    quantity_scale: u32,
    bids: BTreeMap<Decimal, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    /// Locates a resting order's level. Holds only currently resting orders.
    by_id: HashMap<Uuid, (Side, Decimal)>,
    /// Every id ever accepted, for duplicate detection over the book's lifetime.
    accepted_ids: HashSet<Uuid>,
    last_sequence: u64,
    last_update: DateTime<Utc>,
}

impl OrderBook {
    /// Creates an empty book for `symbol` with the given price and quantity scales
    /// (maximum decimal places accepted at submission).
    pub fn new(symbol: impl Into<String>, price_scale: u32, quantity_scale: u32) -> Self {
        Self {
            symbol: symbol.into(),
            price_scale,
            quantity_scale,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            by_id: HashMap::new(),
            accepted_ids: HashSet::new(),
            last_sequence: 0,
            last_update: Utc::now(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Atomically matches `order` against the opposite side per its type's semantics,
    /// rests any limit residual, and returns the final order state with the trades
    /// produced. On rejection the book is left untouched and no trades are emitted.
    ///
    /// Every accepted order and every trade draws a fresh stamp from `seq`, so the
    /// stamps observed on one book are strictly increasing in acceptance order.
    pub fn submit(&mut self, mut order: Order, seq: &Sequence) -> SubmitResult {
        // Market orders execute at whatever the book offers; a stray price is ignored.
        if order.order_type == OrderType::Market {
            order.price = None;
        }

        if let Some(reason) = self.validate(&order) {
            return SubmitResult::rejected(order, reason);
        }

        self.accepted_ids.insert(order.id);
        order.sequence = seq.next();

        // FOK: all or nothing, decided before the book is touched.
        if order.order_type == OrderType::Fok {
            if let Some(limit) = order.price {
                if !self.can_fill(order.side, limit, order.quantity) {
                    debug!(
                        symbol = %self.symbol,
                        order_id = %order.id,
                        "fok order rejected: insufficient crossing liquidity"
                    );
                    return SubmitResult::rejected(order, RejectReason::FokUnfillable);
                }
            }
        }

        let trades = self.match_incoming(&mut order, seq);

        if order.remaining.is_zero() {
            order.status = OrderStatus::Filled;
        } else if !trades.is_empty() {
            order.status = OrderStatus::PartiallyFilled;
        }
        order.updated_at = Utc::now();

        match order.order_type {
            OrderType::Limit => {
                if !order.remaining.is_zero() {
                    self.rest(order.clone());
                }
            }
            OrderType::Market | OrderType::Ioc => {
                // Residual quantity is discarded, never rested. A zero-fill ends
                // the order's life as cancelled rather than rejected.
                if !order.remaining.is_zero() && trades.is_empty() {
                    order.status = OrderStatus::Cancelled;
                }
            }
            OrderType::Fok => {
                debug_assert!(
                    order.remaining.is_zero(),
                    "fok pre-check guarantees a full fill"
                );
            }
        }

        self.last_sequence = trades.last().map_or(order.sequence, |t| t.sequence);
        self.last_update = Utc::now();
        self.check_uncrossed();

        SubmitResult::accepted(order, trades)
    }

    /// Removes a resting order by id. Returns the cancelled order, or `None` when
    /// the id is unknown or already terminal. A benign outcome, not an error.
    pub fn cancel(&mut self, order_id: Uuid) -> Option<Order> {
        let (side, price) = self.by_id.remove(&order_id)?;
        let book_side = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let Some(level) = book_side.get_mut(&price) else {
            panic!(
                "order index for {} points at a missing {:?} level {}",
                self.symbol, side, price
            );
        };
        let Some(mut order) = level.remove(order_id) else {
            panic!(
                "order {} indexed at {:?} {} on {} is not in the level queue",
                order_id, side, price, self.symbol
            );
        };
        if level.is_empty() {
            book_side.remove(&price);
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        self.last_update = order.updated_at;
        debug!(symbol = %self.symbol, %order_id, "order cancelled and removed from book");
        Some(order)
    }

    /// Returns the top `depth` aggregated levels per side.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        BookSnapshot {
            symbol: self.symbol.clone(),
            bids: self
                .bids
                .iter()
                .rev()
                .take(depth)
                .map(|(price, level)| (*price, level.total_quantity))
                .collect(),
            asks: self
                .asks
                .iter()
                .take(depth)
                .map(|(price, level)| (*price, level.total_quantity))
                .collect(),
            sequence: self.last_sequence,
            timestamp: self.last_update,
        }
    }

    /// Highest resting buy price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest resting sell price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn bbo(&self) -> Bbo {
        Bbo {
            bid: self.best_bid(),
            ask: self.best_ask(),
            spread: self.spread(),
        }
    }

    /// True while the order rests in the book.
    pub fn contains_order(&self, order_id: Uuid) -> bool {
        self.by_id.contains_key(&order_id)
    }

    /// Total resting quantity at a price, `None` when no such level exists.
    pub fn volume_at(&self, side: Side, price: Decimal) -> Option<Decimal> {
        self.side_levels(side).get(&price).map(|l| l.total_quantity)
    }

    pub fn order_count_at(&self, side: Side, price: Decimal) -> usize {
        self.side_levels(side)
            .get(&price)
            .map_or(0, |l| l.order_count())
    }

    fn side_levels(&self, side: Side) -> &BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn validate(&self, order: &Order) -> Option<RejectReason> {
        if order.quantity <= Decimal::ZERO {
            return Some(RejectReason::NonPositiveQuantity);
        }
        if order.order_type.requires_price() && order.price.is_none() {
            return Some(RejectReason::MissingPrice(order.order_type));
        }
        if let Some(price) = order.price {
            if price <= Decimal::ZERO {
                return Some(RejectReason::NonPositivePrice);
            }
            if price.normalize().scale() > self.price_scale {
                return Some(RejectReason::PriceScaleExceeded(self.price_scale));
            }
        }
        if order.quantity.normalize().scale() > self.quantity_scale {
            return Some(RejectReason::QuantityScaleExceeded(self.quantity_scale));
        }
        if self.accepted_ids.contains(&order.id) {
            return Some(RejectReason::DuplicateOrderId(order.id));
        }
        None
    }

    /// Walks the opposite side best-first, accumulating quantity at crossing prices,
    /// to decide whether a fill-or-kill order can be fully satisfied.
    fn can_fill(&self, side: Side, limit: Decimal, quantity: Decimal) -> bool {
        let mut available = Decimal::ZERO;
        match side {
            Side::Buy => {
                for (price, level) in self.asks.iter() {
                    if *price > limit {
                        break;
                    }
                    available += level.total_quantity;
                    if available >= quantity {
                        return true;
                    }
                }
            }
            Side::Sell => {
                for (price, level) in self.bids.iter().rev() {
                    if *price < limit {
                        break;
                    }
                    available += level.total_quantity;
                    if available >= quantity {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// The matching loop. Repeatedly takes the best opposite level while its price
    /// crosses the taker's limit (market orders cross everything), fills against the
    /// queue front, and emits one trade per fill at the MAKER's resting price.
    fn match_incoming(&mut self, taker: &mut Order, seq: &Sequence) -> Vec<Trade> {
        let symbol = self.symbol.clone();
        let mut trades = Vec::new();

        loop {
            if taker.remaining.is_zero() {
                break;
            }

            let best_price = match taker.side {
                Side::Buy => self.asks.keys().next().copied(),
                Side::Sell => self.bids.keys().next_back().copied(),
            };
            let Some(best_price) = best_price else { break };

            if let Some(limit) = taker.price {
                let crosses = match taker.side {
                    Side::Buy => best_price <= limit,
                    Side::Sell => best_price >= limit,
                };
                if !crosses {
                    break;
                }
            }

            let by_id = &mut self.by_id;
            let book_side = match taker.side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let Some(level) = book_side.get_mut(&best_price) else {
                break;
            };

            // Drain the level front-first until the taker or the level is exhausted.
            while !taker.remaining.is_zero() {
                let Some(maker) = level.orders.front_mut() else {
                    break;
                };
                let fill = taker.remaining.min(maker.remaining);

                trades.push(Trade {
                    trade_id: Uuid::new_v4(),
                    symbol: symbol.clone(),
                    price: best_price,
                    quantity: fill,
                    maker_order_id: maker.id,
                    taker_order_id: taker.id,
                    aggressor_side: taker.side,
                    sequence: seq.next(),
                    executed_at: Utc::now(),
                });

                taker.remaining -= fill;
                maker.remaining -= fill;
                maker.updated_at = Utc::now();
                level.total_quantity -= fill;

                assert!(
                    maker.remaining >= Decimal::ZERO && taker.remaining >= Decimal::ZERO,
                    "negative remaining after fill of {} on {}",
                    fill,
                    symbol
                );

                if maker.remaining.is_zero() {
                    maker.status = OrderStatus::Filled;
                    let maker_id = maker.id;
                    level.orders.pop_front();
                    by_id.remove(&maker_id);
                } else {
                    maker.status = OrderStatus::PartiallyFilled;
                }
            }

            if level.orders.is_empty() {
                book_side.remove(&best_price);
            }
        }

        trades
    }

    /// Appends a limit residual at the back of its price level, creating the level
    /// if needed, and indexes it for cancellation.
    fn rest(&mut self, order: Order) {
        let Some(price) = order.price else {
            panic!("attempted to rest a priceless order {} on {}", order.id, self.symbol);
        };
        let side = order.side;
        let level = match side {
            Side::Buy => self.bids.entry(price).or_insert_with(|| PriceLevel::new(price)),
            Side::Sell => self.asks.entry(price).or_insert_with(|| PriceLevel::new(price)),
        };
        self.by_id.insert(order.id, (side, price));
        debug!(
            symbol = %self.symbol,
            order_id = %order.id,
            ?side,
            %price,
            remaining = %order.remaining,
            "order resting on book"
        );
        level.push_back(order);
    }

    /// Post-mutation invariant: the book must never be crossed. A violation is a
    /// bug in the matching loop, not a runtime condition.
    fn check_uncrossed(&self) {
        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            assert!(
                bid < ask,
                "crossed book on {}: best bid {} >= best ask {}",
                self.symbol,
                bid,
                ask
            );
        }
    }
}

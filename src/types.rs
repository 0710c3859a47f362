//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the matching engine:
// orders, trades, sequence stamping, and rejection reasons.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Discrete sets of values (Side, OrderType, OrderStatus).          |
// | STRUCTS            | Orders, Trades, the BBO view, and the sequence counter.          |
// | REJECTIONS         | Reasons an order is refused, carried as values.                  |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// A buy order (bid).
    Buy,
    /// A sell order (ask).
    Sell,
}

impl Side {
    /// Returns the opposite side, i.e. the side an incoming order matches against.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Represents the type of an order, which drives its matching behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Executes immediately at the best available prices; never rests.
    Market,
    /// Executes at the limit price or better; any residual rests on the book.
    Limit,
    /// Immediate-or-cancel: fills what is immediately possible, discards the rest.
    Ioc,
    /// Fill-or-kill: fills the full quantity immediately or does nothing.
    Fok,
}

impl OrderType {
    /// True for types that require a limit price (limit, ioc, fok).
    pub fn requires_price(&self) -> bool {
        !matches!(self, OrderType::Market)
    }
}

/// Represents the lifecycle status of an order within the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted by the engine, nothing filled yet.
    New,
    /// Some quantity filled, some remaining.
    PartiallyFilled,
    /// Completely filled. Terminal.
    Filled,
    /// Cancelled before being fully filled. Terminal.
    Cancelled,
    /// Refused at submission (validation failure or unfillable FOK). Terminal.
    Rejected,
}

impl OrderStatus {
    /// True once an order can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------

/// Represents a trading order. Prices and quantities use `Decimal` so the matching
/// path never touches binary floating point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for the order. Unique for the lifetime of its book.
    pub id: Uuid,
    /// Trading pair this order belongs to (e.g. "BTC-USDT").
    pub symbol: String,
    /// Type of the order (Market, Limit, Ioc, Fok).
    pub order_type: OrderType,
    /// Side of the order (Buy or Sell).
    pub side: Side,
    /// Limit price. `None` for market orders.
    pub price: Option<Decimal>,
    /// Original order quantity. Strictly positive.
    pub quantity: Decimal,
    /// Quantity still open. Equals `quantity` at birth, monotonically non-increasing.
    pub remaining: Decimal,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Monotonic engine-assigned acceptance stamp; the time key for priority.
    pub sequence: u64,
    /// Wall-clock creation time, informational only.
    pub created_at: DateTime<Utc>,
    /// Wall-clock time of the last state change.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `New` status with nothing filled. The sequence stamp
    /// is assigned later, when the book accepts the order.
    pub fn new(
        id: Uuid,
        symbol: impl Into<String>,
        order_type: OrderType,
        side: Side,
        price: Option<Decimal>,
        quantity: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            symbol: symbol.into(),
            order_type,
            side,
            price,
            quantity,
            remaining: quantity,
            status: OrderStatus::New,
            sequence: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Quantity filled so far.
    pub fn filled(&self) -> Decimal {
        self.quantity - self.remaining
    }
}

/// Represents a completed trade between a resting maker and an incoming taker.
/// Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier for the trade.
    pub trade_id: Uuid,
    /// Trading pair the trade occurred on.
    pub symbol: String,
    /// Execution price. Always the maker's resting price.
    pub price: Decimal,
    /// Quantity exchanged.
    pub quantity: Decimal,
    /// ID of the order that was resting on the book (maker).
    pub maker_order_id: Uuid,
    /// ID of the incoming order that initiated the match (taker).
    pub taker_order_id: Uuid,
    /// Side of the aggressor (the taker).
    pub aggressor_side: Side,
    /// Monotonic engine stamp, totally ordered with order acceptance per symbol.
    pub sequence: u64,
    /// Wall-clock execution time, informational only.
    pub executed_at: DateTime<Utc>,
}

/// Best bid and offer for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbo {
    /// Highest resting buy price, if any.
    pub bid: Option<Decimal>,
    /// Lowest resting sell price, if any.
    pub ask: Option<Decimal>,
    /// `ask - bid` when both sides are present.
    pub spread: Option<Decimal>,
}

/// Monotonic stamp source. Every accepted order and every trade draws a fresh
/// value, so stamps are strictly increasing in issue order.
#[derive(Debug, Default)]
pub struct Sequence(AtomicU64);

impl Sequence {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Returns the next stamp. Strictly greater than every previously returned value.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The most recently issued stamp, 0 if none yet.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

//--------------------------------------------------------------------------------------------------
//  REJECTIONS
//--------------------------------------------------------------------------------------------------

/// Why an order was refused. Rejections travel on the normal return path as part
/// of the submit result, never as `Err`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("order quantity must be positive")]
    NonPositiveQuantity,

    #[error("order price must be positive")]
    NonPositivePrice,

    #[error("{0:?} orders require a price")]
    MissingPrice(OrderType),

    #[error("price exceeds the symbol's scale of {0} decimal places")]
    PriceScaleExceeded(u32),

    #[error("quantity exceeds the symbol's scale of {0} decimal places")]
    QuantityScaleExceeded(u32),

    #[error("duplicate order id: {0}")]
    DuplicateOrderId(Uuid),

    #[error("fill-or-kill order cannot be fully filled")]
    FokUnfillable,
}

impl RejectReason {
    /// Validation failures are malformed input; `FokUnfillable` is a business
    /// rejection of a well-formed order. The HTTP layer maps the two differently.
    pub fn is_validation(&self) -> bool {
        !matches!(self, RejectReason::FokUnfillable)
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------

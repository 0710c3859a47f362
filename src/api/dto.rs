//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                 | Description                                | Conversion          |
// |----------------------|--------------------------------------------|---------------------|
// | CreateOrderRequest   | Order submission payload                   | into_request        |
// | CancelOrderRequest   | Cancellation payload                       |                     |
// | OrderView            | Order as sent over the wire                | From<Order>         |
// | TradeView            | Trade as sent over the wire                | From<Trade>         |
// | SubmitResponse       | Submission outcome                         | From<SubmitResult>  |
// | OrderBookResponse    | Aggregated depth                           | From<BookSnapshot>  |
// | BboResponse          | Best bid and offer                         |                     |
//--------------------------------------------------------------------------------------------------
// Prices and quantities serialize as decimal strings, preserving exactness on the wire.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matching_engine::OrderRequest;
use crate::orderbook::{BookSnapshot, SubmitResult};
use crate::types::{Order, OrderStatus, OrderType, Side, Trade};

/// Request to submit a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Trading pair, case-insensitive.
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub quantity: Decimal,
    /// Required for limit, ioc and fok orders; ignored for market orders.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Optional client-supplied id; reuse of a seen id is rejected.
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

impl CreateOrderRequest {
    pub fn into_request(self) -> OrderRequest {
        OrderRequest {
            symbol: self.symbol.to_uppercase(),
            order_type: self.order_type,
            side: self.side,
            quantity: self.quantity,
            price: self.price,
            order_id: self.order_id,
        }
    }
}

/// Request to cancel a resting order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub symbol: String,
    pub order_id: Uuid,
}

/// Order as exposed over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: Uuid,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub status: OrderStatus,
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            filled_quantity: order.filled(),
            remaining_quantity: order.remaining,
            symbol: order.symbol,
            order_type: order.order_type,
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            status: order.status,
            sequence: order.sequence,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Trade as exposed over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeView {
    pub trade_id: Uuid,
    pub symbol: String,
    pub price: Decimal,
    pub quantity: Decimal,
    pub aggressor_side: Side,
    pub maker_order_id: Uuid,
    pub taker_order_id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<Trade> for TradeView {
    fn from(trade: Trade) -> Self {
        Self {
            trade_id: trade.trade_id,
            symbol: trade.symbol,
            price: trade.price,
            quantity: trade.quantity,
            aggressor_side: trade.aggressor_side,
            maker_order_id: trade.maker_order_id,
            taker_order_id: trade.taker_order_id,
            sequence: trade.sequence,
            timestamp: trade.executed_at,
        }
    }
}

/// Outcome of a submission. `success` is false only for business rejections;
/// validation failures never reach this shape, they map to HTTP 400.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub order: OrderView,
    pub trades: Vec<TradeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<SubmitResult> for SubmitResponse {
    fn from(result: SubmitResult) -> Self {
        Self {
            success: result.reason.is_none(),
            order: OrderView::from(result.order),
            trades: result.trades.into_iter().map(TradeView::from).collect(),
            reason: result.reason.map(|r| r.to_string()),
        }
    }
}

/// Outcome of a cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    pub order_id: Uuid,
}

/// Aggregated book depth: `(price, quantity)` pairs, bids descending, asks ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookResponse {
    pub symbol: String,
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

impl From<BookSnapshot> for OrderBookResponse {
    fn from(snapshot: BookSnapshot) -> Self {
        Self {
            symbol: snapshot.symbol,
            bids: snapshot.bids,
            asks: snapshot.asks,
            sequence: snapshot.sequence,
            timestamp: snapshot.timestamp,
        }
    }
}

/// Best bid and offer for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BboResponse {
    pub symbol: String,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub spread: Option<Decimal>,
}

/// Recent trades, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradesResponse {
    pub trades: Vec<TradeView>,
    pub count: usize,
}

/// All registered trading pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolsResponse {
    pub symbols: Vec<String>,
    pub count: usize,
}

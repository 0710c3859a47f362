//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                            | Return Type         |
// |-----------------------|----------------------------------------|---------------------|
// | health                | Health check endpoint                  | Response            |
// | create_order          | Submit a new order                     | ApiResult<Response> |
// | cancel_order          | Cancel a resting order                 | ApiResult<Response> |
// | get_orderbook         | Aggregated depth for a symbol          | ApiResult<Response> |
// | get_bbo               | Best bid and offer for a symbol        | ApiResult<Response> |
// | get_trades            | Recent trades, optionally filtered     | ApiResult<Response> |
// | get_symbols           | All registered trading pairs           | Response            |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{
    ApiError, ApiResult, AppState, BboResponse, CancelOrderRequest, CancelResponse,
    CreateOrderRequest, OrderBookResponse, SubmitResponse, SymbolsResponse, TradeView,
    TradesResponse,
};

#[derive(Debug, Deserialize)]
pub struct DepthQuery {
    depth: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    symbol: Option<String>,
    limit: Option<usize>,
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

/// Submit a new order. Validation failures map to 400; business rejections (an
/// unfillable FOK) come back as 200 with `success: false` and zero trades.
pub async fn create_order(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<Response> {
    let result = state.engine.submit(req.into_request());

    if let Some(reason) = &result.reason {
        if reason.is_validation() {
            return Err(ApiError::BadRequest(reason.to_string()));
        }
    }

    Ok(Json(SubmitResponse::from(result)).into_response())
}

/// Cancel a resting order. Unknown symbols and ids map to 404.
pub async fn cancel_order(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CancelOrderRequest>,
) -> ApiResult<Response> {
    let symbol = req.symbol.to_uppercase();
    if !state.engine.cancel(&symbol, req.order_id) {
        return Err(ApiError::NotFound(format!(
            "order {} not found on {}",
            req.order_id, symbol
        )));
    }

    Ok(Json(CancelResponse {
        success: true,
        order_id: req.order_id,
    })
    .into_response())
}

/// Aggregated order book depth for a symbol.
pub async fn get_orderbook(
    Extension(state): Extension<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<DepthQuery>,
) -> ApiResult<Response> {
    let symbol = symbol.to_uppercase();
    let depth = query.depth.unwrap_or(state.default_depth);

    let snapshot = state
        .engine
        .orderbook(&symbol, depth)
        .ok_or_else(|| ApiError::NotFound(format!("unknown symbol: {}", symbol)))?;

    Ok(Json(OrderBookResponse::from(snapshot)).into_response())
}

/// Best bid and offer for a symbol.
pub async fn get_bbo(
    Extension(state): Extension<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Response> {
    let symbol = symbol.to_uppercase();
    let bbo = state
        .engine
        .bbo(&symbol)
        .ok_or_else(|| ApiError::NotFound(format!("unknown symbol: {}", symbol)))?;

    Ok(Json(BboResponse {
        symbol,
        bid: bbo.bid,
        ask: bbo.ask,
        spread: bbo.spread,
    })
    .into_response())
}

/// Recent trades across all symbols, newest first, optionally filtered.
pub async fn get_trades(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<TradesQuery>,
) -> ApiResult<Response> {
    let limit = query.limit.unwrap_or(100).min(state.max_trades_limit);
    let symbol = query.symbol.map(|s| s.to_uppercase());

    let trades: Vec<TradeView> = state
        .engine
        .recent_trades(symbol.as_deref(), limit)
        .into_iter()
        .map(TradeView::from)
        .collect();

    let count = trades.len();
    Ok(Json(TradesResponse { trades, count }).into_response())
}

/// All registered trading pairs.
pub async fn get_symbols(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let symbols = state.engine.symbols();
    let count = symbols.len();
    Json(SymbolsResponse { symbols, count })
}

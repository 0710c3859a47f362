//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the thin HTTP/WebSocket collaborator over the matching engine
// using Axum. It exposes order submission and cancellation, market-data queries, and a
// streaming feed of trades and book snapshots.
//
// | Component      | Description                                                |
// |----------------|-----------------------------------------------------------|
// | Api            | Binds the router to an address and serves it               |
// | AppState       | Shared handler state: the engine and query bounds          |
// | Routes         | Handler functions for the REST endpoints                   |
// | Ws             | WebSocket subscribe/unsubscribe and push                   |
// | DTOs           | Request/response shapes with decimal-string wire format    |
//--------------------------------------------------------------------------------------------------

mod dto;
mod error;
mod routes;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::matching_engine::MatchingEngine;

pub use dto::*;
pub use error::{ApiError, ApiResult};

/// Shared application state accessible by all handlers.
pub struct AppState {
    /// The matching engine this API fronts.
    pub engine: Arc<MatchingEngine>,
    /// Snapshot depth when a request does not specify one.
    pub default_depth: usize,
    /// Upper bound on the `limit` parameter of trade queries.
    pub max_trades_limit: usize,
}

/// The HTTP/WebSocket server for one engine instance.
pub struct Api {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl Api {
    pub fn new(
        addr: SocketAddr,
        engine: Arc<MatchingEngine>,
        default_depth: usize,
        max_trades_limit: usize,
    ) -> Self {
        Self {
            addr,
            state: Arc::new(AppState {
                engine,
                default_depth,
                max_trades_limit,
            }),
        }
    }

    /// Builds the router with all endpoints and shared state attached.
    pub fn routes(&self) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route(
                "/api/orders",
                post(routes::create_order).delete(routes::cancel_order),
            )
            .route("/api/orderbook/:symbol", get(routes::get_orderbook))
            .route("/api/bbo/:symbol", get(routes::get_bbo))
            .route("/api/trades", get(routes::get_trades))
            .route("/api/symbols", get(routes::get_symbols))
            .route("/ws", get(ws::ws_handler))
            .layer(Extension(self.state.clone()))
            .layer(CorsLayer::permissive())
    }

    /// Serves until the process is stopped.
    pub async fn serve(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "api listening");
        axum::serve(listener, self.routes()).await
    }
}

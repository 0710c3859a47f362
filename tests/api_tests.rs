//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Integration tests for the HTTP API: endpoint shapes, the status-code policy
// (400 validation / 200 success=false business rejection / 404 not found), and the
// decimal-string wire format.
//--------------------------------------------------------------------------------------------------

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{from_slice, json, Value};
use tower::ServiceExt;

use matchbook::{Api, MatchingEngine, SymbolSpec};

/// Sets up a test router with one registered symbol (price scale 2, quantity scale 4).
fn setup_test_router() -> Router {
    let engine = Arc::new(MatchingEngine::new());
    engine.register_symbol(SymbolSpec::new("BTC-USDT", 2, 4));

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    Api::new(addr, engine, 20, 1000).routes()
}

async fn request(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(value) => builder.body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        from_slice(&bytes).expect("body is json")
    };
    (status, value)
}

fn submit_body(order_type: &str, side: &str, quantity: &str, price: Option<&str>) -> Value {
    let mut body = json!({
        "symbol": "btc-usdt",
        "order_type": order_type,
        "side": side,
        "quantity": quantity,
    });
    if let Some(price) = price {
        body["price"] = json!(price);
    }
    body
}

#[tokio::test]
async fn test_health() {
    let router = setup_test_router();
    let (status, body) = request(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_submit_limit_order() {
    let router = setup_test_router();

    let (status, body) = request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("limit", "buy", "1.0", Some("50000.00"))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["order"]["status"], "new");
    assert_eq!(body["order"]["symbol"], "BTC-USDT");
    assert_eq!(body["order"]["remaining_quantity"], "1.0");
    assert!(body["trades"].as_array().expect("trades array").is_empty());

    // The order now shows in the book, prices and quantities as decimal strings.
    let (status, book) = request(&router, "GET", "/api/orderbook/BTC-USDT", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["bids"][0][0], "50000.00");
    assert_eq!(book["bids"][0][1], "1.0");
    assert!(book["asks"].as_array().expect("asks array").is_empty());
}

#[tokio::test]
async fn test_submit_and_match_produces_trades() {
    let router = setup_test_router();

    request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("limit", "sell", "0.5", Some("50000.00"))),
    )
    .await;

    let (status, body) = request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("market", "buy", "0.2", None)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["order"]["status"], "filled");
    let trades = body["trades"].as_array().expect("trades array");
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0]["price"], "50000.00");
    assert_eq!(trades[0]["quantity"], "0.2");
    assert_eq!(trades[0]["aggressor_side"], "buy");
}

#[tokio::test]
async fn test_validation_failures_are_400() {
    let router = setup_test_router();

    // Missing price on a limit order.
    let (status, body) = request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("limit", "buy", "1.0", None)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Unknown symbol.
    let mut unknown = submit_body("limit", "buy", "1.0", Some("1.00"));
    unknown["symbol"] = json!("DOGE-USDT");
    let (status, _) = request(&router, "POST", "/api/orders", Some(unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Price scale violation (scale is 2).
    let (status, _) = request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("limit", "buy", "1.0", Some("50000.123"))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing reached the book.
    let (_, book) = request(&router, "GET", "/api/orderbook/BTC-USDT", None).await;
    assert!(book["bids"].as_array().expect("bids array").is_empty());
}

#[tokio::test]
async fn test_fok_rejection_is_200_with_success_false() {
    let router = setup_test_router();

    request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("limit", "sell", "0.5", Some("50100.00"))),
    )
    .await;

    let (status, body) = request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("fok", "buy", "1.0", Some("50100.00"))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["order"]["status"], "rejected");
    assert!(body["trades"].as_array().expect("trades array").is_empty());
    assert!(body["reason"].as_str().expect("reason string").contains("fill-or-kill"));
}

#[tokio::test]
async fn test_cancel_order() {
    let router = setup_test_router();

    let (_, submitted) = request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("limit", "buy", "1.0", Some("49000.00"))),
    )
    .await;
    let order_id = submitted["order"]["order_id"].as_str().expect("order id");

    let cancel = json!({"symbol": "BTC-USDT", "order_id": order_id});
    let (status, body) = request(&router, "DELETE", "/api/orders", Some(cancel.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["order_id"].as_str(), Some(order_id));

    // Cancelling again finds nothing.
    let (status, _) = request(&router, "DELETE", "/api/orders", Some(cancel)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_orderbook_unknown_symbol_404() {
    let router = setup_test_router();
    let (status, _) = request(&router, "GET", "/api/orderbook/DOGE-USDT", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(&router, "GET", "/api/bbo/DOGE-USDT", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_orderbook_depth_parameter() {
    let router = setup_test_router();

    for price in ["50100.00", "50200.00", "50300.00"] {
        request(
            &router,
            "POST",
            "/api/orders",
            Some(submit_body("limit", "sell", "0.1", Some(price))),
        )
        .await;
    }

    let (_, book) = request(&router, "GET", "/api/orderbook/BTC-USDT?depth=2", None).await;
    let asks = book["asks"].as_array().expect("asks array");
    assert_eq!(asks.len(), 2);
    assert_eq!(asks[0][0], "50100.00");
    assert_eq!(asks[1][0], "50200.00");
}

#[tokio::test]
async fn test_bbo() {
    let router = setup_test_router();

    request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("limit", "buy", "1.0", Some("49900.00"))),
    )
    .await;
    request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("limit", "sell", "1.0", Some("50100.00"))),
    )
    .await;

    let (status, body) = request(&router, "GET", "/api/bbo/btc-usdt", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "BTC-USDT");
    assert_eq!(body["bid"], "49900.00");
    assert_eq!(body["ask"], "50100.00");
    assert_eq!(body["spread"], "200.00");
}

#[tokio::test]
async fn test_recent_trades_endpoint() {
    let router = setup_test_router();

    request(
        &router,
        "POST",
        "/api/orders",
        Some(submit_body("limit", "sell", "1.0", Some("50000.00"))),
    )
    .await;
    for _ in 0..2 {
        request(
            &router,
            "POST",
            "/api/orders",
            Some(submit_body("market", "buy", "0.3", None)),
        )
        .await;
    }

    let (status, body) = request(&router, "GET", "/api/trades", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, filtered) = request(&router, "GET", "/api/trades?symbol=btc-usdt&limit=1", None).await;
    assert_eq!(filtered["count"], 1);
    assert_eq!(filtered["trades"][0]["symbol"], "BTC-USDT");

    let (_, other) = request(&router, "GET", "/api/trades?symbol=ETH-USDT", None).await;
    assert_eq!(other["count"], 0);
}

#[tokio::test]
async fn test_symbols_endpoint() {
    let router = setup_test_router();
    let (status, body) = request(&router, "GET", "/api/symbols", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbols"], json!(["BTC-USDT"]));
    assert_eq!(body["count"], 1);
}

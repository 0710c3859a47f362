use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::Extension;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::debug;

use super::dto::TradeView;
use super::AppState;
use crate::events::MarketDataEvent;

const CHANNELS: [&str; 2] = ["trades", "orderbook"];

/// A client-initiated control message: subscribe to or unsubscribe from a channel.
#[derive(Debug, Deserialize)]
struct ClientMessage {
    action: String,
    channel: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Runs one WebSocket connection: a bus subscription pushes market data filtered by
/// the connection's channel set, while control messages toggle that set. A slow
/// client never backpressures the engine; its bus queue drops oldest instead.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();

    let subscription = state.engine.subscribe();
    let subscription_id = subscription.id();
    let channels: Arc<RwLock<HashSet<String>>> = Arc::new(RwLock::new(HashSet::new()));

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Bridge the blocking bus subscription onto the async socket. The thread ends
    // when the subscription is detached (receive yields None) or the socket task
    // goes away (send fails).
    let forward_channels = Arc::clone(&channels);
    let _forwarder = thread::spawn(move || {
        while let Some((event, _metadata)) = subscription.receive() {
            if !forward_channels.read().contains(event.channel()) {
                continue;
            }
            let payload = match &event {
                MarketDataEvent::Trade(trade) => json!({
                    "type": "trade",
                    "data": TradeView::from(trade.clone()),
                }),
                MarketDataEvent::BookSnapshot(snapshot) => json!({
                    "type": "orderbook",
                    "data": snapshot,
                }),
            };
            if tx.send(payload.to_string()).is_err() {
                break;
            }
        }
    });

    let welcome = json!({
        "type": "connected",
        "message": "connected to matchbook market data",
        "available_channels": CHANNELS,
    });
    if sink.send(Message::Text(welcome.to_string())).await.is_err() {
        state.engine.unsubscribe(subscription_id);
        return;
    }

    loop {
        tokio::select! {
            pushed = rx.recv() => {
                match pushed {
                    Some(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = process_message(&text, &channels);
                        if sink.send(Message::Text(reply.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.engine.unsubscribe(subscription_id);
    debug!(%subscription_id, "websocket disconnected");
}

fn process_message(text: &str, channels: &RwLock<HashSet<String>>) -> serde_json::Value {
    let Ok(message) = serde_json::from_str::<ClientMessage>(text) else {
        return json!({"type": "error", "message": "invalid message"});
    };
    if !CHANNELS.contains(&message.channel.as_str()) {
        return json!({
            "type": "error",
            "message": format!("unknown channel: {}", message.channel),
        });
    }

    match message.action.as_str() {
        "subscribe" => {
            channels.write().insert(message.channel.clone());
            json!({"type": "subscribed", "channel": message.channel})
        }
        "unsubscribe" => {
            channels.write().remove(&message.channel);
            json!({"type": "unsubscribed", "channel": message.channel})
        }
        other => json!({
            "type": "error",
            "message": format!("unknown action: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_toggles_channel_set() {
        let channels = RwLock::new(HashSet::new());

        let reply = process_message(r#"{"action":"subscribe","channel":"trades"}"#, &channels);
        assert_eq!(reply["type"], "subscribed");
        assert!(channels.read().contains("trades"));

        let reply = process_message(r#"{"action":"unsubscribe","channel":"trades"}"#, &channels);
        assert_eq!(reply["type"], "unsubscribed");
        assert!(!channels.read().contains("trades"));
    }

    #[test]
    fn test_invalid_messages_are_errors() {
        let channels = RwLock::new(HashSet::new());

        let reply = process_message("not json", &channels);
        assert_eq!(reply["type"], "error");

        let reply = process_message(r#"{"action":"subscribe","channel":"candles"}"#, &channels);
        assert_eq!(reply["type"], "error");

        let reply = process_message(r#"{"action":"noop","channel":"trades"}"#, &channels);
        assert_eq!(reply["type"], "error");
        assert!(channels.read().is_empty());
    }
}

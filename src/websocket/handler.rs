//! WebSocket handler
//!
//! Handles WebSocket upgrade requests and the connection lifecycle. Each
//! connection owns its subscription: inbound `{"subscribe": [...]}` frames
//! replace the set; malformed frames are logged and ignored without
//! touching the existing subscription or closing the connection.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::ConnectionHub;
use super::messages::SubscribeRequest;
use crate::api::AppState;

/// WebSocket upgrade handler for `GET /ws`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.hub);
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Drive an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>) {
    let (mut sender, mut receiver) = socket.split();

    // Bounded channel: the hub drops envelopes instead of waiting when
    // this connection cannot keep up
    let (tx, mut rx) = mpsc::channel::<String>(hub.send_buffer());

    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting WebSocket connection");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let conn_id_for_send = connection_id.clone();

    // Forward envelopes from the hub to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let hub_for_recv = Arc::clone(&hub);
    let conn_id_for_recv = connection_id.clone();

    // Handle inbound subscription requests
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&hub_for_recv, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    hub.unregister(&connection_id).await;
}

/// Handle one received frame
///
/// Returns false when the connection should close.
async fn handle_ws_message(hub: &Arc<ConnectionHub>, connection_id: &str, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            match serde_json::from_str::<SubscribeRequest>(&text) {
                Ok(request) => {
                    let keys = request.key_set();
                    if let Err(e) = hub.set_subscription(connection_id, keys).await {
                        tracing::warn!(
                            connection_id = %connection_id,
                            error = %e,
                            "Subscription update failed"
                        );
                    }
                }
                Err(e) => {
                    // Prior subscription stays in effect
                    tracing::warn!(
                        connection_id = %connection_id,
                        error = %e,
                        text = %text,
                        "Ignoring malformed subscription request"
                    );
                }
            }
            true
        }
        Message::Binary(_) => {
            tracing::warn!(
                connection_id = %connection_id,
                "Ignoring binary frame from subscriber"
            );
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::hub::HubConfig;

    #[tokio::test]
    async fn test_malformed_frame_preserves_subscription() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx, _rx) = mpsc::channel(8);
        let id = hub.register(tx).await.unwrap();

        let keep_open = handle_ws_message(
            &hub,
            &id,
            Message::Text(r#"{"subscribe": ["42"]}"#.to_string()),
        )
        .await;
        assert!(keep_open);
        assert!(hub.is_subscribed(&id, "42").await);

        // Non-array, non-JSON, and unrelated payloads all leave the
        // subscription alone and keep the connection open
        for bad in [r#"{"subscribe": "42"}"#, "not json", r#"{"hello": 1}"#] {
            let keep_open = handle_ws_message(&hub, &id, Message::Text(bad.to_string())).await;
            assert!(keep_open);
            assert!(hub.is_subscribed(&id, "42").await);
        }
    }

    #[tokio::test]
    async fn test_close_frame_ends_connection() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx, _rx) = mpsc::channel(8);
        let id = hub.register(tx).await.unwrap();

        let keep_open = handle_ws_message(&hub, &id, Message::Close(None)).await;
        assert!(!keep_open);
    }
}

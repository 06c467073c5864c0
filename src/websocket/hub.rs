//! WebSocket connection hub
//!
//! Owns the subscription registry and the broadcast path. Each connection
//! gets a bounded mpsc channel; delivery to one connection can neither
//! block the ingest pipeline nor starve another connection. A connection
//! whose buffer is full simply misses that envelope; a connection whose
//! channel is closed is removed.
//!
//! Subscription sets are immutable `Arc<HashSet>` values swapped whole, so
//! the broadcaster never observes a half-updated set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::Envelope;
use crate::telemetry::message::DecodedMessage;

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Per-connection outbound buffer (envelopes)
    pub send_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 256,
            send_buffer: 64,
        }
    }
}

/// Handle for one registered connection
struct ConnectionHandle {
    /// Bounded channel feeding the connection's send task
    sender: mpsc::Sender<String>,
    /// Current subscription set, replaced atomically on every subscribe
    subscriptions: Arc<HashSet<String>>,
}

/// Manages subscriber connections and broadcasts envelopes to them
pub struct ConnectionHub {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    config: HubConfig,
}

impl ConnectionHub {
    /// Create a new hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Per-connection outbound buffer size
    pub fn send_buffer(&self) -> usize {
        self.config.send_buffer
    }

    /// Register a new connection
    ///
    /// The connection starts with an empty subscription set and receives
    /// nothing until it subscribes.
    pub async fn register(&self, sender: mpsc::Sender<String>) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                subscriptions: Arc::new(HashSet::new()),
            },
        );

        tracing::info!(connection_id = %id, "Subscriber connected");
        Ok(id)
    }

    /// Remove a connection and its subscription
    pub async fn unregister(&self, id: &str) {
        if self.connections.write().await.remove(id).is_some() {
            tracing::info!(connection_id = %id, "Subscriber disconnected");
        }
    }

    /// Replace the connection's subscription set
    ///
    /// The previous set is discarded whole; there is no incremental
    /// add/remove.
    pub async fn set_subscription(
        &self,
        id: &str,
        keys: HashSet<String>,
    ) -> Result<(), HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        tracing::debug!(connection_id = %id, keys = ?keys, "Subscription replaced");
        handle.subscriptions = Arc::new(keys);
        Ok(())
    }

    /// Whether a connection currently subscribes to a key
    pub async fn is_subscribed(&self, id: &str, key: &str) -> bool {
        self.connections
            .read()
            .await
            .get(id)
            .map(|h| h.subscriptions.contains(key))
            .unwrap_or(false)
    }

    /// Broadcast a decoded message to every matching subscriber
    ///
    /// Serializes the envelope once, then delivers independently per
    /// connection: a full buffer drops the envelope for that connection
    /// only, a closed channel removes the connection. Returns the number
    /// of successful deliveries.
    pub async fn publish(&self, message: &DecodedMessage) -> usize {
        let key = message.key.as_subscription_key();
        let text = match serde_json::to_string(&Envelope::from_message(message)) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast envelope");
                return 0;
            }
        };

        let mut delivered = 0;
        let mut closed: Vec<ConnectionId> = Vec::new();

        {
            let connections = self.connections.read().await;
            for (id, handle) in connections.iter() {
                if !handle.subscriptions.contains(&key) {
                    continue;
                }
                match handle.sender.try_send(text.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::debug!(
                            connection_id = %id,
                            key = %key,
                            "Subscriber buffer full, envelope dropped"
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        closed.push(id.clone());
                    }
                }
            }
        }

        for id in closed {
            self.unregister(&id).await;
        }

        delivered
    }

    /// Number of open connections
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed_message(key: u32) -> DecodedMessage {
        DecodedMessage::new(key, "TEST").field("value", 1i64)
    }

    fn keys(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::default();
        let (tx, _rx) = mpsc::channel(8);

        let id = hub.register(tx).await.unwrap();
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig {
            max_connections: 1,
            send_buffer: 8,
        });

        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);

        hub.register(tx1).await.unwrap();
        let result = hub.register(tx2).await;
        assert!(matches!(result, Err(HubError::TooManyConnections(1))));
    }

    #[tokio::test]
    async fn test_subscription_replace_semantics() {
        let hub = ConnectionHub::default();
        let (tx, mut rx) = mpsc::channel(8);
        let id = hub.register(tx).await.unwrap();

        hub.set_subscription(&id, keys(&["42"])).await.unwrap();
        assert!(hub.is_subscribed(&id, "42").await);

        // A new subscribe fully replaces the prior set
        hub.set_subscription(&id, keys(&["265"])).await.unwrap();
        assert!(!hub.is_subscribed(&id, "42").await);
        assert!(hub.is_subscribed(&id, "265").await);

        assert_eq!(hub.publish(&keyed_message(42)).await, 0);
        assert_eq!(hub.publish(&keyed_message(265)).await, 1);

        let text = rx.recv().await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["msgid"], "265");
    }

    #[tokio::test]
    async fn test_unsubscribed_connection_receives_nothing() {
        let hub = ConnectionHub::default();
        let (tx, mut rx) = mpsc::channel(8);
        hub.register(tx).await.unwrap();

        assert_eq!(hub.publish(&keyed_message(42)).await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_subscriber_does_not_block_healthy_one() {
        let hub = ConnectionHub::default();

        // Slow: capacity 1, never drained
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let slow_id = hub.register(slow_tx).await.unwrap();
        hub.set_subscription(&slow_id, keys(&["42"])).await.unwrap();

        // Healthy subscriber to the same key
        let (ok_tx, mut ok_rx) = mpsc::channel(8);
        let ok_id = hub.register(ok_tx).await.unwrap();
        hub.set_subscription(&ok_id, keys(&["42"])).await.unwrap();

        // First publish fills the slow buffer; both deliver
        assert_eq!(hub.publish(&keyed_message(42)).await, 2);
        // Second publish drops on the slow connection, healthy still gets it
        assert_eq!(hub.publish(&keyed_message(42)).await, 1);

        assert!(ok_rx.recv().await.is_some());
        assert!(ok_rx.recv().await.is_some());
        assert_eq!(hub.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_closed_connection_removed_on_publish() {
        let hub = ConnectionHub::default();
        let (tx, rx) = mpsc::channel(8);
        let id = hub.register(tx).await.unwrap();
        hub.set_subscription(&id, keys(&["42"])).await.unwrap();

        drop(rx);
        assert_eq!(hub.publish(&keyed_message(42)).await, 0);
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_set_subscription_unknown_connection() {
        let hub = ConnectionHub::default();
        let result = hub.set_subscription("nope", keys(&["42"])).await;
        assert!(matches!(result, Err(HubError::ConnectionNotFound)));
    }
}

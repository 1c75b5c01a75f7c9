use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::models::FetchAudit;
use crate::tree::{TreeEvent, TreeObserver};

/// Event types the hub emits outside the configuration tree
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DeviceFetch,
}

/// WebSocket event message
#[derive(Debug, Clone, Serialize)]
pub struct Event<T: Serialize> {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: T,
}

/// WebSocket hub manages connections and broadcasts events.
///
/// Sending never waits, so the hub can observe the configuration tree
/// directly from inside engine calls.
pub struct Hub {
    tx: broadcast::Sender<String>,
    client_count: AtomicUsize,
}

impl Hub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            client_count: AtomicUsize::new(0),
        }
    }

    /// Serialize and send to every connected client; no-op without clients.
    /// Returns the number of receivers the message reached.
    fn send<T: Serialize>(&self, label: &str, message: &T) -> usize {
        let count = self.client_count();
        if count == 0 {
            return 0;
        }

        let data = match serde_json::to_string(message) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Error serializing WebSocket event {}: {}", label, e);
                return 0;
            }
        };

        match self.tx.send(data) {
            Ok(receivers) => {
                tracing::debug!("Broadcasting {} to {} clients", label, receivers);
                receivers
            }
            Err(e) => {
                tracing::warn!("Error broadcasting WebSocket event {}: {}", label, e);
                0
            }
        }
    }

    /// Broadcast the outcome of a device configuration fetch
    pub fn broadcast_device_fetch(&self, audit: &FetchAudit) -> usize {
        self.send(
            "device_fetch",
            &Event {
                event_type: EventType::DeviceFetch,
                payload: audit,
            },
        )
    }

    /// Get the number of connected clients
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }

    /// Subscribe to events
    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    fn increment_clients(&self) {
        let count = self.client_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("WebSocket client connected. Total clients: {}", count);
    }

    fn decrement_clients(&self) {
        let previous = self
            .client_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        tracing::info!(
            "WebSocket client disconnected. Total clients: {}",
            previous.saturating_sub(1)
        );
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeObserver for Hub {
    fn on_event(&self, event: &TreeEvent) {
        self.send(event.name(), event);
    }
}

/// WebSocket handler for axum
pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<Hub>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before counting so no event is sent into an empty channel
    let mut rx = hub.subscribe();
    hub.increment_clients();

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("WebSocket client lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Drain client messages to notice disconnects
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            if msg.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    hub.decrement_clients();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfigGroup, ScopeKind, ScopeRef};
    use chrono::Utc;

    #[test]
    fn test_no_clients_is_noop() {
        let hub = Hub::new();
        let group = ConfigGroup::new_root(&ScopeRef::new(ScopeKind::Site, "s1"), "account", None);
        hub.on_event(&TreeEvent::GroupCreated(group));
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn test_tree_event_reaches_subscriber() {
        let hub = Hub::new();
        let mut rx = hub.subscribe();
        hub.increment_clients();

        let group = ConfigGroup::new_root(&ScopeRef::global(), "account", None);
        hub.on_event(&TreeEvent::GroupPublished(group));

        let msg: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(msg["type"], "group_published");
        assert_eq!(msg["payload"]["name"], "account");

        hub.decrement_clients();
        hub.decrement_clients();
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn test_device_fetch_event_shape() {
        let hub = Hub::new();
        let mut rx = hub.subscribe();
        hub.increment_clients();

        let audit = FetchAudit {
            id: "a1".to_string(),
            device_id: "d1".to_string(),
            success: false,
            state_string: "incorrect_password".to_string(),
            remark: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(hub.broadcast_device_fetch(&audit), 1);

        let msg: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(msg["type"], "device_fetch");
        assert_eq!(msg["payload"]["state_string"], "incorrect_password");
    }
}

//! # Connection Manager
//!
//! The single authority over live client connections. It owns the connection
//! set and implements handshake, inbound message handling, broadcast, targeted
//! send, heartbeat and shutdown.
//!
//! ## Core Design Principles:
//!
//! 1.  **Transport Agnostic**: The manager never touches a socket. Each connection
//!     gets an unbounded MPSC channel of [`Outbound`] commands; the transport task
//!     (e.g. an axum WebSocket handler) drains it and reports inbound events back
//!     through `on_message`, `on_pong`, `on_close` and `on_error`.
//!
//! 2.  **Serialize Once, Share Everywhere**: A broadcast serializes its envelope
//!     a single time into an `Arc<str>`. Every connection receives a new `Arc`
//!     pointer to the *same* text.
//!
//! 3.  **Broadcast as a Unit**: The connection map lock is held for the whole
//!     fan-out. Sends on an unbounded channel never block, so a slow socket only
//!     delays its own transport task. A connection accepted while a broadcast runs
//!     simply waits for the next one.
//!
//! 4.  **Failure Isolation**: A send that fails (receiver dropped) marks that
//!     connection for removal after the loop; it never aborts delivery to the
//!     others. Malformed inbound payloads are answered on the offending
//!     connection only.
//!
//! 5.  **Half-Open Detection**: The heartbeat marks every connection presumed
//!     dead and sends a transport ping. The pong flips it back to alive. Anything
//!     still presumed dead at the next sweep is closed and removed.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::configs::MIN_REFRESH_INTERVAL;
use crate::error::HubError;
use crate::protocol::{ClientMessage, Envelope, EVENT_CONNECTION, EVENT_ECHO, EVENT_PONG};

/// Close code sent on server shutdown ("going away").
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Close code sent when the heartbeat gives up on a connection.
pub const CLOSE_HEARTBEAT_TIMEOUT: u16 = 4000;

/// Unique, time-ordered connection identifier (UUID v7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClientId(Uuid);

impl ClientId {
    fn generate() -> Self {
        ClientId(Uuid::now_v7())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client_{}", self.0.simple())
    }
}

/// Lifecycle of a connection. Only `Open` connections receive broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Commands for a connection's transport task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// A serialized envelope to write as a text frame.
    Text(Arc<str>),
    /// A transport-level liveness probe.
    Ping,
    /// Close the transport with this code and reason, then stop.
    Close { code: u16, reason: String },
}

/// Internal representation of one connected client.
struct ConnectionHandle {
    state: ConnectionState,
    /// Cleared by each heartbeat sweep, set again by a pong.
    alive: bool,
    sender: mpsc::UnboundedSender<Outbound>,
    connected_at: DateTime<Utc>,
}

/// Owns the live connection set.
pub struct ConnectionManager {
    connections: Mutex<BTreeMap<ClientId, ConnectionHandle>>,
    heartbeat_interval: Duration,
    heartbeat_token: CancellationToken,
}

impl ConnectionManager {
    /// Creates an empty manager. The heartbeat does not run until `start_heartbeat`.
    /// Intervals below `MIN_REFRESH_INTERVAL` are raised to it.
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            connections: Mutex::new(BTreeMap::new()),
            heartbeat_interval: heartbeat_interval.max(MIN_REFRESH_INTERVAL),
            heartbeat_token: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ClientId, ConnectionHandle>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// # Accept
    ///
    /// Registers a freshly upgraded transport.
    ///
    /// A new identifier is generated, the connection is inserted as `Connecting`,
    /// the one-time welcome (`event=connection`, `data.clientId`) is queued and the
    /// connection becomes `Open`. All of it happens under one lock acquisition, so
    /// concurrent handshakes cannot interleave.
    ///
    /// # Returns
    /// The identifier and the receiver the transport task must drain.
    pub fn accept(&self) -> (ClientId, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ClientId::generate();
        let welcome = Envelope::new(EVENT_CONNECTION, json!({ "clientId": id.to_string() }));

        let mut connections = self.lock();
        let mut handle = ConnectionHandle {
            state: ConnectionState::Connecting,
            alive: true,
            sender: tx,
            connected_at: Utc::now(),
        };
        if let Ok(text) = serde_json::to_string(&welcome) {
            let _ = handle.sender.send(Outbound::Text(text.into()));
        }
        handle.state = ConnectionState::Open;
        connections.insert(id, handle);
        let total = connections.len();
        drop(connections);

        log::info!("Client '{}' connected ({} live)", id, total);
        (id, rx)
    }

    /// # On Message
    ///
    /// Handles one inbound text payload.
    ///
    /// - `{ "type": "ping" }` is answered with `pong`.
    /// - Any other JSON object is acknowledged with `echo` carrying the received data.
    /// - Anything unparseable gets an `error` reply on this connection only.
    pub fn on_message(&self, id: ClientId, raw: &str) {
        let reply = match parse_client_message(raw) {
            Ok((msg, _)) if msg.is_ping() => Envelope::new(EVENT_PONG, json!({})),
            Ok((_, value)) => Envelope::new(EVENT_ECHO, json!({ "received": value })),
            Err(err) => {
                log::warn!("Client '{}' sent a malformed message: {}", id, err);
                Envelope::error("Invalid message format", Some(err.to_string()))
            }
        };
        if let Err(err) = self.send_to(id, &reply) {
            log::debug!("Reply to '{}' dropped: {}", id, err);
        }
    }

    /// Transport-level pong: the connection is alive.
    pub fn on_pong(&self, id: ClientId) {
        if let Some(handle) = self.lock().get_mut(&id) {
            handle.alive = true;
        }
    }

    /// # On Close
    ///
    /// Removes the connection. Idempotent: removing an unknown or already removed
    /// id is a no-op.
    ///
    /// # Returns
    /// `true` if a connection was actually removed.
    pub fn on_close(&self, id: ClientId) -> bool {
        let removed = self.lock().remove(&id);
        match removed {
            Some(mut handle) => {
                handle.state = ConnectionState::Closed;
                let lifetime = Utc::now() - handle.connected_at;
                log::info!("Client '{}' disconnected after {}s", id, lifetime.num_seconds());
                true
            }
            None => false,
        }
    }

    /// Transport error: same as a close, with the cause logged.
    pub fn on_error(&self, id: ClientId, error: &str) -> bool {
        log::warn!("Client '{}' transport error: {}", id, error);
        self.on_close(id)
    }

    /// # Broadcast
    ///
    /// Serializes `envelope` once and queues it for every `Open` connection in id
    /// (accept) order. Connections whose channel is gone are removed after the
    /// loop.
    ///
    /// # Returns
    /// The number of successful deliveries.
    pub fn broadcast(&self, envelope: &Envelope) -> Result<usize, HubError> {
        let text: Arc<str> = serde_json::to_string(envelope)?.into();

        let mut connections = self.lock();
        let mut delivered = 0;
        let mut failed = Vec::new();

        for (id, handle) in connections.iter() {
            if handle.state != ConnectionState::Open {
                continue;
            }
            match handle.sender.send(Outbound::Text(Arc::clone(&text))) {
                Ok(()) => delivered += 1,
                Err(_) => failed.push(*id),
            }
        }

        for id in &failed {
            connections.remove(id);
            log::info!("Client '{}' unreachable during broadcast. Removed.", id);
        }
        drop(connections);

        log::debug!(
            "Broadcast '{}' delivered to {} client(s), {} dropped",
            envelope.event,
            delivered,
            failed.len()
        );
        Ok(delivered)
    }

    /// # Send To
    ///
    /// Targeted delivery to one connection.
    ///
    /// # Errors
    /// `HubError::ConnectionNotFound` if the id is not in the live set (or its
    /// transport is already gone, in which case it is removed).
    pub fn send_to(&self, id: ClientId, envelope: &Envelope) -> Result<(), HubError> {
        let text: Arc<str> = serde_json::to_string(envelope)?.into();
        let mut connections = self.lock();

        let sent = match connections.get(&id) {
            Some(handle) => handle.sender.send(Outbound::Text(text)).is_ok(),
            None => return Err(HubError::ConnectionNotFound(id)),
        };
        if !sent {
            connections.remove(&id);
            return Err(HubError::ConnectionNotFound(id));
        }
        Ok(())
    }

    /// Number of connections in the live set.
    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    /// Ids of the live set in accept order.
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.lock().keys().copied().collect()
    }

    /// # Heartbeat Sweep
    ///
    /// One heartbeat step:
    /// 1.  Connections still presumed dead since the previous sweep are sent a
    ///     close and removed.
    /// 2.  Every remaining connection is marked presumed dead and pinged.
    ///
    /// # Returns
    /// The number of connections removed by this sweep.
    pub fn heartbeat_sweep(&self) -> usize {
        let mut connections = self.lock();

        let dead: Vec<ClientId> = connections
            .iter()
            .filter(|(_, h)| !h.alive)
            .map(|(id, _)| *id)
            .collect();

        for id in &dead {
            if let Some(mut handle) = connections.remove(id) {
                handle.state = ConnectionState::Closing;
                let _ = handle.sender.send(Outbound::Close {
                    code: CLOSE_HEARTBEAT_TIMEOUT,
                    reason: "heartbeat timeout".to_string(),
                });
                log::warn!("Client '{}' missed the heartbeat. Terminated.", id);
            }
        }

        let mut unreachable = Vec::new();
        for (id, handle) in connections.iter_mut() {
            handle.alive = false;
            if handle.sender.send(Outbound::Ping).is_err() {
                unreachable.push(*id);
            }
        }
        for id in &unreachable {
            connections.remove(id);
        }

        dead.len() + unreachable.len()
    }

    /// Spawns the recurring heartbeat. The first sweep runs one interval after start.
    pub fn start_heartbeat(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let token = self.heartbeat_token.clone();
        let period = self.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            log::info!("Heartbeat started ({}s interval)", period.as_secs());
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        log::debug!("Heartbeat stopped.");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = manager.heartbeat_sweep();
                        if removed > 0 {
                            log::info!("Heartbeat removed {} connection(s)", removed);
                        }
                    }
                }
            }
        })
    }

    /// # Shutdown
    ///
    /// Stops the heartbeat, sends a close to every live connection and clears the
    /// set. Meant to be called once at process termination.
    pub fn shutdown(&self) {
        self.heartbeat_token.cancel();

        let mut connections = self.lock();
        let total = connections.len();
        for (_, mut handle) in std::mem::take(&mut *connections) {
            handle.state = ConnectionState::Closing;
            let _ = handle.sender.send(Outbound::Close {
                code: CLOSE_GOING_AWAY,
                reason: "server shutting down".to_string(),
            });
        }
        log::info!("Connection manager shut down, {} client(s) notified", total);
    }
}

fn parse_client_message(raw: &str) -> Result<(ClientMessage, serde_json::Value), HubError> {
    let malformed = |e: serde_json::Error| HubError::MalformedMessage(e.to_string());
    let value: serde_json::Value = serde_json::from_str(raw).map_err(malformed)?;
    let msg = ClientMessage::deserialize(&value).map_err(malformed)?;
    Ok((msg, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(Duration::from_secs(30))
    }

    fn next_envelope(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Envelope {
        match rx.try_recv().expect("expected an outbound message") {
            Outbound::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_accept_sends_welcome_and_counts() {
        let mgr = manager();
        let (id, mut rx) = mgr.accept();
        assert_eq!(mgr.connection_count(), 1);

        let welcome = next_envelope(&mut rx);
        assert_eq!(welcome.event, "connection");
        assert_eq!(welcome.data["clientId"], Value::String(id.to_string()));
    }

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let mgr = manager();
        let ids: Vec<_> = (0..50).map(|_| mgr.accept().0).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 50);
        assert_eq!(mgr.client_ids(), sorted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_accepts() {
        let mgr = Arc::new(manager());
        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let mgr = Arc::clone(&mgr);
                tokio::spawn(async move { mgr.accept() })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            let (id, mut rx) = task.await.unwrap();
            let welcome = next_envelope(&mut rx);
            assert_eq!(welcome.event, "connection");
            assert_eq!(welcome.data["clientId"], Value::String(id.to_string()));
            assert!(rx.try_recv().is_err());
            ids.push(id);
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 64);
        assert_eq!(mgr.connection_count(), 64);
        assert_eq!(mgr.client_ids(), ids);
    }

    #[test]
    fn test_double_close_counts_once() {
        let mgr = manager();
        let (id, _rx) = mgr.accept();
        let (_other, _rx2) = mgr.accept();
        assert_eq!(mgr.connection_count(), 2);

        assert!(mgr.on_close(id));
        assert_eq!(mgr.connection_count(), 1);
        assert!(!mgr.on_close(id));
        assert!(!mgr.on_error(id, "late error"));
        assert_eq!(mgr.connection_count(), 1);
    }

    #[test]
    fn test_ping_gets_pong_and_other_gets_echo() {
        let mgr = manager();
        let (id, mut rx) = mgr.accept();
        next_envelope(&mut rx);

        mgr.on_message(id, r#"{"type":"ping"}"#);
        assert_eq!(next_envelope(&mut rx).event, "pong");

        mgr.on_message(id, r#"{"type":"refresh","x":1}"#);
        let echo = next_envelope(&mut rx);
        assert_eq!(echo.event, "echo");
        assert_eq!(echo.data["received"]["x"], 1);
    }

    #[test]
    fn test_malformed_message_only_affects_sender() {
        let mgr = manager();
        let (bad, mut bad_rx) = mgr.accept();
        let (_good, mut good_rx) = mgr.accept();
        next_envelope(&mut bad_rx);
        next_envelope(&mut good_rx);

        mgr.on_message(bad, "{not json");
        let reply = next_envelope(&mut bad_rx);
        assert_eq!(reply.event, "error");
        assert_eq!(reply.data["message"], "Invalid message format");
        assert!(reply.data["error"].as_str().unwrap().starts_with("malformed message:"));

        assert!(good_rx.try_recv().is_err());
        assert_eq!(mgr.connection_count(), 2);
    }

    #[test]
    fn test_broadcast_skips_and_removes_dead_receivers() {
        let mgr = manager();
        let (_a, mut rx_a) = mgr.accept();
        let (_b, rx_b) = mgr.accept();
        let (_c, mut rx_c) = mgr.accept();
        drop(rx_b);

        let delivered = mgr.broadcast(&Envelope::new("dashboard:update", json!({"n": 1}))).unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(mgr.connection_count(), 2);

        next_envelope(&mut rx_a);
        next_envelope(&mut rx_c);
        assert_eq!(next_envelope(&mut rx_a).data["n"], 1);
        assert_eq!(next_envelope(&mut rx_c).data["n"], 1);
    }

    #[test]
    fn test_broadcast_shares_one_serialization() {
        let mgr = manager();
        let (_a, mut rx_a) = mgr.accept();
        let (_b, mut rx_b) = mgr.accept();
        rx_a.try_recv().unwrap();
        rx_b.try_recv().unwrap();

        mgr.broadcast(&Envelope::new("dashboard:update", json!({}))).unwrap();
        let (Outbound::Text(a), Outbound::Text(b)) = (rx_a.try_recv().unwrap(), rx_b.try_recv().unwrap()) else {
            panic!("expected text frames");
        };
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_send_to_unknown_id() {
        let mgr = manager();
        let (id, _rx) = mgr.accept();
        mgr.on_close(id);
        let err = mgr.send_to(id, &Envelope::new("echo", json!({}))).unwrap_err();
        assert!(matches!(err, HubError::ConnectionNotFound(x) if x == id));
    }

    #[test]
    fn test_heartbeat_removes_silent_connection_after_two_sweeps() {
        let mgr = manager();
        let (silent, mut silent_rx) = mgr.accept();
        let (healthy, mut healthy_rx) = mgr.accept();
        silent_rx.try_recv().unwrap();
        healthy_rx.try_recv().unwrap();

        assert_eq!(mgr.heartbeat_sweep(), 0);
        assert_eq!(silent_rx.try_recv().unwrap(), Outbound::Ping);
        assert_eq!(healthy_rx.try_recv().unwrap(), Outbound::Ping);

        mgr.on_pong(healthy);
        assert_eq!(mgr.heartbeat_sweep(), 1);

        assert_eq!(mgr.client_ids(), vec![healthy]);
        assert!(matches!(
            silent_rx.try_recv().unwrap(),
            Outbound::Close { code: CLOSE_HEARTBEAT_TIMEOUT, .. }
        ));
        assert!(!mgr.on_close(silent));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_task_runs_on_interval() {
        let mgr = Arc::new(manager());
        let (_id, mut rx) = mgr.accept();
        rx.try_recv().unwrap();

        let handle = mgr.start_heartbeat();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(rx.recv().await, Some(Outbound::Ping));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(mgr.connection_count(), 0);

        mgr.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_heartbeat_interval_is_raised() {
        let mgr = Arc::new(ConnectionManager::new(Duration::ZERO));
        let (_id, mut rx) = mgr.accept();
        rx.try_recv().unwrap();

        let handle = mgr.start_heartbeat();
        tokio::time::sleep(MIN_REFRESH_INTERVAL + Duration::from_millis(10)).await;
        assert_eq!(rx.recv().await, Some(Outbound::Ping));
        assert!(!handle.is_finished());

        mgr.shutdown();
        handle.await.unwrap();
    }

    #[test]
    fn test_shutdown_notifies_and_clears() {
        let mgr = manager();
        let (_a, mut rx_a) = mgr.accept();
        rx_a.try_recv().unwrap();

        mgr.shutdown();
        assert_eq!(mgr.connection_count(), 0);
        assert!(matches!(rx_a.try_recv().unwrap(), Outbound::Close { code: CLOSE_GOING_AWAY, .. }));
    }
}

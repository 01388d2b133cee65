//! Connection manager
//!
//! Owns at most one live channel per process. Connecting authenticates with
//! the current session token (carried in the handshake frame, not in
//! business messages) and spawns a read task that routes acks to pending
//! requests and push frames to the listener registry. There is no automatic
//! reconnect on transient drops: the session lifecycle and the
//! restaurant-switch orchestrator decide when to reconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use shared::message::{BusMessage, EventType, HandshakePayload, PushPayload, PROTOCOL_VERSION};

use crate::error::ClientError;
use crate::listeners::ListenerRegistry;
use crate::transport::{ClientTransport, MemoryTransport, TcpTransport};

/// Produces a fresh transport for each connection attempt
#[async_trait]
pub trait Connector: Send + Sync {
    async fn dial(&self) -> Result<ClientTransport, ClientError>;
}

/// Dials the backend's event channel over TCP
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn dial(&self) -> Result<ClientTransport, ClientError> {
        let transport = TcpTransport::connect(&self.addr).await?;
        Ok(ClientTransport::Tcp(transport))
    }
}

/// In-process connector over broadcast channels (tests)
pub struct MemoryConnector {
    server_tx: broadcast::Sender<BusMessage>,
    client_tx: broadcast::Sender<BusMessage>,
}

impl MemoryConnector {
    pub fn new(
        server_tx: broadcast::Sender<BusMessage>,
        client_tx: broadcast::Sender<BusMessage>,
    ) -> Self {
        Self {
            server_tx,
            client_tx,
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn dial(&self) -> Result<ClientTransport, ClientError> {
        Ok(ClientTransport::Memory(MemoryTransport::new(
            &self.server_tx,
            &self.client_tx,
        )))
    }
}

struct ConnectionInner {
    live: AtomicBool,
    /// Incremented for every connect/disconnect. A reader snapshots the
    /// value at spawn and may only tear shared state down while it still
    /// matches; generation changes and reader teardown both serialize on
    /// the pending lock.
    generation: AtomicU64,
    transport: Mutex<Option<ClientTransport>>,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<BusMessage>>>,
    listeners: ListenerRegistry,
    reader: Mutex<Option<JoinHandle<()>>>,
}

/// Connection manager for the bidirectional event channel
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    client_name: String,
    inner: Arc<ConnectionInner>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, client_name: impl Into<String>) -> Self {
        Self {
            connector,
            client_name: client_name.into(),
            inner: Arc::new(ConnectionInner {
                live: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                transport: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                listeners: ListenerRegistry::new(),
                reader: Mutex::new(None),
            }),
        }
    }

    /// Establish the channel, authenticated with `token`.
    ///
    /// If a connection is already live it is torn down first; there is at
    /// most one live channel per process.
    pub async fn connect(&self, token: &str) -> Result<(), ClientError> {
        if self.is_live() {
            tracing::debug!("connect() while live, tearing down previous channel");
            self.disconnect().await;
        }

        let transport = self.connector.dial().await?;

        // First frame carries the token as the connection-level auth header
        let handshake = HandshakePayload {
            version: PROTOCOL_VERSION,
            authentication: token.to_string(),
            client_name: Some(self.client_name.clone()),
            client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        };
        transport
            .write_message(&BusMessage::handshake(&handshake))
            .await?;

        // Stamp this connection. The bump is done under the pending lock so
        // it cannot interleave with a stale reader's teardown check.
        let generation = {
            let _pending = self.inner.pending.lock().unwrap();
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        *self.inner.transport.lock().unwrap() = Some(transport.clone());
        self.inner.live.store(true, Ordering::SeqCst);

        // Spawn background task to dispatch incoming frames
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            loop {
                match transport.read_message().await {
                    Ok(msg) => {
                        // 1. Acks resolve the matching pending request. A late
                        //    ack whose entry was already removed by a timeout
                        //    is dropped here.
                        if let Some(correlation_id) = msg.correlation_id {
                            let tx = inner.pending.lock().unwrap().remove(&correlation_id);
                            match tx {
                                Some(tx) => {
                                    let _ = tx.send(msg);
                                }
                                None => {
                                    tracing::debug!(%correlation_id, "Dropping unmatched ack");
                                }
                            }
                            continue;
                        }

                        // 2. Pushes dispatch to the registry in arrival order
                        if msg.event_type == EventType::Push {
                            match msg.parse_payload::<PushPayload>() {
                                Ok(payload) => inner.listeners.dispatch(&payload),
                                Err(e) => {
                                    tracing::warn!(error = %e, "Malformed push payload")
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Transport read error: {}", e);
                        break;
                    }
                }
            }
            // Only the reader of the current connection may tear state down.
            // A reader that died while a reconnect raced ahead of it finds a
            // newer generation here and leaves the fresh channel alone.
            let mut pending = inner.pending.lock().unwrap();
            if inner.generation.load(Ordering::SeqCst) == generation {
                inner.live.store(false, Ordering::SeqCst);
                // Dropping the senders makes in-flight emits observe NotConnected
                pending.clear();
            }
        });
        *self.inner.reader.lock().unwrap() = Some(handle);

        tracing::info!("Event channel connected");
        Ok(())
    }

    /// Close the channel. Idempotent.
    pub async fn disconnect(&self) {
        let transport = self.inner.transport.lock().unwrap().take();
        if let Some(transport) = transport {
            let _ = transport.close().await;
        }
        if let Some(handle) = self.inner.reader.lock().unwrap().take() {
            handle.abort();
        }
        // Invalidate the reader's generation before clearing, so an epilogue
        // the abort could not reach (already past its loop) becomes a no-op
        {
            let mut pending = self.inner.pending.lock().unwrap();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            self.inner.live.store(false, Ordering::SeqCst);
            pending.clear();
        }
        tracing::info!("Event channel disconnected");
    }

    /// Whether the channel is currently live
    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// The push-event listener registry of this connection
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.inner.listeners
    }

    /// Send a frame, failing fast when the channel is down
    pub(crate) async fn send(&self, msg: &BusMessage) -> Result<(), ClientError> {
        let transport = {
            let guard = self.inner.transport.lock().unwrap();
            guard.clone()
        };
        match transport {
            Some(transport) if self.is_live() => transport.write_message(msg).await,
            _ => Err(ClientError::NotConnected),
        }
    }

    pub(crate) fn register_pending(&self, request_id: Uuid, tx: oneshot::Sender<BusMessage>) {
        self.inner.pending.lock().unwrap().insert(request_id, tx);
    }

    pub(crate) fn remove_pending(&self, request_id: &Uuid) {
        self.inner.pending.lock().unwrap().remove(request_id);
    }
}

//! Event emitter
//!
//! Sends a typed command over the channel and resolves exactly once with
//! success, rejection or timeout. Correlation uses the frame's request id:
//! the emitter parks a oneshot sender in the connection's pending map and
//! the read task completes it when the matching ack arrives. On timeout the
//! entry is removed first, so a late ack can never produce a second
//! resolution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{oneshot, watch};

use shared::message::{AckPayload, BusMessage, CommandAction, CommandPayload};

use crate::connection::ConnectionManager;
use crate::error::ClientError;

/// Process-wide busy indicator
///
/// Raised while any command is in flight; screens use it as the cooperative
/// lock against issuing a second conflicting command for the same entity.
struct BusyFlag {
    depth: AtomicUsize,
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl BusyFlag {
    fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            depth: AtomicUsize::new(0),
            tx,
            rx,
        }
    }
}

/// Releases the busy indicator on every exit path, including timeout
struct BusyGuard {
    flag: Arc<BusyFlag>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<BusyFlag>) -> Self {
        if flag.depth.fetch_add(1, Ordering::SeqCst) == 0 {
            let _ = flag.tx.send(true);
        }
        Self { flag: flag.clone() }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if self.flag.depth.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.flag.tx.send(false);
        }
    }
}

/// Emits commands over the event channel and awaits their single ack
#[derive(Clone)]
pub struct EventEmitter {
    connection: ConnectionManager,
    default_timeout: Duration,
    busy: Arc<BusyFlag>,
}

impl EventEmitter {
    pub fn new(connection: ConnectionManager, default_timeout: Duration) -> Self {
        Self {
            connection,
            default_timeout,
            busy: Arc::new(BusyFlag::new()),
        }
    }

    /// Whether a command is currently in flight
    pub fn is_busy(&self) -> bool {
        *self.busy.rx.borrow()
    }

    /// Watch the busy indicator (for UI blocking)
    pub fn busy_watch(&self) -> watch::Receiver<bool> {
        self.busy.rx.clone()
    }

    /// Emit a command with the default timeout
    pub async fn emit(
        &self,
        action: CommandAction,
        params: Option<Value>,
    ) -> Result<Option<Value>, ClientError> {
        self.emit_with_timeout(action, params, self.default_timeout)
            .await
    }

    /// Emit a command and await its ack.
    ///
    /// Exactly one outcome per call: `Ok(data)` on a positive ack,
    /// `CommandRejected` on a negative one, `Timeout` when no ack lands in
    /// time, `NotConnected` when the channel is down (fail fast, no hang).
    /// There is no implicit retry; retrying is the caller's decision.
    pub async fn emit_with_timeout(
        &self,
        action: CommandAction,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Option<Value>, ClientError> {
        if !self.connection.is_live() {
            return Err(ClientError::NotConnected);
        }

        let _busy = BusyGuard::acquire(&self.busy);

        let msg = BusMessage::command(&CommandPayload { action, params });
        let request_id = msg.request_id;

        let (tx, rx) = oneshot::channel();
        self.connection.register_pending(request_id, tx);

        if let Err(e) = self.connection.send(&msg).await {
            self.connection.remove_pending(&request_id);
            return Err(e);
        }

        tracing::debug!(action = %action, %request_id, "Command sent");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(ack_msg)) => {
                let ack: AckPayload = ack_msg.parse_payload()?;
                if ack.ok {
                    Ok(ack.data)
                } else {
                    Err(ClientError::CommandRejected(
                        ack.msg.unwrap_or_else(|| "Command rejected".to_string()),
                    ))
                }
            }
            // Connection dropped while waiting; the read task cleared pending
            Ok(Err(_)) => Err(ClientError::NotConnected),
            Err(_) => {
                // Remove the entry first: the eventual late ack finds nothing
                // to resolve and is dropped by the read task.
                self.connection.remove_pending(&request_id);
                tracing::warn!(action = %action, %request_id, "Command timed out");
                Err(ClientError::Timeout)
            }
        }
    }
}

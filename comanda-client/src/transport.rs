//! Transport abstraction for the event channel
//!
//! Frame layout: event type (1 byte), request id (16 bytes),
//! correlation id (16 bytes, nil = none), payload length (4 bytes LE),
//! payload (JSON bytes).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::error::ClientError;
use shared::message::{BusMessage, EventType};

/// Transport abstraction for channel communication
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_message(&self) -> Result<BusMessage, ClientError>;
    async fn write_message(&self, msg: &BusMessage) -> Result<(), ClientError>;
    async fn close(&self) -> Result<(), ClientError>;
}

/// Concrete transport carried by a live connection
#[derive(Debug, Clone)]
pub enum ClientTransport {
    Tcp(TcpTransport),
    Memory(MemoryTransport),
}

impl ClientTransport {
    pub async fn read_message(&self) -> Result<BusMessage, ClientError> {
        match self {
            ClientTransport::Tcp(t) => t.read_message().await,
            ClientTransport::Memory(t) => t.read_message().await,
        }
    }

    pub async fn write_message(&self, msg: &BusMessage) -> Result<(), ClientError> {
        match self {
            ClientTransport::Tcp(t) => t.write_message(msg).await,
            ClientTransport::Memory(t) => t.write_message(msg).await,
        }
    }

    pub async fn close(&self) -> Result<(), ClientError> {
        match self {
            ClientTransport::Tcp(t) => t.close().await,
            ClientTransport::Memory(t) => t.close().await,
        }
    }
}

/// TCP Transport Implementation
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<OwnedReadHalf>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_message(&self) -> Result<BusMessage, ClientError> {
        let mut reader = self.reader.lock().await;

        // Read event type (1 byte)
        let mut type_buf = [0u8; 1];
        reader.read_exact(&mut type_buf).await?;

        let event_type = EventType::try_from(type_buf[0])
            .map_err(|_| ClientError::InvalidMessage("Invalid event type".into()))?;

        // Read Request ID (16 bytes)
        let mut uuid_buf = [0u8; 16];
        reader.read_exact(&mut uuid_buf).await?;
        let request_id = Uuid::from_bytes(uuid_buf);

        // Read Correlation ID (16 bytes)
        let mut correlation_buf = [0u8; 16];
        reader.read_exact(&mut correlation_buf).await?;
        let correlation_id_raw = Uuid::from_bytes(correlation_buf);
        let correlation_id = if correlation_id_raw.is_nil() {
            None
        } else {
            Some(correlation_id_raw)
        };

        // Read payload length (4 bytes)
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).await?;
        let len = u32::from_le_bytes(len_buf) as usize;

        // Read payload
        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload).await?;

        Ok(BusMessage {
            request_id,
            event_type,
            correlation_id,
            payload,
        })
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), ClientError> {
        let mut writer = self.writer.lock().await;
        let mut data = Vec::new();
        data.push(msg.event_type as u8);
        data.extend_from_slice(msg.request_id.as_bytes());

        // Write correlation_id (16 bytes, nil when absent)
        let correlation_bytes = msg.correlation_id.unwrap_or(Uuid::nil()).into_bytes();
        data.extend_from_slice(&correlation_bytes);

        data.extend_from_slice(&(msg.payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&msg.payload);

        writer.write_all(&data).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
        Ok(())
    }
}

/// Memory Transport Implementation (for in-process tests)
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    /// Receiver for messages FROM server (broadcasts)
    rx: Arc<Mutex<broadcast::Receiver<BusMessage>>>,
    /// Sender for messages TO server
    tx: broadcast::Sender<BusMessage>,
}

impl MemoryTransport {
    /// Create a new memory transport
    ///
    /// # Arguments
    /// * `server_tx` - The server's broadcast sender (to subscribe to updates)
    /// * `client_tx` - The channel to send messages TO the server
    pub fn new(server_tx: &broadcast::Sender<BusMessage>, client_tx: &broadcast::Sender<BusMessage>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(server_tx.subscribe())),
            tx: client_tx.clone(),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, ClientError> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .map_err(|e| ClientError::Connection(format!("Memory channel error: {}", e)))
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), ClientError> {
        self.tx
            .send(msg.clone())
            .map_err(|e| ClientError::Connection(format!("Failed to send to server: {}", e)))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

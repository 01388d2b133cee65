//! Comanda Client - realtime sync core for handheld POS clients
//!
//! Keeps every handheld's local state consistent with the shared backend:
//! one bidirectional channel per authenticated session, command/ack
//! correlation with timeout recovery, push-event reconciliation into the
//! domain stores, restaurant-scoped reference caches, and the orchestrated
//! restaurant switch.

pub mod commands;
pub mod config;
pub mod connection;
pub mod emitter;
pub mod error;
pub mod http;
pub mod listeners;
pub mod session;
pub mod store;
pub mod switch;
pub mod transport;

pub use commands::OrderCommands;
pub use config::ClientConfig;
pub use connection::{ConnectionManager, Connector, MemoryConnector, TcpConnector};
pub use emitter::EventEmitter;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, PosApi};
pub use listeners::{bind_order_events, ListenerRegistry, Subscription};
pub use session::{Session, SessionManager, SessionState};
pub use store::kv::{CredentialStore, FileStore, MemoryStore, ScopedStore};
pub use store::orders::OrdersStore;
pub use store::reference::{DraftStore, ReferenceCache};
pub use switch::RestaurantSwitcher;
pub use transport::{ClientTransport, MemoryTransport, TcpTransport, Transport};

// Re-export shared types for convenience
pub use shared::client::{AuthResponse, RestaurantInfo, UserInfo};
pub use shared::message::{BusMessage, CommandAction, EventType, PushEvent, PushPayload};

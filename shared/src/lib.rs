//! Shared types between the comanda backend and its handheld clients.
//!
//! Wire protocol messages, domain models and API DTOs live here so that
//! both sides agree on the exact serialized shape.

pub mod client;
pub mod message;
pub mod models;
pub mod response;
pub mod util;

pub use response::ApiResponse;

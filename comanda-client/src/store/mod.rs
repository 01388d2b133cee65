//! Domain stores and persistence
//!
//! Stores are explicitly constructed state containers, mutated only through
//! their own synchronous mutators. Screens read from stores, never from
//! emitter responses directly.

pub mod kv;
pub mod orders;
pub mod reference;

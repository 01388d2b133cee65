//! Dining Table Model

use serde::{Deserialize, Serialize};

/// A physical table in the restaurant floor plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiningTable {
    pub id: String,
    pub name: String,
    /// Zone/area label (e.g. "Terraza")
    pub zone: Option<String>,
    pub seats: i32,
}

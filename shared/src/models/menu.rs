//! Menu Model

use serde::{Deserialize, Serialize};

/// Menu category with its products
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuCategory {
    pub id: String,
    pub name: String,
    pub products: Vec<MenuProduct>,
}

/// Sellable product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuProduct {
    pub id: String,
    pub name: String,
    /// Price in currency unit
    pub price: f64,
    pub description: Option<String>,
    #[serde(default)]
    pub available: bool,
}

//! Client-related types shared between server and client
//!
//! Common request/response types used in API communication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export ApiResponse from response module
pub use crate::response::ApiResponse;

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Authentication payload returned by login, session renew and
/// restaurant switch. A valid identity always carries a restaurant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
    pub current_restaurant: RestaurantInfo,
}

/// User information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub role: String,
}

/// Restaurant (tenant) information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RestaurantInfo {
    pub id: String,
    pub name: String,
}

/// Restaurant switch request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchRestaurantRequest {
    pub restaurant_id: String,
}

// =============================================================================
// Report API DTOs
// =============================================================================

/// Historical orders query (read-only report endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersHistoryQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

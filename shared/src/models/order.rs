//! Order Model

use serde::{Deserialize, Serialize};

use crate::client::UserInfo;
use crate::models::table::DiningTable;

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether the kitchen workflow allows moving from `self` to `next`.
    ///
    /// PENDING -> IN_PROGRESS -> DELIVERED, with CANCELLED reachable from
    /// PENDING or IN_PROGRESS. The server is authoritative; clients use this
    /// to reject impossible transitions before emitting a command.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (InProgress, Delivered)
                | (Pending, Cancelled)
                | (InProgress, Cancelled)
        )
    }
}

/// A single line of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDetail {
    pub id: String,
    pub quantity: i32,
    /// Units already brought to the table; `0 <= qty_delivered <= quantity`
    pub qty_delivered: i32,
    /// Unit price in currency unit
    pub price: f64,
    pub description: String,
}

impl OrderDetail {
    /// Delivered-quantity invariant check.
    pub fn is_valid(&self) -> bool {
        self.qty_delivered >= 0 && self.qty_delivered <= self.quantity
    }
}

/// Order aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    /// Sequential order number shown on tickets
    pub num: i64,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub is_closed: bool,
    pub people: i32,
    pub notes: Option<String>,
    pub table: Option<DiningTable>,
    pub details: Vec<OrderDetail>,
    /// Total amount in currency unit
    pub total: f64,
    /// Waiter who opened the order
    pub owner: UserInfo,
}

impl Order {
    /// An order may only be closed once delivered and paid.
    pub fn can_close(&self) -> bool {
        self.status == OrderStatus::Delivered && self.is_paid
    }
}

// ==================== Command payloads ====================

/// Create order payload (`createOrder`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub table_id: Option<String>,
    pub people: i32,
    pub notes: Option<String>,
    pub details: Vec<OrderDetailCreate>,
}

/// New detail line inside a create-order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailCreate {
    pub product_id: String,
    pub quantity: i32,
    pub description: String,
}

/// Update order payload (`updateOrder`) — partial, server merges
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub people: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
}

/// Update detail payload (`updateOrderDetail`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailUpdate {
    pub order_id: String,
    pub detail_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty_delivered: Option<i32>,
}

/// Remove detail payload (`removeOrderDetail`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetailRemove {
    pub order_id: String,
    pub detail_id: String,
}

/// Create bill payload (`createBill`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillCreate {
    pub order_id: String,
    pub payment_method: String,
}

// ==================== Draft (client-local) ====================

/// In-progress order being composed on a handheld, before `createOrder`
/// is ever emitted. Restaurant-scoped transient state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderDraft {
    pub table_id: Option<String>,
    pub people: i32,
    pub notes: Option<String>,
    pub items: Vec<DraftItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftItem {
    pub product_id: String,
    pub quantity: i32,
}

//! Typed order commands
//!
//! Thin facade over the emitter: serialize the payload, emit, and on a
//! positive ack funnel the returned order through the same store mutators
//! the push path uses. Nothing is written to the store before the ack, so a
//! rejection or timeout leaves local state exactly as it was.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use shared::message::CommandAction;
use shared::models::{
    BillCreate, Order, OrderCreate, OrderDetailRemove, OrderDetailUpdate, OrderUpdate,
};

use crate::emitter::EventEmitter;
use crate::error::{ClientError, ClientResult};
use crate::store::orders::OrdersStore;

/// Order command surface for screens
#[derive(Clone)]
pub struct OrderCommands {
    emitter: EventEmitter,
    orders: Arc<Mutex<OrdersStore>>,
}

impl OrderCommands {
    pub fn new(emitter: EventEmitter, orders: Arc<Mutex<OrdersStore>>) -> Self {
        Self { emitter, orders }
    }

    /// Open a new order. The acked order lands in the store the same way a
    /// `newOrder` push would, so the echo push is a no-op.
    pub async fn create_order(&self, payload: OrderCreate) -> ClientResult<Order> {
        let data = self
            .emitter
            .emit(CommandAction::CreateOrder, Some(serde_json::to_value(&payload)?))
            .await?;
        let order = Self::parse_order(data)?;
        self.orders.lock().unwrap().add_order(order.clone());
        Ok(order)
    }

    /// Partial update of an order (status, people, notes, table)
    pub async fn update_order(&self, payload: OrderUpdate) -> ClientResult<Order> {
        let data = self
            .emitter
            .emit(CommandAction::UpdateOrder, Some(serde_json::to_value(&payload)?))
            .await?;
        self.apply_updated(data)
    }

    /// Update a detail line (quantity, delivered units)
    pub async fn update_order_detail(&self, payload: OrderDetailUpdate) -> ClientResult<Order> {
        let data = self
            .emitter
            .emit(
                CommandAction::UpdateOrderDetail,
                Some(serde_json::to_value(&payload)?),
            )
            .await?;
        self.apply_updated(data)
    }

    /// Remove a detail line; the ack carries the remaining order
    pub async fn remove_order_detail(&self, payload: OrderDetailRemove) -> ClientResult<Order> {
        let data = self
            .emitter
            .emit(
                CommandAction::RemoveOrderDetail,
                Some(serde_json::to_value(&payload)?),
            )
            .await?;
        self.apply_updated(data)
    }

    /// Bill the order; the ack carries the paid order
    pub async fn create_bill(&self, payload: BillCreate) -> ClientResult<Order> {
        let data = self
            .emitter
            .emit(CommandAction::CreateBill, Some(serde_json::to_value(&payload)?))
            .await?;
        self.apply_updated(data)
    }

    /// Ack data -> store, via the same replace-by-id the push path uses
    fn apply_updated(&self, data: Option<Value>) -> ClientResult<Order> {
        let order = Self::parse_order(data)?;
        self.orders.lock().unwrap().update_order(order.clone());
        Ok(order)
    }

    fn parse_order(data: Option<Value>) -> ClientResult<Order> {
        let value =
            data.ok_or_else(|| ClientError::InvalidResponse("Ack carried no order".to_string()))?;
        Ok(serde_json::from_value(value)?)
    }
}

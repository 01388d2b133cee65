//! Orders store
//!
//! Single source of truth for the live order list. Emitter acks and push
//! events funnel into the same mutators, so receiving the same final order
//! twice (ack then echo, or echo only) leaves the store unchanged. The
//! active order is a pointer resolved by id against the list, never a
//! second copy, so an update to an order is always visible through the
//! active-order selector.

use shared::models::{Order, OrderDetail};

/// In-memory store of live orders plus the active-order pointer
#[derive(Debug, Default)]
pub struct OrdersStore {
    orders: Vec<Order>,
    active_order_id: Option<String>,
    active_detail_id: Option<String>,
}

impl OrdersStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Mutators ====================

    /// Full replace, used after a bulk fetch
    pub fn set_orders(&mut self, orders: Vec<Order>) {
        self.orders = orders;
        // the pointer survives only if its target does
        if let Some(id) = self.active_order_id.clone() {
            if !self.contains(&id) {
                self.clear_active_order();
            }
        }
    }

    /// Insert if absent by id; duplicate pushes are a no-op
    pub fn add_order(&mut self, order: Order) {
        if self.contains(&order.id) {
            tracing::debug!(order_id = %order.id, "Duplicate newOrder push ignored");
            return;
        }
        self.orders.push(order);
    }

    /// Replace by id. An update for an order this client has not seen yet
    /// is inserted: the server is authoritative and all clients must
    /// converge on its state.
    pub fn update_order(&mut self, order: Order) {
        match self.orders.iter_mut().find(|o| o.id == order.id) {
            Some(existing) => *existing = order,
            None => {
                tracing::debug!(order_id = %order.id, "updateOrder for unseen order, inserting");
                self.orders.push(order);
            }
        }
    }

    /// Remove by id, clearing the active pointer when it targets the
    /// removed order
    pub fn remove_order(&mut self, id: &str) {
        self.orders.retain(|o| o.id != id);
        if self.active_order_id.as_deref() == Some(id) {
            self.clear_active_order();
        }
    }

    /// Point at an order in the list. Fails when the id is unknown so the
    /// pointer can never dangle.
    pub fn set_active_order(&mut self, id: &str) -> bool {
        if self.contains(id) {
            self.active_order_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Clear the pointer (navigation away from an order context)
    pub fn clear_active_order(&mut self) {
        self.active_order_id = None;
        self.active_detail_id = None;
    }

    pub fn set_active_detail(&mut self, detail_id: &str) -> bool {
        let found = self
            .active_order()
            .map(|o| o.details.iter().any(|d| d.id == detail_id))
            .unwrap_or(false);
        if found {
            self.active_detail_id = Some(detail_id.to_string());
        }
        found
    }

    pub fn clear_active_detail(&mut self) {
        self.active_detail_id = None;
    }

    /// Drop everything (restaurant switch, logout)
    pub fn reset(&mut self) {
        self.orders.clear();
        self.clear_active_order();
    }

    // ==================== Selectors ====================

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order_by_id(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// The active order, resolved against the list by id
    pub fn active_order(&self) -> Option<&Order> {
        let id = self.active_order_id.as_deref()?;
        self.order_by_id(id)
    }

    /// The active detail within the active order
    pub fn active_detail(&self) -> Option<&OrderDetail> {
        let detail_id = self.active_detail_id.as_deref()?;
        self.active_order()?
            .details
            .iter()
            .find(|d| d.id == detail_id)
    }

    fn contains(&self, id: &str) -> bool {
        self.orders.iter().any(|o| o.id == id)
    }
}

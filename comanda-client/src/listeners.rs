//! Push-event listener registry
//!
//! Exactly one active handler per push event. Re-subscribing replaces the
//! previous handler, so repeated screen mounts or reconnects never stack
//! duplicate handlers for the same event. Dispatch happens on the
//! connection read task, in server emission order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shared::message::{PushEvent, PushPayload};
use shared::models::Order;

use crate::store::orders::OrdersStore;

type Handler = Box<dyn Fn(&PushPayload) + Send + Sync + 'static>;

#[derive(Default)]
struct RegistryInner {
    handlers: HashMap<PushEvent, (u64, Handler)>,
    next_id: u64,
}

/// Registry of push-event handlers
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `event`, replacing any previous one.
    ///
    /// The returned [`Subscription`] deregisters the handler when dropped,
    /// tying the handler's lifetime to its owner (a screen controller or
    /// session).
    pub fn subscribe(
        &self,
        event: PushEvent,
        handler: impl Fn(&PushPayload) + Send + Sync + 'static,
    ) -> Subscription {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        if inner
            .handlers
            .insert(event, (id, Box::new(handler)))
            .is_some()
        {
            tracing::debug!(event = %event, "Replaced existing push handler");
        }
        Subscription {
            registry: self.clone(),
            event,
            id,
        }
    }

    /// Remove the handler for `event`. Idempotent.
    pub fn unsubscribe(&self, event: PushEvent) {
        self.inner.lock().unwrap().handlers.remove(&event);
    }

    /// Dispatch a push payload to its handler, if any.
    ///
    /// Called from the connection read loop; payloads arrive and are applied
    /// in server emission order.
    pub(crate) fn dispatch(&self, payload: &PushPayload) {
        let inner = self.inner.lock().unwrap();
        match inner.handlers.get(&payload.event) {
            Some((_, handler)) => handler(payload),
            None => tracing::debug!(event = %payload.event, "No handler for push event"),
        }
    }

    /// Remove the handler only if it still belongs to `id`.
    fn unsubscribe_if_current(&self, event: PushEvent, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        if inner.handlers.get(&event).map(|(h, _)| *h) == Some(id) {
            inner.handlers.remove(&event);
        }
    }
}

/// RAII guard for a registered push handler
///
/// Dropping the guard deregisters the handler. A stale guard (one whose
/// handler was already replaced by a newer subscribe) is a no-op on drop.
pub struct Subscription {
    registry: ListenerRegistry,
    event: PushEvent,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe_if_current(self.event, self.id);
    }
}

/// Wire the order push events into the orders store.
///
/// Handlers only call store mutators; duplicate pushes are absorbed by the
/// mutators' idempotency. Keep the returned subscriptions alive for as long
/// as the store should track the channel.
pub fn bind_order_events(
    registry: &ListenerRegistry,
    orders: Arc<Mutex<OrdersStore>>,
) -> Vec<Subscription> {
    let store = orders.clone();
    let on_new = registry.subscribe(PushEvent::NewOrder, move |payload| {
        if let Some(order) = parse_order(payload) {
            store.lock().unwrap().add_order(order);
        }
    });

    let store = orders.clone();
    let on_update = registry.subscribe(PushEvent::UpdateOrder, move |payload| {
        if let Some(order) = parse_order(payload) {
            store.lock().unwrap().update_order(order);
        }
    });

    let store = orders.clone();
    let on_bill = registry.subscribe(PushEvent::BillCreated, move |payload| {
        if let Some(order) = parse_order(payload) {
            store.lock().unwrap().update_order(order);
        }
    });

    let store = orders;
    let on_delete = registry.subscribe(PushEvent::OrderDeleted, move |payload| {
        let id = payload
            .data
            .as_ref()
            .and_then(|d| d.get("id"))
            .and_then(|v| v.as_str());
        match id {
            Some(id) => {
                store.lock().unwrap().remove_order(id);
            }
            None => tracing::warn!("orderDeleted push without an id"),
        }
    });

    vec![on_new, on_update, on_bill, on_delete]
}

fn parse_order(payload: &PushPayload) -> Option<Order> {
    let data = payload.data.clone()?;
    match serde_json::from_value::<Order>(data) {
        Ok(order) => Some(order),
        Err(e) => {
            tracing::warn!(event = %payload.event, error = %e, "Malformed order in push payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn push(event: PushEvent) -> PushPayload {
        PushPayload {
            event,
            data: None,
            msg: None,
        }
    }

    #[test]
    fn test_resubscribe_replaces_handler() {
        let registry = ListenerRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        let _a = registry.subscribe(PushEvent::NewOrder, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let counter = second.clone();
        let _b = registry.subscribe(PushEvent::NewOrder, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&push(PushEvent::NewOrder));

        // only the latest handler fires, exactly once
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = count.clone();
        let sub = registry.subscribe(PushEvent::UpdateOrder, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(sub);

        registry.dispatch(&push(PushEvent::UpdateOrder));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_guard_drop_keeps_new_handler() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let old = registry.subscribe(PushEvent::NewOrder, |_| {});
        let counter = count.clone();
        let _new = registry.subscribe(PushEvent::NewOrder, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // dropping the replaced guard must not remove the newer handler
        drop(old);
        registry.dispatch(&push(PushEvent::NewOrder));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry = ListenerRegistry::new();
        registry.unsubscribe(PushEvent::BillCreated);
        registry.unsubscribe(PushEvent::BillCreated);
    }
}

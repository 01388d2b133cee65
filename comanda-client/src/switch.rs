//! Restaurant switch orchestration
//!
//! Ordered sequence with an explicit failure boundary: nothing local is
//! touched until the backend has confirmed the re-scope. After that point
//! every restaurant-scoped store is cleared before the channel rejoins under
//! the new tenant, so no frame from the new restaurant can ever land in
//! stores still holding the old one's data.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::Mutex;

use shared::models::{DiningTable, MenuCategory};

use crate::error::{ClientError, ClientResult};
use crate::http::PosApi;
use crate::session::{Session, SessionManager};
use crate::store::orders::OrdersStore;
use crate::store::reference::{DraftStore, ReferenceCache};

/// Orchestrates the switch to another restaurant
pub struct RestaurantSwitcher {
    api: Arc<dyn PosApi>,
    session: SessionManager,
    orders: Arc<StdMutex<OrdersStore>>,
    menu: Arc<Mutex<ReferenceCache<Vec<MenuCategory>>>>,
    tables: Arc<Mutex<ReferenceCache<Vec<DiningTable>>>>,
    draft: Arc<Mutex<DraftStore>>,
    reconnect_grace: Duration,
}

impl RestaurantSwitcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn PosApi>,
        session: SessionManager,
        orders: Arc<StdMutex<OrdersStore>>,
        menu: Arc<Mutex<ReferenceCache<Vec<MenuCategory>>>>,
        tables: Arc<Mutex<ReferenceCache<Vec<DiningTable>>>>,
        draft: Arc<Mutex<DraftStore>>,
        reconnect_grace: Duration,
    ) -> Self {
        Self {
            api,
            session,
            orders,
            menu,
            tables,
            draft,
            reconnect_grace,
        }
    }

    /// Switch the session to `restaurant_id`.
    ///
    /// Steps, in order:
    /// 1. backend re-scope — a failure here leaves everything untouched;
    /// 2. adopt the new session and close the channel;
    /// 3. clear draft, orders and both reference caches;
    /// 4. after the grace delay, rejoin under the new token.
    ///
    /// A rejoin failure restores the prior session and attempts to reconnect
    /// under it; the cleared stores stay cleared and refill lazily.
    pub async fn switch_restaurant(&self, restaurant_id: &str) -> ClientResult<Session> {
        let current = self.session.session().ok_or(ClientError::Unauthorized)?;

        if current.current_restaurant.id == restaurant_id {
            tracing::debug!(%restaurant_id, "Already scoped to this restaurant");
            return Ok(current);
        }

        // 1. Backend first; local state is untouched on rejection
        let auth = self
            .api
            .switch_restaurant(&current.token, restaurant_id)
            .await?;
        let new_session = Session::from(auth);
        tracing::info!(
            from = %current.current_restaurant.id,
            to = %new_session.current_restaurant.id,
            "Restaurant re-scoped, clearing tenant state"
        );

        // 2. New identity in, channel down
        self.session.stage(new_session.clone()).await?;

        // 3. Tenant-scoped state out, while no frames can arrive
        self.draft.lock().await.clear();
        self.orders.lock().unwrap().reset();
        self.menu.lock().await.clear();
        self.tables.lock().await.clear();

        // 4. Give the server time to finish tenant-room teardown, then rejoin
        tokio::time::sleep(self.reconnect_grace).await;
        if let Err(e) = self.session.reconnect().await {
            tracing::error!(error = %e, "Rejoin after switch failed, restoring previous session");
            self.session.stage(current).await?;
            if let Err(e) = self.session.reconnect().await {
                tracing::warn!(error = %e, "Reconnect under previous session also failed");
            }
            return Err(e);
        }

        Ok(new_session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionManager, Connector, MemoryConnector};
    use crate::store::kv::{CredentialStore, MemoryStore, ScopedStore, KEY_MENU_STORE, KEY_TABLES_STORE};
    use crate::transport::ClientTransport;
    use async_trait::async_trait;
    use shared::client::{AuthResponse, LoginRequest, OrdersHistoryQuery, RestaurantInfo, UserInfo};
    use shared::message::BusMessage;
    use shared::models::{Order, OrderStatus};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::broadcast;

    struct SwitchApi {
        reject: bool,
    }

    #[async_trait]
    impl PosApi for SwitchApi {
        async fn login(&self, _request: &LoginRequest) -> ClientResult<AuthResponse> {
            unimplemented!()
        }
        async fn renew_session(&self, _token: &str) -> ClientResult<AuthResponse> {
            unimplemented!()
        }
        async fn switch_restaurant(
            &self,
            _token: &str,
            restaurant_id: &str,
        ) -> ClientResult<AuthResponse> {
            if self.reject {
                return Err(ClientError::Unauthorized);
            }
            Ok(AuthResponse {
                token: format!("jwt-{}", restaurant_id),
                user: UserInfo {
                    id: "u1".to_string(),
                    username: "ana".to_string(),
                    role: "waiter".to_string(),
                },
                current_restaurant: RestaurantInfo {
                    id: restaurant_id.to_string(),
                    name: "Osteria".to_string(),
                },
            })
        }
        async fn fetch_menu(&self, _token: &str) -> ClientResult<Vec<MenuCategory>> {
            Ok(vec![])
        }
        async fn fetch_tables(&self, _token: &str) -> ClientResult<Vec<DiningTable>> {
            Ok(vec![])
        }
        async fn orders_history(
            &self,
            _token: &str,
            _query: &OrdersHistoryQuery,
        ) -> ClientResult<Vec<Order>> {
            Ok(vec![])
        }
    }

    /// Connector that can be made to fail dials on demand
    struct FlakyConnector {
        inner: MemoryConnector,
        fail: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        async fn dial(&self) -> Result<ClientTransport, ClientError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::Connection("dial refused".to_string()));
            }
            self.inner.dial().await
        }
    }

    struct Harness {
        switcher: RestaurantSwitcher,
        session: SessionManager,
        orders: Arc<StdMutex<OrdersStore>>,
        menu: Arc<Mutex<ReferenceCache<Vec<MenuCategory>>>>,
        tables: Arc<Mutex<ReferenceCache<Vec<DiningTable>>>>,
        fail_dial: Arc<AtomicBool>,
        _server_rx: broadcast::Receiver<BusMessage>,
    }

    async fn harness(reject: bool) -> Harness {
        let backing: Arc<dyn ScopedStore> = Arc::new(MemoryStore::new());

        let (server_tx, _) = broadcast::channel(16);
        let (client_tx, server_rx) = broadcast::channel(16);
        let fail_dial = Arc::new(AtomicBool::new(false));
        let connector: Arc<dyn Connector> = Arc::new(FlakyConnector {
            inner: MemoryConnector::new(server_tx, client_tx),
            fail: fail_dial.clone(),
        });
        let connection = ConnectionManager::new(connector, "test");
        let session = SessionManager::new(CredentialStore::new(backing.clone()), connection);

        // start authenticated in r1 with populated tenant state
        session
            .apply(crate::session::SessionState::Authenticated(Session {
                token: "jwt-r1".to_string(),
                user: UserInfo {
                    id: "u1".to_string(),
                    username: "ana".to_string(),
                    role: "waiter".to_string(),
                },
                current_restaurant: RestaurantInfo {
                    id: "r1".to_string(),
                    name: "Trattoria".to_string(),
                },
            }))
            .await
            .unwrap();

        let orders = Arc::new(StdMutex::new(OrdersStore::new()));
        orders.lock().unwrap().add_order(Order {
            id: "o1".to_string(),
            num: 1,
            status: OrderStatus::Pending,
            is_paid: false,
            is_closed: false,
            people: 2,
            notes: None,
            table: None,
            details: vec![],
            total: 0.0,
            owner: UserInfo {
                id: "u1".to_string(),
                username: "ana".to_string(),
                role: "waiter".to_string(),
            },
        });

        let mut menu_cache = ReferenceCache::new(KEY_MENU_STORE, backing.clone());
        menu_cache.refetch("r1", || async { Ok(vec![]) }).await.unwrap();
        let menu = Arc::new(Mutex::new(menu_cache));

        let mut tables_cache = ReferenceCache::new(KEY_TABLES_STORE, backing.clone());
        tables_cache.refetch("r1", || async { Ok(vec![]) }).await.unwrap();
        let tables = Arc::new(Mutex::new(tables_cache));

        let draft = Arc::new(Mutex::new(DraftStore::new(backing)));

        let switcher = RestaurantSwitcher::new(
            Arc::new(SwitchApi { reject }),
            session.clone(),
            orders.clone(),
            menu.clone(),
            tables.clone(),
            draft,
            Duration::ZERO,
        );

        Harness {
            switcher,
            session,
            orders,
            menu,
            tables,
            fail_dial,
            _server_rx: server_rx,
        }
    }

    #[tokio::test]
    async fn test_switch_clears_tenant_state_and_rescopes() {
        let h = harness(false).await;

        let session = h.switcher.switch_restaurant("r2").await.unwrap();

        assert_eq!(session.current_restaurant.id, "r2");
        assert_eq!(h.session.current_restaurant_id().as_deref(), Some("r2"));
        assert!(h.orders.lock().unwrap().orders().is_empty());
        assert!(h.menu.lock().await.data().is_none());
        assert!(h.tables.lock().await.data().is_none());
    }

    #[tokio::test]
    async fn test_rejected_switch_touches_nothing() {
        // backend refuses: session, orders and caches all stand
        let h = harness(true).await;

        let result = h.switcher.switch_restaurant("r2").await;

        assert!(matches!(result, Err(ClientError::Unauthorized)));
        assert_eq!(h.session.current_restaurant_id().as_deref(), Some("r1"));
        assert_eq!(h.orders.lock().unwrap().orders().len(), 1);
        assert!(h.menu.lock().await.data().is_some());
        assert_eq!(h.menu.lock().await.restaurant_id(), Some("r1"));
    }

    #[tokio::test]
    async fn test_switch_to_current_restaurant_is_noop() {
        let h = harness(false).await;

        let session = h.switcher.switch_restaurant("r1").await.unwrap();

        assert_eq!(session.current_restaurant.id, "r1");
        assert_eq!(h.orders.lock().unwrap().orders().len(), 1);
        assert!(h.menu.lock().await.data().is_some());
    }

    #[tokio::test]
    async fn test_failed_rejoin_restores_previous_session() {
        let h = harness(false).await;
        h.fail_dial.store(true, Ordering::SeqCst);

        let result = h.switcher.switch_restaurant("r2").await;

        assert!(result.is_err());
        // prior identity restored; tenant state stays cleared and will
        // refill lazily
        assert_eq!(h.session.current_restaurant_id().as_deref(), Some("r1"));
        assert!(h.orders.lock().unwrap().orders().is_empty());
        assert!(h.menu.lock().await.data().is_none());
    }
}

//! Session lifecycle
//!
//! Owns the authenticated identity and drives the event channel from it:
//! entering the authenticated state persists the token and connects,
//! leaving it clears the token and disconnects. The channel never outlives
//! the session that opened it.

use std::sync::{Arc, Mutex};

use shared::client::{AuthResponse, LoginRequest, RestaurantInfo, UserInfo};

use crate::connection::ConnectionManager;
use crate::error::{ClientError, ClientResult};
use crate::http::PosApi;
use crate::store::kv::CredentialStore;

/// An authenticated identity scoped to one restaurant
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: UserInfo,
    pub current_restaurant: RestaurantInfo,
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Self {
            token: auth.token,
            user: auth.user,
            current_restaurant: auth.current_restaurant,
        }
    }
}

/// Authentication state of the client
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// Startup restore in progress, UI should hold
    #[default]
    Checking,
    Authenticated(Session),
    Unauthenticated,
}

/// Drives session state transitions and keeps token persistence and the
/// event channel in lockstep with them
#[derive(Clone)]
pub struct SessionManager {
    credentials: CredentialStore,
    connection: ConnectionManager,
    state: Arc<Mutex<SessionState>>,
}

impl SessionManager {
    pub fn new(credentials: CredentialStore, connection: ConnectionManager) -> Self {
        Self {
            credentials,
            connection,
            state: Arc::new(Mutex::new(SessionState::Checking)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap().clone()
    }

    pub fn session(&self) -> Option<Session> {
        match self.state() {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<String> {
        self.session().map(|s| s.token)
    }

    pub fn current_restaurant_id(&self) -> Option<String> {
        self.session().map(|s| s.current_restaurant.id)
    }

    /// Apply a state transition, with its side effects.
    ///
    /// Authenticated: persist the token (a write failure is logged, the
    /// in-memory session stands) and connect the channel under it.
    /// Unauthenticated: clear the token and tear the channel down.
    pub async fn apply(&self, state: SessionState) -> ClientResult<()> {
        match &state {
            SessionState::Authenticated(session) => {
                if let Err(e) = self.credentials.save_token(&session.token) {
                    tracing::warn!(error = %e, "Failed to persist session token");
                }
                *self.state.lock().unwrap() = state.clone();
                self.connection.connect(&session.token).await?;
            }
            SessionState::Unauthenticated => {
                if let Err(e) = self.credentials.clear_token() {
                    tracing::warn!(error = %e, "Failed to clear session token");
                }
                *self.state.lock().unwrap() = state.clone();
                self.connection.disconnect().await;
            }
            SessionState::Checking => {
                *self.state.lock().unwrap() = state.clone();
            }
        }
        Ok(())
    }

    /// Adopt a new session and close the channel WITHOUT reconnecting.
    /// The restaurant switch uses this to control the rejoin moment itself.
    pub async fn stage(&self, session: Session) -> ClientResult<()> {
        if let Err(e) = self.credentials.save_token(&session.token) {
            tracing::warn!(error = %e, "Failed to persist session token");
        }
        *self.state.lock().unwrap() = SessionState::Authenticated(session);
        self.connection.disconnect().await;
        Ok(())
    }

    /// Connect the channel under the current session's token
    pub async fn reconnect(&self) -> ClientResult<()> {
        match self.token() {
            Some(token) => self.connection.connect(&token).await,
            None => Err(ClientError::NotConnected),
        }
    }

    /// Authenticate against the backend and enter the authenticated state
    pub async fn login(
        &self,
        api: &dyn PosApi,
        username: &str,
        password: &str,
    ) -> ClientResult<Session> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let auth = api.login(&request).await?;
        let session = Session::from(auth);
        tracing::info!(user = %session.user.username, restaurant = %session.current_restaurant.id, "Logged in");
        self.apply(SessionState::Authenticated(session.clone()))
            .await?;
        Ok(session)
    }

    /// Startup restore: validate the persisted token with the backend.
    ///
    /// No token or a rejected token lands in `Unauthenticated`; only an
    /// infrastructure failure is surfaced as an error.
    pub async fn restore(&self, api: &dyn PosApi) -> ClientResult<SessionState> {
        let token = match self.credentials.load_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.apply(SessionState::Unauthenticated).await?;
                return Ok(SessionState::Unauthenticated);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted token");
                self.apply(SessionState::Unauthenticated).await?;
                return Ok(SessionState::Unauthenticated);
            }
        };

        match api.renew_session(&token).await {
            Ok(auth) => {
                let session = Session::from(auth);
                tracing::info!(user = %session.user.username, "Session restored");
                self.apply(SessionState::Authenticated(session.clone()))
                    .await?;
                Ok(SessionState::Authenticated(session))
            }
            Err(ClientError::Unauthorized) => {
                tracing::info!("Persisted token rejected, clearing");
                self.apply(SessionState::Unauthenticated).await?;
                Ok(SessionState::Unauthenticated)
            }
            Err(e) => Err(e),
        }
    }

    /// Leave the authenticated state
    pub async fn logout(&self) -> ClientResult<()> {
        tracing::info!("Logging out");
        self.apply(SessionState::Unauthenticated).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Connector, MemoryConnector};
    use crate::store::kv::{MemoryStore, ScopedStore};
    use async_trait::async_trait;
    use shared::client::OrdersHistoryQuery;
    use shared::models::{DiningTable, MenuCategory, Order};
    use tokio::sync::broadcast;

    fn auth(token: &str, restaurant: &str) -> AuthResponse {
        AuthResponse {
            token: token.to_string(),
            user: UserInfo {
                id: "u1".to_string(),
                username: "ana".to_string(),
                role: "waiter".to_string(),
            },
            current_restaurant: RestaurantInfo {
                id: restaurant.to_string(),
                name: "Trattoria".to_string(),
            },
        }
    }

    struct StubApi {
        renew: ClientResult<AuthResponse>,
    }

    #[async_trait]
    impl PosApi for StubApi {
        async fn login(&self, _request: &LoginRequest) -> ClientResult<AuthResponse> {
            Ok(auth("jwt-login", "r1"))
        }
        async fn renew_session(&self, _token: &str) -> ClientResult<AuthResponse> {
            match &self.renew {
                Ok(a) => Ok(a.clone()),
                Err(ClientError::Unauthorized) => Err(ClientError::Unauthorized),
                Err(_) => Err(ClientError::NotConnected),
            }
        }
        async fn switch_restaurant(
            &self,
            _token: &str,
            _restaurant_id: &str,
        ) -> ClientResult<AuthResponse> {
            unimplemented!()
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

    // the held receiver keeps the client->server channel open so the
    // handshake write during connect() succeeds
    fn manager() -> (
        SessionManager,
        Arc<dyn ScopedStore>,
        broadcast::Receiver<shared::message::BusMessage>,
    ) {
        let backing: Arc<dyn ScopedStore> = Arc::new(MemoryStore::new());
        let credentials = CredentialStore::new(backing.clone());

        let (server_tx, _) = broadcast::channel(16);
        let (client_tx, server_rx) = broadcast::channel(16);
        let connector: Arc<dyn Connector> = Arc::new(MemoryConnector::new(server_tx, client_tx));
        let connection = ConnectionManager::new(connector, "test");

        (SessionManager::new(credentials, connection), backing, server_rx)
    }

    #[tokio::test]
    async fn test_login_persists_token_and_connects() {
        let (manager, backing, _server_rx) = manager();
        let api = StubApi {
            renew: Err(ClientError::Unauthorized),
        };

        let session = manager.login(&api, "ana", "secret").await.unwrap();

        assert_eq!(session.token, "jwt-login");
        assert!(matches!(manager.state(), SessionState::Authenticated(_)));
        assert!(backing.get("authToken").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logout_clears_token_and_state() {
        let (manager, backing, _server_rx) = manager();
        let api = StubApi {
            renew: Err(ClientError::Unauthorized),
        };
        manager.login(&api, "ana", "secret").await.unwrap();

        manager.logout().await.unwrap();

        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(backing.get("authToken").unwrap().is_none());
        assert!(manager.token().is_none());
    }

    #[tokio::test]
    async fn test_restore_without_token_is_unauthenticated() {
        let (manager, _backing, _server_rx) = manager();
        let api = StubApi {
            renew: Ok(auth("jwt-renewed", "r1")),
        };

        let state = manager.restore(&api).await.unwrap();
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_restore_with_valid_token_authenticates() {
        let (manager, backing, _server_rx) = manager();
        CredentialStore::new(backing).save_token("jwt-old").unwrap();

        let api = StubApi {
            renew: Ok(auth("jwt-renewed", "r1")),
        };
        let state = manager.restore(&api).await.unwrap();

        match state {
            SessionState::Authenticated(session) => assert_eq!(session.token, "jwt-renewed"),
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_restore_with_rejected_token_clears_it() {
        let (manager, backing, _server_rx) = manager();
        CredentialStore::new(backing.clone())
            .save_token("jwt-expired")
            .unwrap();

        let api = StubApi {
            renew: Err(ClientError::Unauthorized),
        };
        let state = manager.restore(&api).await.unwrap();

        assert_eq!(state, SessionState::Unauthenticated);
        assert!(backing.get("authToken").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stage_adopts_session_without_connecting() {
        let (manager, _backing, _server_rx) = manager();

        manager
            .stage(Session::from(auth("jwt-new", "r2")))
            .await
            .unwrap();

        assert_eq!(manager.current_restaurant_id().as_deref(), Some("r2"));
    }
}

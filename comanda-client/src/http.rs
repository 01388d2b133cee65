//! HTTP client for network-based API calls
//!
//! Everything session- and reference-data-related goes over HTTP; only live
//! order traffic uses the event channel. The token is passed per call so the
//! session lifecycle stays the single owner of credentials.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use shared::client::{
    AuthResponse, LoginRequest, OrdersHistoryQuery, SwitchRestaurantRequest,
};
use shared::models::{DiningTable, MenuCategory, Order};
use shared::ApiResponse;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Request-side API surface, behind a trait so session and switch logic can
/// be exercised against stubs
#[async_trait]
pub trait PosApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse>;

    /// Validate a persisted token and receive a fresh session payload
    async fn renew_session(&self, token: &str) -> ClientResult<AuthResponse>;

    /// Re-scope the session to another restaurant
    async fn switch_restaurant(&self, token: &str, restaurant_id: &str)
        -> ClientResult<AuthResponse>;

    async fn fetch_menu(&self, token: &str) -> ClientResult<Vec<MenuCategory>>;

    async fn fetch_tables(&self, token: &str) -> ClientResult<Vec<DiningTable>>;

    /// Read-only report endpoint, bypasses the live stores
    async fn orders_history(
        &self,
        token: &str,
        query: &OrdersHistoryQuery,
    ) -> ClientResult<Vec<Order>>;
}

/// HTTP client for making network requests to the backend
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a GET request with a query string
    async fn get_query<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        query: &Q,
    ) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path)).query(query);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request without body
    async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Map the HTTP status, then unwrap the response envelope
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                _ => Err(ClientError::InvalidResponse(format!(
                    "HTTP {}: {}",
                    status, text
                ))),
            };
        }

        let envelope: ApiResponse<T> = response.json().await?;
        if !envelope.is_success() {
            return Err(ClientError::InvalidResponse(format!(
                "{}: {}",
                envelope.code, envelope.message
            )));
        }
        envelope
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing response data".to_string()))
    }
}

#[async_trait]
impl PosApi for HttpClient {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse> {
        self.post("api/auth/login", None, request).await
    }

    async fn renew_session(&self, token: &str) -> ClientResult<AuthResponse> {
        self.post_empty("api/auth/renew", Some(token)).await
    }

    async fn switch_restaurant(
        &self,
        token: &str,
        restaurant_id: &str,
    ) -> ClientResult<AuthResponse> {
        let request = SwitchRestaurantRequest {
            restaurant_id: restaurant_id.to_string(),
        };
        self.post("api/auth/switch-restaurant", Some(token), &request)
            .await
    }

    async fn fetch_menu(&self, token: &str) -> ClientResult<Vec<MenuCategory>> {
        self.get("api/menu", Some(token)).await
    }

    async fn fetch_tables(&self, token: &str) -> ClientResult<Vec<DiningTable>> {
        self.get("api/tables", Some(token)).await
    }

    async fn orders_history(
        &self,
        token: &str,
        query: &OrdersHistoryQuery,
    ) -> ClientResult<Vec<Order>> {
        self.get_query("api/reports/orders", Some(token), query)
            .await
    }
}

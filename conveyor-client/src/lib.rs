//! Conveyor HTTP Client
//!
//! A typed HTTP client for the Conveyor task-queue API.
//!
//! The client owns the authenticate-retry machinery: it attaches Basic or
//! OAuth2 credentials to every outbound call, exchanges client credentials
//! for bearer tokens on demand, and transparently re-authenticates when the
//! server reports an expired token.
//!
//! # Example
//!
//! ```no_run
//! use conveyor_client::QueueClient;
//! use conveyor_client::auth::Credentials;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = QueueClient::new("https://api.example.com/v2");
//!     let credentials = Credentials::from_api_key_env()?;
//!
//!     let page = client.list_tenants(&credentials, &Default::default(), 0).await?;
//!     println!("{} tenant(s) on page 0", page.items.len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod paging;
mod tasks;
mod tenants;
pub mod token;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use paging::{Page, PageFetcher, Paginator};
pub use tasks::{DEFAULT_PAGE_SIZE, QueueMode};
pub use tenants::TenantFilter;

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use conveyor_core::dto::TokenResponse;

use crate::auth::{AuthProtocol, Credentials};
use crate::token::{InMemoryTokenStore, TokenStore};

/// Additional attempts allowed per logical operation after an authorization
/// failure. Each page fetch and each acknowledgement gets its own budget.
const MAX_AUTH_RETRIES: u32 = 3;

/// HTTP client for the Conveyor queue API
///
/// Cheap to clone; the underlying connection pool and token store are
/// shared. Endpoint groups live in their own modules:
/// - task listing and acknowledgement (managed and admin queues)
/// - tenant listing and lookup
#[derive(Clone)]
pub struct QueueClient {
    /// Base URL of the queue API (e.g. "https://api.example.com/v2")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Bearer token cache, keyed by actor client id
    tokens: Arc<dyn TokenStore>,
}

impl QueueClient {
    /// Create a new queue client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the queue API
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new queue client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            tokens: Arc::new(InMemoryTokenStore::new()),
        }
    }

    /// Replace the token store (e.g. with a shared or persistent cache)
    pub fn with_token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Get the base URL of the queue API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Authentication
    // =============================================================================

    /// Attach the credential's authentication scheme to a request
    ///
    /// Basic credentials are attached statically. OAuth2 credentials attach
    /// the cached bearer token, synchronously exchanging client credentials
    /// first when the cache is empty.
    async fn authorize(
        &self,
        request: RequestBuilder,
        credentials: &Credentials,
    ) -> Result<RequestBuilder> {
        match credentials.protocol {
            AuthProtocol::Basic => {
                Ok(request.basic_auth(&credentials.username, Some(&credentials.password)))
            }
            AuthProtocol::OAuth2 => {
                let token = match self.tokens.get(&credentials.username) {
                    Some(token) => token,
                    None => {
                        let token = self.exchange_token(credentials).await?;
                        self.tokens.set(&credentials.username, token.clone());
                        token
                    }
                };
                Ok(request.bearer_auth(token))
            }
        }
    }

    /// Obtain a bearer token via the OAuth2 client-credentials flow
    async fn exchange_token(&self, credentials: &Credentials) -> Result<String> {
        let url = format!("{}/oauth/token", self.base_url);
        debug!(client_id = %credentials.username, "exchanging client credentials for a token");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("client_id", credentials.username.as_str()),
                ("client_secret", credentials.password.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let token: TokenResponse = self.handle_response(response).await?;
        if token.access_token.is_empty() {
            return Err(ClientError::AuthError(
                "token endpoint returned an empty access token".to_string(),
            ));
        }
        Ok(token.access_token)
    }

    /// Execute a call, recovering from expired bearer tokens
    ///
    /// On a 401 the cached token is invalidated and the request is rebuilt
    /// and re-sent with a fresh token, at most [`MAX_AUTH_RETRIES`] extra
    /// times. Basic credentials never retry (they cannot expire
    /// mid-session). Any other status is returned to the caller untouched.
    pub(crate) async fn execute_with_reauth(
        &self,
        credentials: &Credentials,
        build: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<Response> {
        let mut retries = 0;
        loop {
            let request = self.authorize(build(&self.client), credentials).await?;
            let response = request.send().await?;

            if response.status() == StatusCode::UNAUTHORIZED
                && credentials.protocol == AuthProtocol::OAuth2
                && retries < MAX_AUTH_RETRIES
            {
                retries += 1;
                debug!(
                    client_id = %credentials.username,
                    attempt = retries,
                    "authorization rejected; refreshing token and retrying"
                );
                self.tokens.clear(&credentials.username);
                continue;
            }
            return Ok(response);
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no useful body (e.g. acks)
    ///
    /// This method checks the status code and returns an error if the request failed.
    async fn handle_empty_response(&self, response: Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

//! Bearer token storage
//!
//! OAuth2 access tokens are cached per credential identity (the actor client
//! id) so concurrent tenants never share a token slot. The store is injected
//! into the client at construction; only the auth layer writes to it.

use std::collections::HashMap;
use std::sync::Mutex;

/// Cache of bearer tokens keyed by actor client id
pub trait TokenStore: Send + Sync {
    /// Get the cached token for a client id
    fn get(&self, client_id: &str) -> Option<String>;

    /// Cache a token for a client id
    fn set(&self, client_id: &str, token: String);

    /// Drop the cached token for a client id, forcing re-acquisition on the
    /// next call
    fn clear(&self, client_id: &str);
}

/// A [`TokenStore`] that records tokens in process memory
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, client_id: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(client_id).cloned()
    }

    fn set(&self, client_id: &str, token: String) {
        self.tokens.lock().unwrap().insert(client_id.to_string(), token);
    }

    fn clear(&self, client_id: &str) {
        self.tokens.lock().unwrap().remove(client_id);
    }
}

//! Wire DTOs for the remote queue API
//!
//! These mirror the JSON envelopes the server speaks. Task payloads are kept
//! as raw `serde_json::Value`s here; decoding into canonical tasks happens in
//! [`crate::domain::task`].

use serde::{Deserialize, Serialize};

use crate::domain::tenant::Tenant;

/// Pagination envelope on list responses
///
/// `next` is present and non-null iff another page exists. The server does
/// not guarantee it respects the requested page size, so page fullness must
/// never be used to infer this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<serde_json::Value>,
}

/// Response of the task listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TaskListResponse {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl TaskListResponse {
    /// Whether the server reports more pages after this one
    pub fn has_more(&self) -> bool {
        self.paging
            .as_ref()
            .is_some_and(|paging| paging.next.is_some())
    }
}

/// Response of the tenant listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TenantListResponse {
    #[serde(default)]
    pub data: Vec<Tenant>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl TenantListResponse {
    pub fn has_more(&self) -> bool {
        self.paging
            .as_ref()
            .is_some_and(|paging| paging.next.is_some())
    }
}

/// Response of the single-tenant endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TenantResponse {
    pub data: Tenant,
}

/// Response of the OAuth2 client-credentials token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

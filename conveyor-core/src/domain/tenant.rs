//! Tenant domain types
//!
//! A tenant is one customer/integration instance scoped to an account. The
//! driver re-fetches the tenant set on every polling cycle so newly
//! provisioned or deactivated tenants are picked up without a restart.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One integration tenant, as returned by the tenants endpoint
///
/// Immutable once produced; the auth descriptor carries the actor
/// credentials used for that tenant's task traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub account: AccountRef,
    pub integration: IntegrationRef,
    pub cloud: Option<CloudRef>,
    pub auth: AuthDescriptor,
}

/// The account a tenant belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: Uuid,
    pub name: String,
}

/// The integration a tenant is an instance of
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationRef {
    pub name: String,
}

/// The cloud environment hosting a tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudRef {
    pub name: String,
}

/// Actor authentication parameters for a tenant
///
/// `scheme` is the server's choice of actor authentication (`basic` or
/// `oauth2`); the client id and secret feed either HTTP Basic auth or the
/// client-credentials token exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthDescriptor {
    #[serde(rename = "type")]
    pub scheme: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Display for Tenant {
    /// Renders `name/cloud/account` for log lines
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/", self.name)?;
        if let Some(cloud) = &self.cloud {
            write!(f, "{}/", cloud.name)?;
        }
        write!(f, "{}", self.account.name)
    }
}

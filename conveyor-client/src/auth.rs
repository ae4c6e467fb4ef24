//! Credentials and authentication protocol selection
//!
//! Two credential scopes exist: account-wide API-key credentials (used for
//! the tenants endpoint) and per-tenant actor credentials (used for task
//! traffic). Each scope resolves its protocol (HTTP Basic or OAuth2) once
//! per process: an environment override wins, then the local config file,
//! then a hard default.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Deserialize;
use tracing::warn;

use conveyor_core::domain::tenant::Tenant;

use crate::error::ClientError;

/// Environment variable holding the account API key
pub const API_KEY_VAR: &str = "CONVEYOR_API_KEY";

/// Credential scope: account-wide or per-tenant actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    Account,
    Actor,
}

impl AuthScope {
    /// The protocol used when neither the environment nor the config file
    /// says otherwise
    fn default_protocol(self) -> AuthProtocol {
        match self {
            AuthScope::Account => AuthProtocol::Basic,
            AuthScope::Actor => AuthProtocol::OAuth2,
        }
    }

    fn env_var(self) -> &'static str {
        match self {
            AuthScope::Account => "CONVEYOR_API_AUTH_ACCOUNT",
            AuthScope::Actor => "CONVEYOR_API_AUTH_ACTOR",
        }
    }
}

/// Wire authentication protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProtocol {
    Basic,
    OAuth2,
}

impl FromStr for AuthProtocol {
    type Err = ();

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthProtocol::Basic),
            "oauth2" => Ok(AuthProtocol::OAuth2),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AuthProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthProtocol::Basic => write!(f, "basic"),
            AuthProtocol::OAuth2 => write!(f, "oauth2"),
        }
    }
}

/// Optional `~/.conveyor/api.toml` overrides
#[derive(Debug, Default, Deserialize)]
struct AuthFileConfig {
    auth_account: Option<String>,
    auth_actor: Option<String>,
}

/// The protocol for a scope, resolved once per process
///
/// Resolution order is fixed: the scope's environment override, then the
/// matching key in `~/.conveyor/api.toml`, then the scope default. An
/// unrecognized value is logged and falls through to the default.
pub fn resolved_protocol(scope: AuthScope) -> AuthProtocol {
    static ACCOUNT: OnceLock<AuthProtocol> = OnceLock::new();
    static ACTOR: OnceLock<AuthProtocol> = OnceLock::new();

    let slot = match scope {
        AuthScope::Account => &ACCOUNT,
        AuthScope::Actor => &ACTOR,
    };
    *slot.get_or_init(|| {
        resolve_protocol(
            std::env::var(scope.env_var()).ok().as_deref(),
            file_protocol(scope).as_deref(),
            scope.default_protocol(),
        )
    })
}

/// Pure resolution step, separated from the environment for testability
fn resolve_protocol(
    env_value: Option<&str>,
    file_value: Option<&str>,
    default: AuthProtocol,
) -> AuthProtocol {
    let chosen = env_value.or(file_value);
    match chosen {
        None => default,
        Some(text) => text.parse().unwrap_or_else(|_| {
            warn!(value = text, "unrecognized auth protocol, using {default}");
            default
        }),
    }
}

fn file_protocol(scope: AuthScope) -> Option<String> {
    let path = config_file_path()?;
    let raw = std::fs::read_to_string(path).ok()?;
    let config: AuthFileConfig = toml::from_str(&raw)
        .map_err(|err| warn!("ignoring malformed auth config file: {err}"))
        .ok()?;
    match scope {
        AuthScope::Account => config.auth_account,
        AuthScope::Actor => config.auth_actor,
    }
}

fn config_file_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".conveyor").join("api.toml"))
}

/// A username/password pair with its scope and resolved protocol
///
/// The mutable access token is deliberately not stored here; it lives in the
/// client's [`crate::token::TokenStore`], keyed by `username` (the actor
/// client id).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub scope: AuthScope,
    pub protocol: AuthProtocol,
}

impl Credentials {
    /// Actor credentials for a tenant
    ///
    /// The tenant's own auth descriptor picks the protocol when it names a
    /// valid one; otherwise the process-wide Actor resolution applies.
    pub fn for_tenant(tenant: &Tenant) -> Self {
        let protocol = tenant
            .auth
            .scheme
            .parse()
            .unwrap_or_else(|_| resolved_protocol(AuthScope::Actor));
        Self {
            username: tenant.auth.client_id.clone(),
            password: tenant.auth.client_secret.clone(),
            scope: AuthScope::Actor,
            protocol,
        }
    }

    /// Account credentials for an API key (the key doubles as username and
    /// password)
    pub fn for_account(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            username: api_key.clone(),
            password: api_key,
            scope: AuthScope::Account,
            protocol: resolved_protocol(AuthScope::Account),
        }
    }

    /// Account credentials from the `CONVEYOR_API_KEY` environment variable
    pub fn from_api_key_env() -> Result<Self, ClientError> {
        let api_key = std::env::var(API_KEY_VAR)
            .map_err(|_| ClientError::AuthError(format!("{API_KEY_VAR} not set")))?;
        Ok(Self::for_account(api_key))
    }
}

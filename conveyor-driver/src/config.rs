//! Driver configuration
//!
//! Defines all configurable parameters for the driver including the polling
//! interval, queue mode, and tenant/account processing limits.

use std::collections::HashSet;
use std::time::Duration;

use uuid::Uuid;

use conveyor_client::QueueMode;

/// Driver configuration
///
/// The interval is wall-clock: a cycle that overruns it starts the next
/// cycle immediately rather than bursting to catch up.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Base URL of the queue API (e.g. "https://api.example.com/v2")
    pub base_url: String,

    /// How long one polling cycle should take end to end
    pub poll_interval: Duration,

    /// Which task queue surface to consume
    pub queue_mode: QueueMode,

    /// Integration name this driver serves; tenants of other integrations
    /// are filtered out
    pub integration: Option<String>,

    /// Tenant ids to limit processing to (empty = all available tenants)
    pub tenant_ids: HashSet<Uuid>,

    /// Account ids to limit processing to (empty = all accounts)
    pub account_ids: HashSet<Uuid>,
}

impl DriverConfig {
    /// Creates a new configuration with defaults
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            poll_interval: Duration::from_secs(30),
            queue_mode: QueueMode::Managed,
            integration: None,
            tenant_ids: HashSet::new(),
            account_ids: HashSet::new(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - CONVEYOR_URL (required)
    /// - CONVEYOR_POLL_INTERVAL (optional, default: 30)
    /// - CONVEYOR_POLL_INTERVAL_UNITS (optional, `millis`/`secs`/`mins`, default: secs)
    /// - CONVEYOR_QUEUE_MODE (optional, `managed`/`admin`, default: managed)
    /// - CONVEYOR_INTEGRATION (optional integration name)
    /// - CONVEYOR_TENANTS (optional, comma-delimited tenant ids)
    /// - CONVEYOR_ACCOUNTS (optional, comma-delimited account ids)
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("CONVEYOR_URL")
            .map_err(|_| anyhow::anyhow!("CONVEYOR_URL environment variable not set"))?;

        let mut config = Self::new(base_url);

        let interval = std::env::var("CONVEYOR_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);
        let units = std::env::var("CONVEYOR_POLL_INTERVAL_UNITS")
            .unwrap_or_else(|_| "secs".to_string());
        config.poll_interval = interval_from(interval, &units)?;

        if let Ok(mode) = std::env::var("CONVEYOR_QUEUE_MODE") {
            config.queue_mode = match mode.to_ascii_lowercase().as_str() {
                "managed" => QueueMode::Managed,
                "admin" => QueueMode::Admin,
                other => anyhow::bail!("unknown queue mode: {other}"),
            };
        }

        config.integration = std::env::var("CONVEYOR_INTEGRATION").ok();

        if let Ok(ids) = std::env::var("CONVEYOR_TENANTS") {
            config.set_tenant_ids(&ids)?;
        }
        if let Ok(ids) = std::env::var("CONVEYOR_ACCOUNTS") {
            config.set_account_ids(&ids)?;
        }

        Ok(config)
    }

    /// Parses a comma-delimited list of tenant ids to limit processing to
    pub fn set_tenant_ids(&mut self, ids: &str) -> anyhow::Result<()> {
        self.tenant_ids = parse_id_list(ids)?;
        Ok(())
    }

    /// Parses a comma-delimited list of account ids to limit processing to
    pub fn set_account_ids(&mut self, ids: &str) -> anyhow::Result<()> {
        self.account_ids = parse_id_list(ids)?;
        Ok(())
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("base_url cannot be empty");
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("base_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if let Some(integration) = &self.integration {
            if integration.is_empty() {
                anyhow::bail!("integration name cannot be empty when set");
            }
        }

        Ok(())
    }
}

fn interval_from(value: u64, units: &str) -> anyhow::Result<Duration> {
    let interval = match units.to_ascii_lowercase().as_str() {
        "ms" | "millis" | "milliseconds" => Duration::from_millis(value),
        "s" | "secs" | "seconds" => Duration::from_secs(value),
        "m" | "mins" | "minutes" => Duration::from_secs(value * 60),
        other => anyhow::bail!("unknown poll interval unit: {other}"),
    };
    Ok(interval)
}

fn parse_id_list(ids: &str) -> anyhow::Result<HashSet<Uuid>> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| Uuid::parse_str(id).map_err(|_| anyhow::anyhow!("invalid id: {id}")))
        .collect()
}

//! Driver scaffold
//!
//! Wires a [`DriverConfig`] into a ready-to-run poller: the HTTP client, the
//! account-credentialed tenant supplier (constrained to the driver's
//! integration), and the task queue for the configured mode. Applications
//! register their handlers and start the loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use conveyor_client::QueueClient;
use conveyor_client::auth::Credentials;

use crate::config::DriverConfig;
use crate::queue::HttpTaskQueue;
use crate::scheduler::{StopToken, TaskPoller};
use crate::tenants::TenantSupplier;

/// A configured Conveyor integration driver
pub struct Driver {
    config: DriverConfig,
    client: Arc<QueueClient>,
    poller: TaskPoller,
}

impl Driver {
    /// Creates a driver with explicit account credentials
    pub fn new(config: DriverConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;

        let client = Arc::new(QueueClient::new(config.base_url.clone()));

        let mut supplier = TenantSupplier::new(client.clone(), credentials)
            .for_accounts(config.account_ids.iter().copied())
            .for_tenants(config.tenant_ids.iter().copied());
        if let Some(integration) = &config.integration {
            supplier = supplier.for_integrations([integration.clone()]);
        }

        let queue = Arc::new(HttpTaskQueue::new(client.clone(), config.queue_mode));

        let mut poller = TaskPoller::new(Arc::new(supplier), queue);
        poller.set_poll_interval(config.poll_interval);

        Ok(Self {
            config,
            client,
            poller,
        })
    }

    /// Creates a driver using the `CONVEYOR_API_KEY` account credentials
    pub fn from_env(config: DriverConfig) -> Result<Self> {
        let credentials =
            Credentials::from_api_key_env().context("Failed to load account credentials")?;
        Self::new(config, credentials)
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The underlying HTTP client, e.g. for out-of-band API calls
    pub fn client(&self) -> Arc<QueueClient> {
        self.client.clone()
    }

    /// The poller, for handler and predicate registration
    pub fn poller_mut(&mut self) -> &mut TaskPoller {
        &mut self.poller
    }

    /// A handle that stops the driver at the next cycle boundary
    pub fn stop_token(&self) -> StopToken {
        self.poller.stop_token()
    }

    /// Runs the polling loop until stopped
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting driver: url={}, mode={:?}, interval={:?}",
            self.config.base_url, self.config.queue_mode, self.config.poll_interval
        );
        self.poller.poll().await
    }
}

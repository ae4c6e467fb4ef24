//! Tenant resolution
//!
//! Supplies the tenants to poll, re-resolved on every cycle so newly
//! provisioned or deactivated tenants are picked up without a restart.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use conveyor_client::auth::Credentials;
use conveyor_client::{Page, PageFetcher, Paginator, QueueClient, Result, TenantFilter};
use conveyor_core::domain::tenant::Tenant;

/// Produces the set of tenants for one polling cycle
#[async_trait]
pub trait TenantSource: Send + Sync {
    async fn resolve(&self) -> Result<Vec<Tenant>>;
}

/// Default [`TenantSource`]: lists the account's tenants from the server,
/// optionally limited to specific accounts, integrations, or tenants
///
/// When explicit tenant ids are supplied, listing is bypassed entirely and
/// each tenant is fetched individually. Otherwise the listing is paginated,
/// and the integration-name filter is re-applied client-side, exact and
/// case-sensitive, because the server-side filter is only a hint.
pub struct TenantSupplier {
    client: Arc<QueueClient>,
    credentials: Credentials,
    accounts: HashSet<Uuid>,
    integrations: HashSet<String>,
    tenant_ids: HashSet<Uuid>,
}

impl TenantSupplier {
    /// Creates a supplier using account credentials (API key)
    pub fn new(client: Arc<QueueClient>, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            accounts: HashSet::new(),
            integrations: HashSet::new(),
            tenant_ids: HashSet::new(),
        }
    }

    /// Return only tenants of specific accounts
    pub fn for_accounts(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.accounts.extend(ids);
        self
    }

    /// Return only tenants of specific integrations
    pub fn for_integrations(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.integrations.extend(names);
        self
    }

    /// Return only the specified tenants
    pub fn for_tenants(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.tenant_ids.extend(ids);
        self
    }

    async fn fetch_by_id(&self) -> Result<Vec<Tenant>> {
        let mut tenants = Vec::with_capacity(self.tenant_ids.len());
        for id in &self.tenant_ids {
            tenants.push(self.client.get_tenant(&self.credentials, *id).await?);
        }
        Ok(tenants)
    }

    async fn fetch_by_listing(&self) -> Result<Vec<Tenant>> {
        let filter = TenantFilter {
            accounts: self.accounts.iter().copied().collect(),
            integrations: self.integrations.iter().cloned().collect(),
        };
        let mut pages = Paginator::new(ListingFetcher {
            client: &self.client,
            credentials: &self.credentials,
            filter,
        });

        let mut tenants = Vec::new();
        while let Some(tenant) = pages.next().await? {
            // The server-side integration filter is not reliable; apply it
            // again here, exact and case-sensitive.
            if !self.integrations.is_empty() && !self.integrations.contains(&tenant.integration.name)
            {
                debug!(%tenant, "discarding tenant outside the integration filter");
                continue;
            }
            tenants.push(tenant);
        }
        Ok(tenants)
    }
}

#[async_trait]
impl TenantSource for TenantSupplier {
    async fn resolve(&self) -> Result<Vec<Tenant>> {
        if self.tenant_ids.is_empty() {
            self.fetch_by_listing().await
        } else {
            self.fetch_by_id().await
        }
    }
}

struct ListingFetcher<'a> {
    client: &'a QueueClient,
    credentials: &'a Credentials,
    filter: TenantFilter,
}

#[async_trait]
impl PageFetcher for ListingFetcher<'_> {
    type Item = Tenant;

    async fn fetch(&mut self, page: usize) -> Result<Page<Tenant>> {
        self.client
            .list_tenants(self.credentials, &self.filter, page)
            .await
    }
}

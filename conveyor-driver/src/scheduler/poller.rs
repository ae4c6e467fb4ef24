//! Task poller
//!
//! Polls the queue for each tenant and dispatches tasks to registered
//! handlers. Register a handler per task kind with
//! [`TaskPoller::set_handler`], or a default with
//! [`TaskPoller::set_default_handler`]; the handler's return value becomes
//! the task's acknowledgement.
//!
//! One logical flow drives the whole cycle: tenants, pages, and tasks are
//! visited sequentially, so within a tenant tasks are acknowledged in the
//! exact order the server delivered them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use conveyor_client::paging::{Page, PageFetcher, Paginator};
use conveyor_client::{ClientError, QueueMode};
use conveyor_core::domain::ack::{AckStatus, TaskAck};
use conveyor_core::domain::task::{Task, TaskKind};
use conveyor_core::domain::tenant::Tenant;

use crate::handler::TaskHandler;
use crate::queue::TaskQueue;
use crate::tenants::TenantSource;

/// Cooperative cancellation handle for the polling loop
///
/// Checked at exactly one point: the top of each polling cycle. In-flight
/// per-tenant work is never interrupted mid-cycle.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to stop at the next cycle boundary
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Decides whether a tenant is polled this cycle (e.g. "is this tenant
/// currently enabled in our system?")
pub type TenantPredicate = Box<dyn Fn(&Tenant) -> bool + Send + Sync>;

/// Task poller that continuously polls tenants and dispatches their tasks
pub struct TaskPoller {
    tenants: Arc<dyn TenantSource>,
    queue: Arc<dyn TaskQueue>,
    handlers: HashMap<TaskKind, Arc<dyn TaskHandler>>,
    default_handler: Option<Arc<dyn TaskHandler>>,
    predicate: Option<TenantPredicate>,
    interval: Duration,
    stop: StopToken,
}

impl TaskPoller {
    /// Creates a new poller
    pub fn new(tenants: Arc<dyn TenantSource>, queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            tenants,
            queue,
            handlers: HashMap::new(),
            default_handler: None,
            predicate: None,
            interval: Duration::from_secs(30),
            stop: StopToken::new(),
        }
    }

    /// Register a handler for one task kind
    pub fn set_handler(&mut self, kind: TaskKind, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Register the handler called when no kind-specific handler is
    /// registered
    pub fn set_default_handler(&mut self, handler: Arc<dyn TaskHandler>) {
        self.default_handler = Some(handler);
    }

    /// Skip tenants failing this predicate for the cycle, fetching and
    /// acknowledging nothing for them
    pub fn set_tenant_predicate(
        &mut self,
        predicate: impl Fn(&Tenant) -> bool + Send + Sync + 'static,
    ) {
        self.predicate = Some(Box::new(predicate));
    }

    /// Set the wall-clock polling interval
    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// A handle that stops the loop at the next cycle boundary
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Runs the polling loop until stopped
    ///
    /// Each cycle resolves the tenant set fresh and drains every accepted
    /// tenant's backlog. If the cycle finishes early the remainder of the
    /// interval is slept away; an overrunning cycle rolls straight into the
    /// next one.
    ///
    /// A tenant-resolution failure aborts the loop; without knowing which
    /// tenants to poll the cycle cannot proceed. The caller decides whether
    /// to log and restart with backoff.
    pub async fn poll(&self) -> Result<()> {
        info!("Starting task poller (interval: {:?})", self.interval);

        loop {
            if self.stop.is_stopped() {
                info!("Stop requested; leaving polling loop");
                return Ok(());
            }

            let started = Instant::now();
            self.poll_tenants().await?;

            if let Some(remaining) = self.interval.checked_sub(started.elapsed()) {
                debug!("Next poll in {:?}", remaining);
                tokio::time::sleep(remaining).await;
            }
        }
    }

    /// Performs a single polling cycle over all tenants
    async fn poll_tenants(&self) -> Result<()> {
        let tenants = self
            .tenants
            .resolve()
            .await
            .context("Failed to resolve tenants")?;

        debug!("Polling {} tenant(s)", tenants.len());

        for tenant in tenants {
            if let Some(predicate) = &self.predicate {
                if !predicate(&tenant) {
                    debug!("Skipping {tenant}: rejected by predicate");
                    continue;
                }
            }

            info!("Polling: {tenant}");
            if let Err(e) = self.drain_tenant(&tenant).await {
                // Absorbed so one tenant's failure cannot stall the rest
                error!("Error processing tasks for {tenant}: {e:#}");
            }
        }

        Ok(())
    }

    /// Drains a tenant's entire backlog, page by page
    ///
    /// Every task is acknowledged synchronously, in delivery order, before
    /// the next page is requested, except `Retry` outcomes on the admin
    /// queue, which stay enqueued by simply not being acknowledged. (The
    /// managed queue blocks delivery until every outstanding task is
    /// acknowledged, so there the ack is always sent.)
    async fn drain_tenant(&self, tenant: &Tenant) -> Result<()> {
        let mut pages = Paginator::new(QueueFetcher {
            queue: self.queue.as_ref(),
            tenant,
        });

        let mut handled = 0usize;
        while let Some(task) = pages.next().await? {
            let ack = self.dispatch(tenant, &task).await;

            if self.queue.mode() == QueueMode::Admin && ack.status == AckStatus::Retry {
                debug!("Leaving task {} queued for redelivery", task.id());
                continue;
            }

            self.queue
                .acknowledge(tenant, task.id(), &ack)
                .await
                .context("Failed to acknowledge task")?;
            handled += 1;
        }

        debug!("Acknowledged {handled} task(s) for {tenant}");
        Ok(())
    }

    /// Dispatches one task and converts the outcome to an acknowledgement
    ///
    /// A task kind with no registered handler and no default is trivially
    /// successful. A handler failure becomes an `error` acknowledgement,
    /// never `retry`, which would requeue the task indefinitely and stall
    /// the tenant's queue.
    ///
    /// There is no timeout here: a hung handler blocks the polling loop.
    async fn dispatch(&self, tenant: &Tenant, task: &Task) -> TaskAck {
        let handler = self
            .handlers
            .get(&task.kind())
            .or(self.default_handler.as_ref());

        let Some(handler) = handler else {
            return TaskAck::success();
        };

        match handler.handle(tenant, task).await {
            Ok(ack) => ack,
            Err(e) => {
                warn!("Handler failed for task {}: {e:#}", task.id());
                TaskAck::error(format!("{e:#}"))
            }
        }
    }
}

/// Adapts a [`TaskQueue`] to the pagination engine for one tenant
struct QueueFetcher<'a> {
    queue: &'a dyn TaskQueue,
    tenant: &'a Tenant,
}

#[async_trait]
impl PageFetcher for QueueFetcher<'_> {
    type Item = Task;

    async fn fetch(&mut self, page: usize) -> std::result::Result<Page<Task>, ClientError> {
        self.queue.fetch_page(self.tenant, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;
    use uuid::Uuid;

    use conveyor_core::domain::task::TaskAction;
    use conveyor_core::domain::tenant::{AccountRef, AuthDescriptor, IntegrationRef};

    fn tenant(name: &str) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: name.to_string(),
            account: AccountRef {
                id: Uuid::new_v4(),
                name: "Acme SIS".to_string(),
            },
            integration: IntegrationRef {
                name: "roster-sync".to_string(),
            },
            cloud: None,
            auth: AuthDescriptor {
                scheme: "oauth2".to_string(),
                client_id: "actor-1".to_string(),
                client_secret: "secret".to_string(),
            },
        }
    }

    fn task(action: &str) -> Task {
        Task::decode(&json!({
            "schema": "3.0",
            "type": "data_event",
            "id": Uuid::new_v4().to_string(),
            "action": action,
            "object_type": "RDM:Student",
        }))
        .unwrap()
    }

    struct FixedTenants(Vec<Tenant>);

    #[async_trait]
    impl TenantSource for FixedTenants {
        async fn resolve(&self) -> std::result::Result<Vec<Tenant>, ClientError> {
            Ok(self.0.clone())
        }
    }

    struct FailingTenants;

    #[async_trait]
    impl TenantSource for FailingTenants {
        async fn resolve(&self) -> std::result::Result<Vec<Tenant>, ClientError> {
            Err(ClientError::api_error(500, "listing unavailable"))
        }
    }

    /// In-memory queue: serves a fixed page script per call to `fetch_page`
    /// and records every fetch and acknowledgement
    struct FakeQueue {
        pages: Vec<Page<Task>>,
        mode: QueueMode,
        fetches: Mutex<Vec<usize>>,
        acks: Mutex<Vec<(Uuid, TaskAck)>>,
    }

    impl FakeQueue {
        fn new(pages: Vec<Page<Task>>, mode: QueueMode) -> Self {
            Self {
                pages,
                mode,
                fetches: Mutex::new(Vec::new()),
                acks: Mutex::new(Vec::new()),
            }
        }

        fn acks(&self) -> Vec<(Uuid, TaskAck)> {
            self.acks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskQueue for FakeQueue {
        async fn fetch_page(
            &self,
            _tenant: &Tenant,
            page: usize,
        ) -> std::result::Result<Page<Task>, ClientError> {
            self.fetches.lock().unwrap().push(page);
            Ok(self.pages.get(page).cloned().unwrap_or_else(Page::empty))
        }

        async fn acknowledge(
            &self,
            _tenant: &Tenant,
            task_id: Uuid,
            ack: &TaskAck,
        ) -> std::result::Result<(), ClientError> {
            self.acks.lock().unwrap().push((task_id, ack.clone()));
            Ok(())
        }

        fn mode(&self) -> QueueMode {
            self.mode
        }
    }

    /// Maps actions to scripted acknowledgements; `Delete` fails outright
    struct ScriptedHandler;

    #[async_trait]
    impl TaskHandler for ScriptedHandler {
        async fn handle(&self, _tenant: &Tenant, task: &Task) -> anyhow::Result<TaskAck> {
            match task.action() {
                TaskAction::Add => Ok(TaskAck::success()),
                TaskAction::Delete => Ok(TaskAck::retry()),
                _ => anyhow::bail!("boom"),
            }
        }
    }

    fn poller(queue: Arc<FakeQueue>) -> TaskPoller {
        TaskPoller::new(Arc::new(FixedTenants(vec![tenant("District 9")])), queue)
    }

    #[tokio::test]
    async fn test_empty_backlog_is_one_listing_and_no_acks() {
        let queue = Arc::new(FakeQueue::new(vec![Page::empty()], QueueMode::Managed));
        let poller = poller(queue.clone());

        poller.poll_tenants().await.unwrap();

        assert_eq!(*queue.fetches.lock().unwrap(), vec![0]);
        assert!(queue.acks().is_empty());
    }

    #[tokio::test]
    async fn test_tasks_acknowledged_in_delivery_order() {
        let first = task("add");
        let second = task("add");
        let third = task("add");
        let expected: Vec<Uuid> = [&first, &second, &third].iter().map(|t| t.id()).collect();

        let queue = Arc::new(FakeQueue::new(
            vec![
                Page::new(vec![first, second], true),
                Page::new(vec![third], false),
            ],
            QueueMode::Managed,
        ));
        let mut poller = poller(queue.clone());
        poller.set_default_handler(Arc::new(ScriptedHandler));

        poller.poll_tenants().await.unwrap();

        let acked: Vec<Uuid> = queue.acks().iter().map(|(id, _)| *id).collect();
        assert_eq!(acked, expected);
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_error_ack_and_does_not_stop_the_page() {
        // "set" makes ScriptedHandler bail; the following "add" must still run
        let failing = task("set");
        let following = task("add");
        let queue = Arc::new(FakeQueue::new(
            vec![Page::new(vec![failing.clone(), following.clone()], false)],
            QueueMode::Managed,
        ));
        let mut poller = poller(queue.clone());
        poller.set_default_handler(Arc::new(ScriptedHandler));

        poller.poll_tenants().await.unwrap();

        let acks = queue.acks();
        assert_eq!(acks.len(), 2);
        assert_eq!(acks[0].0, failing.id());
        assert_eq!(acks[0].1.status, AckStatus::Error);
        assert!(acks[0].1.message.as_deref().unwrap_or_default().contains("boom"));
        assert_eq!(acks[1].0, following.id());
        assert_eq!(acks[1].1.status, AckStatus::Success);
    }

    #[tokio::test]
    async fn test_retry_skips_ack_on_admin_queue_only() {
        // Two pages of one task each: ADD then DELETE (handler says retry)
        let pages = |tasks: (Task, Task)| {
            vec![
                Page::new(vec![tasks.0], true),
                Page::new(vec![tasks.1], false),
            ]
        };

        let admin = Arc::new(FakeQueue::new(
            pages((task("add"), task("delete"))),
            QueueMode::Admin,
        ));
        let mut admin_poller = poller(admin.clone());
        admin_poller.set_default_handler(Arc::new(ScriptedHandler));
        admin_poller.poll_tenants().await.unwrap();
        assert_eq!(admin.acks().len(), 1);

        let managed = Arc::new(FakeQueue::new(
            pages((task("add"), task("delete"))),
            QueueMode::Managed,
        ));
        let mut managed_poller = poller(managed.clone());
        managed_poller.set_default_handler(Arc::new(ScriptedHandler));
        managed_poller.poll_tenants().await.unwrap();

        let acks = managed.acks();
        assert_eq!(acks.len(), 2);
        assert_eq!(acks[1].1.status, AckStatus::Retry);
    }

    #[tokio::test]
    async fn test_unhandled_kind_is_trivially_successful() {
        let queue = Arc::new(FakeQueue::new(
            vec![Page::new(vec![task("add")], false)],
            QueueMode::Managed,
        ));
        // No handlers registered at all
        let poller = poller(queue.clone());

        poller.poll_tenants().await.unwrap();

        let acks = queue.acks();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].1.status, AckStatus::Success);
    }

    #[tokio::test]
    async fn test_rejected_tenant_is_not_fetched() {
        let queue = Arc::new(FakeQueue::new(
            vec![Page::new(vec![task("add")], false)],
            QueueMode::Managed,
        ));
        let mut poller = poller(queue.clone());
        poller.set_tenant_predicate(|_| false);

        poller.poll_tenants().await.unwrap();

        assert!(queue.fetches.lock().unwrap().is_empty());
        assert!(queue.acks().is_empty());
    }

    #[tokio::test]
    async fn test_tenant_resolution_failure_propagates() {
        let queue = Arc::new(FakeQueue::new(Vec::new(), QueueMode::Managed));
        let poller = TaskPoller::new(Arc::new(FailingTenants), queue);

        assert!(poller.poll_tenants().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_token_halts_the_loop() {
        let queue = Arc::new(FakeQueue::new(vec![Page::empty()], QueueMode::Managed));
        let poller = poller(queue);
        let stop = poller.stop_token();

        stop.stop();
        // Stop is checked at the cycle boundary, so poll returns immediately
        poller.poll().await.unwrap();
    }
}

//! Task queue seam
//!
//! The scheduler talks to the queue through this trait so it can be tested
//! against in-memory fakes; [`HttpTaskQueue`] is the production
//! implementation over [`conveyor_client::QueueClient`].

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use conveyor_client::{DEFAULT_PAGE_SIZE, Page, QueueClient, QueueMode, Result};
use conveyor_core::domain::ack::TaskAck;
use conveyor_core::domain::task::Task;
use conveyor_core::domain::tenant::Tenant;

/// Fetches and acknowledges tasks for a tenant
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Fetch one page of pending tasks, oldest first
    async fn fetch_page(&self, tenant: &Tenant, page: usize) -> Result<Page<Task>>;

    /// Report the outcome of one task
    async fn acknowledge(&self, tenant: &Tenant, task_id: Uuid, ack: &TaskAck) -> Result<()>;

    /// Which queue surface this implementation consumes
    fn mode(&self) -> QueueMode;
}

/// HTTP implementation of [`TaskQueue`]
pub struct HttpTaskQueue {
    client: Arc<QueueClient>,
    mode: QueueMode,
    page_size: u32,
}

impl HttpTaskQueue {
    /// Creates a queue over an HTTP client
    pub fn new(client: Arc<QueueClient>, mode: QueueMode) -> Self {
        Self {
            client,
            mode,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Requests a specific page size; only the admin queue honors it
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl TaskQueue for HttpTaskQueue {
    async fn fetch_page(&self, tenant: &Tenant, page: usize) -> Result<Page<Task>> {
        self.client
            .list_tasks(tenant, self.mode, page, self.page_size)
            .await
    }

    async fn acknowledge(&self, tenant: &Tenant, task_id: Uuid, ack: &TaskAck) -> Result<()> {
        self.client
            .acknowledge_task(tenant, self.mode, task_id, ack)
            .await
    }

    fn mode(&self) -> QueueMode {
        self.mode
    }
}

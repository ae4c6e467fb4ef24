//! Task handler trait
//!
//! Implementations apply a task to the consuming application and report the
//! outcome. Delivery is at-least-once: the server may redeliver a task it
//! already delivered, so handlers must be idempotent.

use async_trait::async_trait;

use conveyor_core::domain::ack::TaskAck;
use conveyor_core::domain::task::Task;
use conveyor_core::domain::tenant::Tenant;

/// Handles one task for one tenant
///
/// The returned acknowledgement is reported to the server verbatim. An `Err`
/// makes the poller acknowledge the task as `error` (never `retry`), so a
/// crashing handler cannot wedge the tenant's queue behind an endlessly
/// redelivered task.
///
/// For `Add` outcomes the acknowledgement may carry the application-assigned
/// identifier of the created record via
/// [`TaskAck::with_app_id`](conveyor_core::domain::ack::TaskAck::with_app_id).
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, tenant: &Tenant, task: &Task) -> anyhow::Result<TaskAck>;
}

//! Minimal driver wiring: polls every tenant of an integration and prints
//! each task, acknowledging success.
//!
//! Expects CONVEYOR_URL and CONVEYOR_API_KEY in the environment; see
//! `DriverConfig::from_env` for the rest.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conveyor_core::domain::ack::TaskAck;
use conveyor_core::domain::task::Task;
use conveyor_core::domain::tenant::Tenant;
use conveyor_driver::{Driver, DriverConfig, TaskHandler};

struct PrintHandler;

#[async_trait]
impl TaskHandler for PrintHandler {
    async fn handle(&self, tenant: &Tenant, task: &Task) -> Result<TaskAck> {
        info!(
            "{tenant}: {:?} {:?} topic={}",
            task.kind(),
            task.action(),
            task.topic().map(ToString::to_string).unwrap_or_default()
        );
        Ok(TaskAck::success())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "print_tasks=info,conveyor_driver=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DriverConfig::from_env()?;
    let mut driver = Driver::from_env(config)?;
    driver.poller_mut().set_default_handler(Arc::new(PrintHandler));

    driver.run().await
}

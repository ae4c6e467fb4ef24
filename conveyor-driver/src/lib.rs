//! Conveyor Driver
//!
//! The polling driver SDK for the Conveyor task queue.
//!
//! Architecture:
//! - Configuration: driver settings from environment or defaults
//! - Tenants: resolves which tenants to poll, fresh every cycle
//! - Queue: the task fetch/acknowledge seam over the HTTP client
//! - Scheduler: the polling loop, handler dispatch, and acknowledgement
//!
//! The driver polls the queue for each of its tenants, hands every task to
//! the handler registered for the task's kind, and acknowledges the outcome
//! before asking for more. Delivery is at-least-once: handlers must process
//! tasks idempotently.
//!
//! # Example
//!
//! ```no_run
//! use conveyor_driver::{Driver, DriverConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DriverConfig::from_env()?;
//!     let mut driver = Driver::from_env(config)?;
//!     // Register handlers on driver.poller_mut(), then:
//!     driver.run().await
//! }
//! ```

pub mod config;
pub mod driver;
pub mod handler;
pub mod queue;
pub mod scheduler;
pub mod tenants;

pub use config::DriverConfig;
pub use driver::Driver;
pub use handler::TaskHandler;
pub use queue::{HttpTaskQueue, TaskQueue};
pub use scheduler::{StopToken, TaskPoller};
pub use tenants::{TenantSource, TenantSupplier};

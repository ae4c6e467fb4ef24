//! Scheduler layer for the driver
//!
//! This layer runs the polling loop: it resolves the tenant set, drains each
//! tenant's task backlog, dispatches tasks to handlers, and acknowledges
//! outcomes in order.

pub mod poller;

pub use poller::{StopToken, TaskPoller};

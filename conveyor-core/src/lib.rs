//! Conveyor Core
//!
//! Core types for the Conveyor task-queue client.
//!
//! This crate contains:
//! - Domain types: tasks, topics, tenants, and acknowledgements
//! - DTOs: wire shapes exchanged with the remote queue API
//!
//! Note: all network I/O lives in `conveyor-client`; the polling driver
//! lives in `conveyor-driver`.

pub mod domain;
pub mod dto;

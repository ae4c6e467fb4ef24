//! Core domain types
//!
//! This module contains the domain structures shared across Conveyor crates.
//! Tasks are decoded here from their raw wire payloads; the client and the
//! driver only ever see the canonical shapes.

pub mod ack;
pub mod task;
pub mod tenant;
pub mod topic;

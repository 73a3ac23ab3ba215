//! jirastat exporter library entry.
//!
//! This crate wires the upstream client, the poller, the per-cycle aggregator
//! and the HTTP exposition into one service. It is intended to be consumed by
//! the binary (`main.rs`) and by integration tests.

pub mod aggregate;
pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod poller;
pub mod router;
pub mod upstream;

//! jirastat core: the issue wire model, the changelog-to-duration reducer, and
//! the error surface shared by the exporter.
//!
//! This crate carries no transport or runtime dependencies. Everything here is
//! a pure function of the upstream issue records, which keeps the reducer easy
//! to test against recorded issue payloads.
//!
//! # Failure surface
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! A malformed changelog surfaces as a per-issue [`ChangelogError`] so one bad
//! record never takes the polling process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod changelog;
pub mod error;
pub mod model;

pub use changelog::{status_durations, ChangeItem, FieldValue, HistoryEntry, StatusDurations};
/// Shared result type.
pub use error::{ChangelogError, ErrorClass, JiraStatError, Result};
pub use model::{Issue, SearchPage, Timestamp};

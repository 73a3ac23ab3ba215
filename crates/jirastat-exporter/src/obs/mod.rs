//! In-process metrics.
//!
//! Metric primitives are stored as atomics and rendered by the `/metrics`
//! handler in the Prometheus text exposition format.

pub mod metrics;

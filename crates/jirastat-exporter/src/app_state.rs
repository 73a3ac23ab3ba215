//! Shared application state for the exporter.
//!
//! Cloned into every axum handler; all members are `Arc`s shared with the
//! background poller.

use std::sync::Arc;

use jirastat_core::error::Result;

use crate::aggregate::MetricsStore;
use crate::config::ExporterConfig;
use crate::obs::metrics::ExporterMetrics;
use crate::upstream::{IssueSource, JiraClient};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<MetricsStore>,
    metrics: Arc<ExporterMetrics>,
    source: Arc<dyn IssueSource>,
}

impl AppState {
    /// Build application state backed by the Jira client.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: &ExporterConfig) -> Result<Self> {
        let client = JiraClient::new(cfg)?;
        tracing::info!(jql = %client.jql(), url = %cfg.jira.url, "upstream configured");
        Ok(Self::with_source(Arc::new(client)))
    }

    /// Build state around any issue source (tests use scripted sources).
    pub fn with_source(source: Arc<dyn IssueSource>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store: Arc::new(MetricsStore::new()),
                metrics: Arc::new(ExporterMetrics::default()),
                source,
            }),
        }
    }

    pub fn store(&self) -> Arc<MetricsStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn metrics(&self) -> Arc<ExporterMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn source(&self) -> Arc<dyn IssueSource> {
        Arc::clone(&self.inner.source)
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }
}

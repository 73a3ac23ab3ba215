//! Background refresh loop.
//!
//! Each cycle fetches every page, folds the issues into a fresh
//! [`Aggregator`], and publishes the result. A failed fetch publishes nothing,
//! so scrapes keep serving the previous cycle until the next attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use jirastat_core::error::Result;

use crate::aggregate::{Aggregator, MetricsStore};
use crate::obs::metrics::ExporterMetrics;
use crate::upstream::{fetch_all, IssueSource};

/// Outcome of one published cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub issues: usize,
    pub malformed: usize,
    pub elapsed: Duration,
}

pub struct Poller {
    source: Arc<dyn IssueSource>,
    store: Arc<MetricsStore>,
    metrics: Arc<ExporterMetrics>,
    refresh_period: Duration,
}

impl Poller {
    pub fn new(
        source: Arc<dyn IssueSource>,
        store: Arc<MetricsStore>,
        metrics: Arc<ExporterMetrics>,
        refresh_period: Duration,
    ) -> Self {
        Self { source, store, metrics, refresh_period }
    }

    /// Run one fetch + rebuild + publish cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();

        let fetched = fetch_all(self.source.as_ref(), &self.metrics).await;

        let issues = match fetched {
            Ok(issues) => issues,
            Err(e) => {
                let elapsed = started.elapsed();
                self.metrics.refreshes.inc(&[("outcome", "error")]);
                self.metrics.refresh_duration.observe(&[("outcome", "error")], elapsed);
                return Err(e);
            }
        };

        let mut agg = Aggregator::new(Arc::clone(&self.metrics));
        for issue in &issues {
            agg.record_issue(issue);
        }
        let report = CycleReport {
            issues: agg.issues(),
            malformed: agg.malformed(),
            elapsed: started.elapsed(),
        };
        self.store.publish(agg.finish());

        self.metrics.refreshes.inc(&[("outcome", "ok")]);
        self.metrics
            .refresh_duration
            .observe(&[("outcome", "ok")], report.elapsed);
        self.metrics
            .set_last_refresh(report.issues, chrono::Utc::now().timestamp());

        Ok(report)
    }

    /// Poll until `shutdown` flips to `true`. The first cycle runs immediately;
    /// an in-flight cycle always completes before the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(period = ?self.refresh_period, "poller started");
        loop {
            match self.run_cycle().await {
                Ok(r) => tracing::info!(
                    issues = r.issues,
                    malformed = r.malformed,
                    elapsed = ?r.elapsed,
                    "refresh published"
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    class = e.class().as_str(),
                    "refresh failed; keeping previous snapshot"
                ),
            }

            if !self.sleep_unless_shutdown(&mut shutdown).await {
                break;
            }
        }
        tracing::info!("poller stopped");
    }

    /// Wait one refresh period. Returns `false` if shutdown was requested (or
    /// its sender dropped) first.
    async fn sleep_unless_shutdown(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return false;
        }
        let sleep = tokio::time::sleep(self.refresh_period);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        return false;
                    }
                }
            }
        }
    }
}

//! Per-cycle aggregation of issue records into metric collections.
//!
//! An [`Aggregator`] is private to one poll cycle. When the cycle is complete
//! it is turned into an immutable [`IssueMetrics`] snapshot and handed to the
//! [`MetricsStore`], which swaps the published pointer in one step. Scrapes
//! clone the current `Arc`, so they see one whole cycle or the one before it.

use std::sync::Arc;

use parking_lot::RwLock;

use jirastat_core::{Issue, StatusDurations};

use crate::obs::metrics::{exponential_buckets, ExporterMetrics, GaugeVec, HistogramVec};

pub const ISSUE_COUNT: &str = "jira_issue_count";
pub const TIME_IN_STATUS: &str = "jira_issue_time_in_status";

/// Label names of the count family.
pub const COUNT_LABELS: [&str; 6] = [
    "project",
    "priority",
    "status",
    "statusCategory",
    "assignee",
    "issueType",
];

/// Label names of the duration family. Status is not one of them, so every
/// exited status of an issue lands in the same series.
pub const DURATION_LABELS: [&str; 4] = ["project", "priority", "assignee", "issueType"];

/// Duration buckets in seconds: 1s up to 1e7s (~115 days).
pub fn duration_buckets() -> Vec<f64> {
    exponential_buckets(1.0, 10.0, 8)
}

/// One complete cycle's metric collections.
pub struct IssueMetrics {
    pub issue_count: GaugeVec,
    pub time_in_status: HistogramVec,
}

impl Default for IssueMetrics {
    fn default() -> Self {
        Self {
            issue_count: GaugeVec::default(),
            time_in_status: HistogramVec::new(duration_buckets()),
        }
    }
}

impl IssueMetrics {
    /// Render both families in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        self.issue_count
            .render(ISSUE_COUNT, "Count of Jira issues by various labels.", out);
        self.time_in_status
            .render(TIME_IN_STATUS, "Time spent by issues in each status.", out);
    }
}

fn count_labels(issue: &Issue) -> [(&'static str, &str); 6] {
    [
        (COUNT_LABELS[0], issue.project()),
        (COUNT_LABELS[1], issue.priority()),
        (COUNT_LABELS[2], issue.status()),
        (COUNT_LABELS[3], issue.status_category()),
        (COUNT_LABELS[4], issue.assignee()),
        (COUNT_LABELS[5], issue.issue_type()),
    ]
}

fn duration_labels(issue: &Issue) -> [(&'static str, &str); 4] {
    [
        (DURATION_LABELS[0], issue.project()),
        (DURATION_LABELS[1], issue.priority()),
        (DURATION_LABELS[2], issue.assignee()),
        (DURATION_LABELS[3], issue.issue_type()),
    ]
}

/// Builds the next cycle's [`IssueMetrics`].
pub struct Aggregator {
    metrics: IssueMetrics,
    exporter: Arc<ExporterMetrics>,
    issues: usize,
    malformed: usize,
}

impl Aggregator {
    pub fn new(exporter: Arc<ExporterMetrics>) -> Self {
        Self {
            metrics: IssueMetrics::default(),
            exporter,
            issues: 0,
            malformed: 0,
        }
    }

    /// Count the issue under its current 6-dimension label set.
    pub fn record_issue_snapshot(&mut self, issue: &Issue) {
        self.metrics.issue_count.inc(&count_labels(issue));
        self.issues += 1;
    }

    /// One observation per exited status under the 4-dimension label set.
    pub fn record_durations(&mut self, issue: &Issue, durations: &StatusDurations) {
        let labels = duration_labels(issue);
        for spent in durations.values() {
            self.metrics.time_in_status.observe(&labels, *spent);
        }
    }

    /// Count the issue, reduce its changelog and record the durations.
    ///
    /// A changelog defect skips only this issue's durations; its count is kept
    /// and the defect is logged and counted here.
    pub fn record_issue(&mut self, issue: &Issue) {
        self.record_issue_snapshot(issue);
        match issue.status_durations() {
            Ok(durations) => self.record_durations(issue, &durations),
            Err(e) => {
                tracing::warn!(issue = %issue.key, error = %e, "skipping durations for malformed issue");
                self.malformed += 1;
                self.exporter
                    .malformed_issues
                    .inc(&[("project", issue.project())]);
            }
        }
    }

    /// Issues recorded so far.
    pub fn issues(&self) -> usize {
        self.issues
    }

    /// Issues whose durations were skipped.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    pub fn finish(self) -> IssueMetrics {
        self.metrics
    }
}

/// Published snapshot holder shared by the poller and the HTTP handlers.
pub struct MetricsStore {
    current: RwLock<Arc<IssueMetrics>>,
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsStore {
    pub fn new() -> Self {
        Self { current: RwLock::new(Arc::new(IssueMetrics::default())) }
    }

    /// Replace the published snapshot in one step.
    pub fn publish(&self, next: IssueMetrics) {
        let next = Arc::new(next);
        *self.current.write() = next;
    }

    /// The snapshot a reader should render. Never partially built.
    pub fn current(&self) -> Arc<IssueMetrics> {
        Arc::clone(&self.current.read())
    }

    /// Render the current snapshot followed by the exporter's own metrics.
    pub fn render(&self, exporter: &ExporterMetrics) -> String {
        let snapshot = self.current();
        let mut out = String::new();
        snapshot.render(&mut out);
        exporter.render(&mut out);
        out
    }
}

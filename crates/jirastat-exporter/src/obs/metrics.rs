//! Minimal metrics registry for the exporter.
//!
//! Provides counter/gauge/histogram vectors with dynamic labels backed by
//! `DashMap`. Labels are flattened into key vectors in the order the caller
//! declares them, and series are rendered sorted so scrapes are deterministic.
//! Histogram sums are accumulated in microseconds to avoid floating point
//! atomics and rendered in seconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn series(name: &str, labels: &str) -> String {
    if labels.is_empty() {
        name.to_string()
    } else {
        format!("{name}{{{labels}}}")
    }
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

/// Render a float the way Prometheus clients do for bucket bounds.
fn fmt_f64(v: f64) -> String {
    if v.is_infinite() {
        "+Inf".to_string()
    } else {
        format!("{}", v)
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for a label set (0 when never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, name: &str, help: &str, out: &mut String) {
        header(out, name, help, "counter");
        let mut rows: Vec<(String, u64)> = self
            .map
            .iter()
            .map(|r| (label_str(r.key()), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (labels, val) in rows {
            let _ = writeln!(out, "{} {}", series(name, &labels), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    /// Number of distinct label sets.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, name: &str, help: &str, out: &mut String) {
        header(out, name, help, "gauge");
        let mut rows: Vec<(String, i64)> = self
            .map
            .iter()
            .map(|r| (label_str(r.key()), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (labels, val) in rows {
            let _ = writeln!(out, "{} {}", series(name, &labels), val);
        }
    }
}

/// `count` bucket bounds starting at `start`, each `factor` times the last.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(count);
    let mut next = start;
    for _ in 0..count {
        out.push(next);
        next *= factor;
    }
    out
}

struct AtomicHistogram {
    count: AtomicU64,
    sum_micros: AtomicU64,
    buckets: Box<[AtomicU64]>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_micros: AtomicU64::new(0),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

/// Snapshot of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSample {
    pub count: u64,
    pub sum_seconds: f64,
    /// Cumulative counts, one per bucket bound.
    pub buckets: Vec<u64>,
}

pub struct HistogramVec {
    bounds: Vec<f64>,
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Bucket bounds are in seconds and must be ascending.
    pub fn new(bounds: Vec<f64>) -> Self {
        Self { bounds, map: DashMap::new() }
    }

    /// Observe a duration and increment cumulative buckets.
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let n = self.bounds.len();
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicHistogram::new(n));
        let secs = duration.as_secs_f64();
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum_micros.fetch_add(micros, Ordering::Relaxed);

        // Cumulative buckets: increment every bucket whose bound covers the value.
        for (i, &le) in self.bounds.iter().enumerate() {
            if secs <= le {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn sample(&self, labels: &[(&str, &str)]) -> Option<HistogramSample> {
        self.map.get(&label_key(labels)).map(|h| HistogramSample {
            count: h.count.load(Ordering::Relaxed),
            sum_seconds: h.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
            buckets: h.buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect(),
        })
    }

    /// Number of distinct label sets.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Total observations across every label set.
    pub fn total_count(&self) -> u64 {
        self.map
            .iter()
            .map(|r| r.value().count.load(Ordering::Relaxed))
            .sum()
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    pub fn render(&self, name: &str, help: &str, out: &mut String) {
        header(out, name, help, "histogram");
        let mut keys: Vec<LabelKey> = self.map.iter().map(|r| r.key().clone()).collect();
        keys.sort();

        for key in keys {
            let Some(hist) = self.map.get(&key) else { continue };
            let labels = label_str(&key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (i, &le) in self.bounds.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, fmt_f64(le), count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count);

            let sum = hist.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
            let _ = writeln!(out, "{} {}", series(&format!("{name}_sum"), &labels), sum);
            let _ = writeln!(out, "{} {}", series(&format!("{name}_count"), &labels), count);
        }
    }
}

/// Exporter self-observability, updated live by the poller and the probes.
pub struct ExporterMetrics {
    pub refreshes: CounterVec,
    pub refresh_duration: HistogramVec,
    pub upstream_requests: CounterVec,
    pub malformed_issues: CounterVec,
    issues_last_refresh: AtomicI64,
    last_refresh_unix: AtomicI64,
    draining: std::sync::atomic::AtomicBool,
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self {
            refreshes: CounterVec::default(),
            refresh_duration: HistogramVec::new(exponential_buckets(0.5, 2.0, 10)),
            upstream_requests: CounterVec::default(),
            malformed_issues: CounterVec::default(),
            issues_last_refresh: AtomicI64::new(0),
            last_refresh_unix: AtomicI64::new(0),
            draining: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl ExporterMetrics {
    /// Mark draining state.
    pub fn set_draining(&self) { self.draining.store(true, Ordering::Relaxed); }
    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool { self.draining.load(Ordering::Relaxed) }

    /// Record a published cycle.
    pub fn set_last_refresh(&self, issues: usize, unix_secs: i64) {
        self.issues_last_refresh
            .store(i64::try_from(issues).unwrap_or(i64::MAX), Ordering::Relaxed);
        self.last_refresh_unix.store(unix_secs, Ordering::Relaxed);
    }

    pub fn issues_last_refresh(&self) -> i64 {
        self.issues_last_refresh.load(Ordering::Relaxed)
    }

    /// Render all exporter metrics.
    pub fn render(&self, out: &mut String) {
        self.refreshes.render("jirastat_refreshes_total", "Poll cycles by outcome.", out);
        self.refresh_duration.render(
            "jirastat_refresh_duration_seconds",
            "Wall time of poll cycles by outcome.",
            out,
        );
        self.upstream_requests.render(
            "jirastat_upstream_requests_total",
            "Upstream search requests by caller and outcome.",
            out,
        );
        self.malformed_issues.render(
            "jirastat_malformed_issues_total",
            "Issues whose changelog could not be reduced.",
            out,
        );

        header(out, "jirastat_issues_last_refresh", "Issues in the last published cycle.", "gauge");
        let _ = writeln!(out, "jirastat_issues_last_refresh {}", self.issues_last_refresh());
        header(
            out,
            "jirastat_last_refresh_timestamp_seconds",
            "Unix time of the last published cycle.",
            "gauge",
        );
        let _ = writeln!(
            out,
            "jirastat_last_refresh_timestamp_seconds {}",
            self.last_refresh_unix.load(Ordering::Relaxed)
        );
        header(out, "jirastat_draining", "1 once graceful shutdown has begun.", "gauge");
        let _ = writeln!(out, "jirastat_draining {}", if self.is_draining() { 1 } else { 0 });
    }
}

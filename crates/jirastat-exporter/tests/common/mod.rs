//! Scripted issue source and fixtures shared by exporter tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use jirastat_core::error::{JiraStatError, Result};
use jirastat_core::Issue;
use jirastat_exporter::upstream::IssueSource;

/// Serves a fixed issue list in pages of `page_size`, or fails on demand.
pub struct ScriptedSource {
    issues: Mutex<Vec<Issue>>,
    page_size: usize,
    failing: AtomicBool,
    pub calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(issues: Vec<Issue>, page_size: usize) -> Self {
        Self {
            issues: Mutex::new(issues),
            page_size,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_issues(&self, issues: Vec<Issue>) {
        *self.issues.lock() = issues;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl IssueSource for ScriptedSource {
    async fn fetch_page(&self, start_at: usize) -> Result<Vec<Issue>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(JiraStatError::Http("search returned 502 Bad Gateway".into()));
        }
        let issues = self.issues.lock();
        let end = (start_at + self.page_size).min(issues.len());
        Ok(issues.get(start_at..end).map(<[Issue]>::to_vec).unwrap_or_default())
    }
}

pub const T0: &str = "2024-05-06T08:00:00.000+0000";

/// DEVOPS/High/alice/Task, Backlog -> In Progress one hour after creation.
pub fn issue1() -> Issue {
    serde_json::from_value(json!({
        "key": "DEVOPS-1",
        "fields": {
            "created": T0,
            "project": {"key": "DEVOPS"},
            "priority": {"name": "High"},
            "assignee": {"emailAddress": "alice"},
            "status": {"name": "In Progress", "statusCategory": {"name": "In Progress"}},
            "issuetype": {"name": "Task"}
        },
        "changelog": {"histories": [
            {"created": "2024-05-06T09:00:00.000+0000", "items": [
                {"field": "status", "fromString": "Backlog"}
            ]}
        ]}
    }))
    .unwrap()
}

/// DEVOPS/Low/bob/Bug, never moved out of Backlog.
pub fn issue2() -> Issue {
    serde_json::from_value(json!({
        "key": "DEVOPS-2",
        "fields": {
            "created": T0,
            "project": {"key": "DEVOPS"},
            "priority": {"name": "Low"},
            "assignee": {"emailAddress": "bob"},
            "status": {"name": "Backlog", "statusCategory": {"name": "To Do"}},
            "issuetype": {"name": "Bug"}
        },
        "changelog": {"histories": []}
    }))
    .unwrap()
}

/// Status change whose previous status has no display value.
pub fn malformed(key: &str) -> Issue {
    serde_json::from_value(json!({
        "key": key,
        "fields": {
            "created": T0,
            "project": {"key": "DEVOPS"},
            "priority": {"name": "High"},
            "assignee": {"emailAddress": "carol"},
            "status": {"name": "Done", "statusCategory": {"name": "Done"}},
            "issuetype": {"name": "Task"}
        },
        "changelog": {"histories": [
            {"created": "2024-05-06T09:00:00.000+0000", "items": [
                {"field": "status", "fromString": null}
            ]}
        ]}
    }))
    .unwrap()
}

/// Unassigned task numbered `n`, distinct count label set per `n`.
pub fn numbered(n: usize) -> Issue {
    serde_json::from_value(json!({
        "key": format!("BULK-{n}"),
        "fields": {
            "created": T0,
            "project": {"key": "BULK"},
            "status": {"name": format!("S{n}")},
        }
    }))
    .unwrap()
}

pub const ISSUE1_DURATION_LABELS: [(&str, &str); 4] = [
    ("project", "DEVOPS"),
    ("priority", "High"),
    ("assignee", "alice"),
    ("issueType", "Task"),
];

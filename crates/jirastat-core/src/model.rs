//! Upstream issue records (Jira REST v3 search, `expand=changelog`).
//!
//! Descriptive fields are optional upstream (an unassigned issue has no
//! `assignee`). Accessors flatten absent values to `""` so every issue maps to
//! a complete label set. Timestamps stay raw [`FieldValue`]s until
//! [`Issue::status_durations`] parses them, so a null, missing or non-text
//! timestamp decodes fine and only fails its own issue.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::changelog::{self, ChangeItem, FieldValue, HistoryEntry, StatusDurations};
use crate::error::ChangelogError;

/// Parsed upstream timestamp.
pub type Timestamp = DateTime<FixedOffset>;

/// Upstream timestamp format, e.g. `2024-03-01T09:30:00.000+0100`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Parse an upstream timestamp. RFC 3339 is accepted as a fallback.
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    DateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
}

fn parse_field(value: &FieldValue) -> Option<Timestamp> {
    match value {
        FieldValue::Text(s) => parse_timestamp(s),
        _ => None,
    }
}

fn raw(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        other => other.describe(),
    }
}

/// One page of search results. An empty page ends pagination.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub key: String,
    pub fields: IssueFields,
    #[serde(default)]
    pub changelog: Changelog,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Changelog {
    #[serde(default)]
    pub histories: Vec<History>,
}

/// Raw history entry.
#[derive(Debug, Clone, Deserialize)]
pub struct History {
    #[serde(default)]
    pub created: FieldValue,
    #[serde(default)]
    pub items: Vec<ChangeItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub created: FieldValue,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(default)]
    pub priority: Option<Named>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default, rename = "issuetype")]
    pub issue_type: Option<Named>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectRef {
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default, rename = "emailAddress")]
    pub email_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "statusCategory")]
    pub status_category: Option<Named>,
}

impl Issue {
    pub fn project(&self) -> &str {
        self.fields.project.as_ref().map_or("", |p| p.key.as_str())
    }

    pub fn priority(&self) -> &str {
        self.fields.priority.as_ref().map_or("", |p| p.name.as_str())
    }

    pub fn assignee(&self) -> &str {
        self.fields.assignee.as_ref().map_or("", |u| u.email_address.as_str())
    }

    pub fn status(&self) -> &str {
        self.fields.status.as_ref().map_or("", |s| s.name.as_str())
    }

    pub fn status_category(&self) -> &str {
        self.fields
            .status
            .as_ref()
            .and_then(|s| s.status_category.as_ref())
            .map_or("", |c| c.name.as_str())
    }

    pub fn issue_type(&self) -> &str {
        self.fields.issue_type.as_ref().map_or("", |t| t.name.as_str())
    }

    pub fn created_at(&self) -> Result<Timestamp, ChangelogError> {
        parse_field(&self.fields.created).ok_or_else(|| ChangelogError::InvalidCreated {
            issue: self.key.clone(),
            value: raw(&self.fields.created),
        })
    }

    /// Parse history timestamps, keeping upstream order.
    pub fn history_entries(&self) -> Result<Vec<HistoryEntry<'_>>, ChangelogError> {
        self.changelog
            .histories
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                let at = parse_field(&h.created).ok_or_else(|| {
                    ChangelogError::InvalidTimestamp {
                        issue: self.key.clone(),
                        entry: idx,
                        value: raw(&h.created),
                    }
                })?;
                Ok(HistoryEntry { at, items: &h.items })
            })
            .collect()
    }

    /// Time this issue spent in each status it has exited.
    pub fn status_durations(&self) -> Result<StatusDurations, ChangelogError> {
        let created_at = self.created_at()?;
        let entries = self.history_entries()?;
        changelog::status_durations(&self.key, created_at, &entries)
    }
}

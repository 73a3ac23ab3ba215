//! Changelog reducer (panic-free).
//!
//! Reconstructs how long an issue spent in each status it has left, from its
//! creation time and its changelog. Rules:
//! - Upstream returns histories newest first; the walk runs them in reverse.
//! - Only items whose field is `status` close an interval.
//! - The interval still open (the current status) is never measured.
//! - Re-entered statuses sum over every completed visit.
//! - An interval that runs backwards (an entry older than the one before it)
//!   counts as zero; the other intervals of the issue are unaffected.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ChangelogError;
use crate::model::Timestamp;

/// Changelog field name that marks a status transition.
pub const STATUS_FIELD: &str = "status";

/// Time spent per exited status, for a single issue.
pub type StatusDurations = BTreeMap<String, Duration>;

/// Value a field held before a change, as sent upstream.
///
/// Statuses without a display value arrive as `null`, so the text case is
/// matched explicitly rather than assumed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    #[default]
    Null,
    Other(serde_json::Value),
}

impl FieldValue {
    /// Short rendering used in error messages.
    pub fn describe(&self) -> String {
        match self {
            FieldValue::Text(s) => format!("{s:?}"),
            FieldValue::Null => "null".to_string(),
            FieldValue::Other(v) => v.to_string(),
        }
    }
}

/// One field change inside a history entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeItem {
    pub field: String,
    #[serde(default, rename = "fromString")]
    pub from: FieldValue,
}

impl ChangeItem {
    pub fn is_status(&self) -> bool {
        self.field == STATUS_FIELD
    }
}

/// A history entry with its timestamp already parsed.
#[derive(Debug, Clone, Copy)]
pub struct HistoryEntry<'a> {
    pub at: Timestamp,
    pub items: &'a [ChangeItem],
}

/// Compute time spent in each exited status.
///
/// `histories` must be in upstream order (newest first); the slice is walked
/// in reverse and never reordered in place. Errors carry the index of the
/// offending entry in that upstream order.
///
/// The cursor always moves to the entry's timestamp, so a skewed entry only
/// zeroes its own interval.
pub fn status_durations(
    issue_key: &str,
    created_at: Timestamp,
    histories: &[HistoryEntry<'_>],
) -> Result<StatusDurations, ChangelogError> {
    let mut durations = StatusDurations::new();
    let mut entered_at = created_at;

    for (idx, entry) in histories.iter().enumerate().rev() {
        for item in entry.items.iter().filter(|i| i.is_status()) {
            let exited = match &item.from {
                FieldValue::Text(name) => name,
                other => {
                    return Err(ChangelogError::NonTextStatus {
                        issue: issue_key.to_string(),
                        entry: idx,
                        found: other.describe(),
                    })
                }
            };

            let spent = match entry.at.signed_duration_since(entered_at).to_std() {
                Ok(d) => d,
                Err(_) => {
                    tracing::warn!(
                        issue = issue_key,
                        entry = idx,
                        status = %exited,
                        "history entry predates the previous boundary; counting zero"
                    );
                    Duration::ZERO
                }
            };

            *durations.entry(exited.clone()).or_default() += spent;
            entered_at = entry.at;
        }
    }

    Ok(durations)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::model::parse_timestamp;

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).expect("valid timestamp")
    }

    fn status(from: &str) -> ChangeItem {
        ChangeItem {
            field: STATUS_FIELD.into(),
            from: FieldValue::Text(from.into()),
        }
    }

    fn other(field: &str) -> ChangeItem {
        ChangeItem {
            field: field.into(),
            from: FieldValue::Text("whatever".into()),
        }
    }

    const T0: &str = "2024-01-01T09:00:00.000+0000";

    #[test]
    fn two_transitions_split_exactly() {
        let a = [status("A")];
        let b = [status("B")];
        // newest first, as upstream sends them
        let hist = [
            HistoryEntry { at: ts("2024-01-01T12:00:00.000+0000"), items: &b },
            HistoryEntry { at: ts("2024-01-01T10:00:00.000+0000"), items: &a },
        ];

        let d = status_durations("K-1", ts(T0), &hist).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d["A"], Duration::from_secs(3600));
        assert_eq!(d["B"], Duration::from_secs(7200));
    }

    #[test]
    fn no_history_is_empty() {
        let d = status_durations("K-1", ts(T0), &[]).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn reentered_status_sums_visits() {
        let a = [status("A")];
        let b = [status("B")];
        let hist = [
            HistoryEntry { at: ts("2024-01-01T15:00:00.000+0000"), items: &a },
            HistoryEntry { at: ts("2024-01-01T11:00:00.000+0000"), items: &b },
            HistoryEntry { at: ts("2024-01-01T10:00:00.000+0000"), items: &a },
        ];

        let d = status_durations("K-1", ts(T0), &hist).unwrap();
        // (t1 - T0) + (t3 - t2) = 1h + 4h
        assert_eq!(d["A"], Duration::from_secs(5 * 3600));
        assert_eq!(d["B"], Duration::from_secs(3600));
    }

    #[test]
    fn identical_timestamps_give_zero() {
        let a = [status("A")];
        let b = [status("B")];
        let at = ts("2024-01-01T10:00:00.000+0000");
        let hist = [
            HistoryEntry { at, items: &b },
            HistoryEntry { at, items: &a },
        ];

        let d = status_durations("K-1", ts(T0), &hist).unwrap();
        assert_eq!(d["A"], Duration::from_secs(3600));
        assert_eq!(d["B"], Duration::ZERO);
    }

    #[test]
    fn non_status_items_are_ignored() {
        let mixed = [other("assignee"), status("Open"), other("priority")];
        let only_other = [other("labels")];
        let hist = [
            HistoryEntry { at: ts("2024-01-02T09:00:00.000+0000"), items: &only_other },
            HistoryEntry { at: ts("2024-01-01T09:30:00.000+0000"), items: &mixed },
        ];

        let d = status_durations("K-1", ts(T0), &hist).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d["Open"], Duration::from_secs(30 * 60));
    }

    #[test]
    fn input_order_is_left_untouched() {
        let a = [status("A")];
        let b = [status("B")];
        let mut hist = vec![
            HistoryEntry { at: ts("2024-01-01T12:00:00.000+0000"), items: &b },
            HistoryEntry { at: ts("2024-01-01T10:00:00.000+0000"), items: &a },
        ];

        let first = status_durations("K-1", ts(T0), &hist).unwrap();
        hist.reverse();
        hist.reverse();
        let second = status_durations("K-1", ts(T0), &hist).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn null_from_value_is_an_error() {
        let bad = [ChangeItem { field: STATUS_FIELD.into(), from: FieldValue::Null }];
        let hist = [HistoryEntry { at: ts("2024-01-01T10:00:00.000+0000"), items: &bad }];

        let err = status_durations("K-7", ts(T0), &hist).unwrap_err();
        assert_eq!(
            err,
            ChangelogError::NonTextStatus {
                issue: "K-7".into(),
                entry: 0,
                found: "null".into(),
            }
        );
    }

    #[test]
    fn entry_before_creation_counts_zero_and_keeps_later_intervals() {
        let a = [status("A")];
        let b = [status("B")];
        // created 10:00, first change stamped 09:00 (clock skew), second 15:00
        let hist = [
            HistoryEntry { at: ts("2024-01-01T15:00:00.000+0000"), items: &b },
            HistoryEntry { at: ts("2024-01-01T09:00:00.000+0000"), items: &a },
        ];

        let d = status_durations("K-8", ts("2024-01-01T10:00:00.000+0000"), &hist).unwrap();
        assert_eq!(d["A"], Duration::ZERO);
        assert_eq!(d["B"], Duration::from_secs(6 * 3600));
    }

    #[test]
    fn backwards_step_only_zeroes_its_own_interval() {
        let a = [status("A")];
        let b = [status("B")];
        let c = [status("C")];
        let hist = [
            HistoryEntry { at: ts("2024-01-01T13:00:00.000+0000"), items: &c },
            HistoryEntry { at: ts("2024-01-01T10:30:00.000+0000"), items: &b },
            HistoryEntry { at: ts("2024-01-01T11:00:00.000+0000"), items: &a },
        ];

        let d = status_durations("K-9", ts(T0), &hist).unwrap();
        assert_eq!(d["A"], Duration::from_secs(2 * 3600));
        assert_eq!(d["B"], Duration::ZERO);
        assert_eq!(d["C"], Duration::from_secs(150 * 60));
    }

    #[test]
    fn from_value_deserializes_all_shapes() {
        let items: Vec<ChangeItem> = serde_json::from_str(
            r#"[
                {"field":"status","fromString":"Open"},
                {"field":"status","fromString":null},
                {"field":"status"},
                {"field":"status","fromString":42}
            ]"#,
        )
        .unwrap();

        assert_eq!(items[0].from, FieldValue::Text("Open".into()));
        assert_eq!(items[1].from, FieldValue::Null);
        assert_eq!(items[2].from, FieldValue::Null);
        assert_eq!(items[3].from, FieldValue::Other(serde_json::json!(42)));
    }
}

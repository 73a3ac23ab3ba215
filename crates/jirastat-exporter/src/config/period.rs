use std::time::Duration;

use jirastat_core::error::{JiraStatError, Result};

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
];

/// Parse period strings like "5m", "1h30m", "90s", "1.5h".
///
/// A bare `0` is accepted; any other value needs a unit on every component.
pub fn parse_period(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(JiraStatError::Config("empty duration".into()));
    }

    let mut rest = s;
    let mut nanos = 0f64;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(JiraStatError::Config(format!("invalid duration: {s}")));
        }
        let val: f64 = rest[..num_len]
            .parse()
            .map_err(|_| JiraStatError::Config(format!("invalid duration: {s}")))?;
        rest = &rest[num_len..];

        let (suffix, multiplier) = UNITS
            .iter()
            .find(|(suffix, _)| rest.starts_with(suffix))
            .ok_or_else(|| JiraStatError::Config(format!("missing or unknown unit in duration: {s}")))?;
        nanos += val * multiplier;
        rest = &rest[suffix.len()..];
    }

    Ok(Duration::from_nanos(nanos as u64))
}

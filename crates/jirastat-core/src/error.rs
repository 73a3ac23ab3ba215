//! Shared error type across jirastat crates.

use thiserror::Error;

/// Error classes (stable API), used for logging and probe responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing or invalid setting. Fatal at startup.
    Config,
    /// Upstream fetch failed. Aborts the current cycle only.
    Fetch,
    /// One issue carries malformed data. Skips that issue only.
    IssueData,
    /// Internal error.
    Internal,
}

impl ErrorClass {
    /// String representation used in logs and test vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Config => "CONFIG",
            ErrorClass::Fetch => "FETCH",
            ErrorClass::IssueData => "ISSUE_DATA",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, JiraStatError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum JiraStatError {
    #[error("config: {0}")]
    Config(String),
    #[error("upstream http error: {0}")]
    Http(String),
    #[error("upstream auth failed: {0}")]
    Auth(String),
    #[error("upstream connection failed: {0}")]
    Connection(String),
    #[error("upstream request timed out")]
    Timeout,
    #[error("malformed upstream response: {0}")]
    Parse(String),
    #[error(transparent)]
    Changelog(#[from] ChangelogError),
    #[error("internal: {0}")]
    Internal(String),
}

impl JiraStatError {
    /// Map an error to its handling class.
    pub fn class(&self) -> ErrorClass {
        match self {
            JiraStatError::Config(_) => ErrorClass::Config,
            JiraStatError::Http(_)
            | JiraStatError::Auth(_)
            | JiraStatError::Connection(_)
            | JiraStatError::Timeout
            | JiraStatError::Parse(_) => ErrorClass::Fetch,
            JiraStatError::Changelog(_) => ErrorClass::IssueData,
            JiraStatError::Internal(_) => ErrorClass::Internal,
        }
    }
}

/// Per-issue changelog defects. Each variant names the issue key, and where it
/// applies the history entry index as received from upstream (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangelogError {
    #[error("issue {issue}: status change in history entry {entry} has a non-text from value ({found})")]
    NonTextStatus {
        issue: String,
        entry: usize,
        found: String,
    },
    #[error("issue {issue}: invalid created timestamp {value:?}")]
    InvalidCreated { issue: String, value: String },
    #[error("issue {issue}: invalid timestamp {value:?} in history entry {entry}")]
    InvalidTimestamp {
        issue: String,
        entry: usize,
        value: String,
    },
}

impl ChangelogError {
    /// Key of the offending issue.
    pub fn issue(&self) -> &str {
        match self {
            ChangelogError::NonTextStatus { issue, .. }
            | ChangelogError::InvalidCreated { issue, .. }
            | ChangelogError::InvalidTimestamp { issue, .. } => issue,
        }
    }
}

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use jirastat_core::error::{JiraStatError, Result};

use super::period::parse_period;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub listen: String,

    pub jira: JiraSection,

    #[serde(default)]
    pub poll: PollSection,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        self.jira.validate()?;
        self.poll.validate()?;   // Verify the scope of value
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| JiraStatError::Config(format!("listen must be a valid SocketAddr ({}): {e}", self.listen)))
    }
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JiraSection {
    pub url: String,
    pub user: String,
    pub api_token: String,
    pub projects: Vec<String>,

    #[serde(default = "default_request_timeout", deserialize_with = "de_period")]
    pub request_timeout: Duration,
}

// The token stays out of logs.
impl fmt::Debug for JiraSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraSection")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("api_token", &"<redacted>")
            .field("projects", &self.projects)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl JiraSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(JiraStatError::Config(
                "jira.url must start with http:// or https://".into(),
            ));
        }
        if self.user.trim().is_empty() {
            return Err(JiraStatError::Config("jira.user must not be empty".into()));
        }
        if self.api_token.trim().is_empty() {
            return Err(JiraStatError::Config("jira.api_token must not be empty".into()));
        }
        if self.projects.is_empty() {
            return Err(JiraStatError::Config("jira.projects must not be empty".into()));
        }
        // keys are spliced into the JQL filter
        for p in &self.projects {
            if p.is_empty() || !p.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(JiraStatError::Config(format!("invalid project key: {p:?}")));
            }
        }
        if !(Duration::from_secs(1)..=Duration::from_secs(300)).contains(&self.request_timeout) {
            return Err(JiraStatError::Config(
                "jira.request_timeout must be between 1s and 300s".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollSection {
    #[serde(default = "default_analyze_period_days")]
    pub analyze_period_days: u32,

    #[serde(default = "default_refresh_period", deserialize_with = "de_period")]
    pub refresh_period: Duration,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            analyze_period_days: default_analyze_period_days(),
            refresh_period: default_refresh_period(),
        }
    }
}

impl PollSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=3650).contains(&self.analyze_period_days) {
            return Err(JiraStatError::Config(
                "poll.analyze_period_days must be between 1 and 3650".into(),
            ));
        }
        if self.refresh_period < Duration::from_secs(1) {
            return Err(JiraStatError::Config(
                "poll.refresh_period must be at least 1s".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn default_analyze_period_days() -> u32 {
    90
}
pub(crate) fn default_refresh_period() -> Duration {
    Duration::from_secs(5 * 60)
}
pub(crate) fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn de_period<'de, D>(d: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    parse_period(&s).map_err(serde::de::Error::custom)
}

//! Exporter config loader (strict parsing).
//!
//! Settings are read once at startup. A YAML file named by `JIRASTAT_CONFIG`
//! wins; otherwise the environment variables below are used.

pub mod period;
pub mod schema;

use std::fs;

use jirastat_core::error::{JiraStatError, Result};

pub use period::parse_period;
pub use schema::{ExporterConfig, JiraSection, PollSection};

/// Env var naming an optional YAML config file.
pub const CONFIG_FILE_ENV: &str = "JIRASTAT_CONFIG";

pub fn load() -> Result<ExporterConfig> {
    match std::env::var(CONFIG_FILE_ENV) {
        Ok(path) if !path.trim().is_empty() => load_from_file(path.trim()),
        _ => load_from_env(),
    }
}

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| JiraStatError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| JiraStatError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_env() -> Result<ExporterConfig> {
    load_from_lookup(|name| std::env::var(name).ok())
}

/// Build config from `LISTEN`, `JIRA_URL`, `JIRA_USER`, `JIRA_API_TOKEN`,
/// `PROJECTS` (required) and `ANALYZE_PERIOD_DAYS`, `DATA_REFRESH_PERIOD`,
/// `REQUEST_TIMEOUT` (optional). Empty values count as absent.
pub fn load_from_lookup<F>(lookup: F) -> Result<ExporterConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let required = |name: &str| {
        get(name).ok_or_else(|| JiraStatError::Config(format!("{name} env is empty")))
    };

    let analyze_period_days = match get("ANALYZE_PERIOD_DAYS") {
        Some(v) => v.parse().map_err(|e| {
            JiraStatError::Config(format!("ANALYZE_PERIOD_DAYS must be a positive integer: {e}"))
        })?,
        None => schema::default_analyze_period_days(),
    };
    let refresh_period = match get("DATA_REFRESH_PERIOD") {
        Some(v) => parse_period(&v)?,
        None => schema::default_refresh_period(),
    };
    let request_timeout = match get("REQUEST_TIMEOUT") {
        Some(v) => parse_period(&v)?,
        None => schema::default_request_timeout(),
    };

    let cfg = ExporterConfig {
        listen: required("LISTEN")?,
        jira: JiraSection {
            url: required("JIRA_URL")?,
            user: required("JIRA_USER")?,
            api_token: required("JIRA_API_TOKEN")?,
            projects: split_projects(&required("PROJECTS")?),
            request_timeout,
        },
        poll: PollSection {
            analyze_period_days,
            refresh_period,
        },
    };
    cfg.validate()?;
    Ok(cfg)
}

fn split_projects(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

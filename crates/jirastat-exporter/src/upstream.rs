//! Upstream issue search.
//!
//! [`IssueSource`] is the seam between the poller/readiness probe and the
//! tracker API; [`JiraClient`] is the production implementation over the Jira
//! REST v3 search endpoint.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use jirastat_core::error::{JiraStatError, Result};
use jirastat_core::{Issue, SearchPage};

use crate::config::ExporterConfig;
use crate::obs::metrics::ExporterMetrics;

/// Fields requested per issue.
pub const SEARCH_FIELDS: &str = "created,status,assignee,project,issuetype,priority";

/// A paginated source of issue records.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Fetch one page starting at offset `start_at`. An empty page means there
    /// is nothing further.
    async fn fetch_page(&self, start_at: usize) -> Result<Vec<Issue>>;
}

/// Fetch one page and count the request under `caller`.
pub async fn fetch_page_counted(
    source: &dyn IssueSource,
    metrics: &ExporterMetrics,
    caller: &str,
    start_at: usize,
) -> Result<Vec<Issue>> {
    let res = source.fetch_page(start_at).await;
    let outcome = if res.is_ok() { "ok" } else { "error" };
    metrics
        .upstream_requests
        .inc(&[("caller", caller), ("outcome", outcome)]);
    res
}

/// Fetch every page, advancing the offset by each page's length. Each page
/// request is counted under `caller="poller"`.
pub async fn fetch_all(source: &dyn IssueSource, metrics: &ExporterMetrics) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();
    let mut start_at = 0;
    loop {
        let page = fetch_page_counted(source, metrics, "poller", start_at).await?;
        if page.is_empty() {
            break;
        }
        start_at += page.len();
        issues.extend(page);
    }
    Ok(issues)
}

/// JQL filter: issues updated inside the window, in the configured projects.
pub fn search_jql(analyze_period_days: u32, projects: &[String]) -> String {
    format!(
        "updated >= -{}d AND project in ({})",
        analyze_period_days,
        projects.join(", ")
    )
}

/// Jira search client (basic auth with user + API token).
#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    search_url: String,
    user: String,
    api_token: String,
    jql: String,
}

impl JiraClient {
    pub fn new(cfg: &ExporterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.jira.request_timeout)
            .build()
            .map_err(|e| JiraStatError::Internal(format!("http client build failed: {e}")))?;

        Ok(Self {
            client,
            search_url: format!("{}/rest/api/3/search", cfg.jira.url.trim_end_matches('/')),
            user: cfg.jira.user.clone(),
            api_token: cfg.jira.api_token.clone(),
            jql: search_jql(cfg.poll.analyze_period_days, &cfg.jira.projects),
        })
    }

    pub fn jql(&self) -> &str {
        &self.jql
    }
}

#[async_trait]
impl IssueSource for JiraClient {
    async fn fetch_page(&self, start_at: usize) -> Result<Vec<Issue>> {
        tracing::debug!(start_at, url = %self.search_url, jql = %self.jql, "fetching issue page");

        let start = start_at.to_string();
        let response = self
            .client
            .get(&self.search_url)
            .basic_auth(&self.user, Some(&self.api_token))
            .query(&[
                ("expand", "changelog"),
                ("fields", SEARCH_FIELDS),
                ("startAt", start.as_str()),
                ("jql", self.jql.as_str()),
            ])
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(JiraStatError::Auth(format!("search returned {status}")));
        }
        if !status.is_success() {
            return Err(JiraStatError::Http(format!("search returned {status}")));
        }

        let body = response.bytes().await.map_err(map_transport)?;
        let page: SearchPage = serde_json::from_slice(&body)
            .map_err(|e| JiraStatError::Parse(e.to_string()))?;
        Ok(page.issues)
    }
}

fn map_transport(err: reqwest::Error) -> JiraStatError {
    if err.is_timeout() {
        JiraStatError::Timeout
    } else if err.is_connect() {
        JiraStatError::Connection(err.to_string())
    } else {
        JiraStatError::Http(err.to_string())
    }
}

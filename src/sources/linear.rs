use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, warn};

use super::{IncidentSource, SourceError};
use crate::config::LinearConfig;
use crate::dora::types::hours_between;
use crate::dora::{Incident, Period};
use crate::http::{send_with_retry, RetryConfig};

/// Guard against a cursor that never terminates.
const MAX_PAGES: usize = 50;

const COMPLETED_ISSUES_QUERY: &str = r#"
query CompletedIssues($after: DateTime!, $before: DateTime!, $cursor: String) {
    issues(
        filter: { completedAt: { gte: $after, lte: $before } }
        first: 100
        after: $cursor
    ) {
        nodes {
            id
            identifier
            title
            priority
            createdAt
            completedAt
            startedAt
            state { name }
            assignee { name }
            labels { nodes { name } }
        }
        pageInfo { hasNextPage endCursor }
    }
}
"#;

/// Completed Linear issues that carry an incident label.
#[derive(Debug, Clone)]
pub struct LinearSource {
    client: Client,
    api_url: String,
    api_key: String,
    retry: RetryConfig,
    incident_labels: BTreeSet<String>,
    max_pages: usize,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<IssuesData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: IssueConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueConnection {
    nodes: Vec<RawIssue>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIssue {
    id: String,
    identifier: String,
    title: String,
    #[serde(default)]
    priority: f64,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    state: Option<Named>,
    assignee: Option<Named>,
    #[serde(default)]
    labels: LabelConnection,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct LabelConnection {
    nodes: Vec<Named>,
}

impl From<RawIssue> for Incident {
    fn from(raw: RawIssue) -> Self {
        let cycle_time_hours = match (raw.started_at, raw.completed_at) {
            (Some(started), Some(completed)) => Some(hours_between(started, completed)),
            _ => None,
        };

        Incident {
            id: raw.id,
            identifier: raw.identifier,
            title: raw.title,
            state: raw.state.map(|s| s.name).unwrap_or_else(|| "Unknown".to_string()),
            created_at: raw.created_at,
            completed_at: raw.completed_at,
            started_at: raw.started_at,
            cycle_time_hours,
            labels: raw.labels.nodes.into_iter().map(|l| l.name).collect(),
            priority: raw.priority.clamp(0.0, f64::from(u8::MAX)) as u8,
            assignee: raw.assignee.map(|a| a.name),
        }
    }
}

impl LinearSource {
    pub fn from_config(config: &LinearConfig) -> Result<Self, SourceError> {
        let api_key = config.api_key.clone().ok_or(SourceError::MissingCredentials {
            provider: "linear",
            hint: "set LINEAR_API_KEY or linear.api_key",
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            retry: RetryConfig::with_max_retries(config.max_retries),
            max_pages: MAX_PAGES,
            incident_labels: config
                .incident_labels
                .iter()
                .map(|l| l.to_lowercase())
                .collect(),
        })
    }

    /// For testing: fast retries against a mock server.
    #[cfg(test)]
    pub(crate) fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Every issue completed inside the period, following the cursor.
    pub async fn completed_issues(&self, period: &Period) -> Result<Vec<Incident>, SourceError> {
        let mut cursor: Option<String> = None;
        let mut issues = Vec::new();

        for page in 1..=self.max_pages {
            let body = json!({
                "query": COMPLETED_ISSUES_QUERY,
                "variables": {
                    "after": period.start().to_rfc3339(),
                    "before": period.end().to_rfc3339(),
                    "cursor": cursor,
                }
            });

            let response = send_with_retry(&self.retry, || {
                self.client
                    .post(&self.api_url)
                    .header(reqwest::header::AUTHORIZATION, &self.api_key)
                    .json(&body)
            })
            .await?;

            let parsed: GraphQlResponse = response.json().await?;
            if let Some(error) = parsed.errors.first() {
                return Err(SourceError::InvalidResponse {
                    provider: "linear",
                    message: error.message.clone(),
                });
            }
            let connection = parsed
                .data
                .ok_or_else(|| SourceError::InvalidResponse {
                    provider: "linear",
                    message: "response carried no data".to_string(),
                })?
                .issues;

            issues.extend(connection.nodes.into_iter().map(Incident::from));

            match connection.page_info {
                PageInfo {
                    has_next_page: true,
                    end_cursor: Some(_),
                } if page == self.max_pages => {
                    warn!(
                        pages = page,
                        fetched = issues.len(),
                        period = %period,
                        "Linear issues truncated at page limit"
                    );
                }
                PageInfo {
                    has_next_page: true,
                    end_cursor: Some(next),
                } => cursor = Some(next),
                _ => break,
            }
        }

        debug!(count = issues.len(), "completed Linear issues");
        Ok(issues)
    }

    fn is_incident(&self, incident: &Incident) -> bool {
        incident
            .labels
            .iter()
            .any(|label| self.incident_labels.contains(&label.to_lowercase()))
    }
}

#[async_trait]
impl IncidentSource for LinearSource {
    async fn fetch_incidents(&self, period: &Period) -> Result<Vec<Incident>, SourceError> {
        let issues = self.completed_issues(period).await?;
        Ok(issues.into_iter().filter(|i| self.is_incident(i)).collect())
    }
}

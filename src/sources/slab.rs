use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{PostmortemSource, SourceError};
use crate::config::SlabConfig;
use crate::dora::types::hours_between;
use crate::dora::{Period, Postmortem, Severity};
use crate::http::{send_with_retry, RetryConfig};

const CRITICAL_MARKERS: [&str; 4] = ["sev0", "sev 0", "critical", "p0"];
const MAJOR_MARKERS: [&str; 4] = ["sev1", "sev 1", "major", "p1"];

/// Postmortem posts from a Slab team.
#[derive(Debug, Clone)]
pub struct SlabSource {
    client: Client,
    api_url: String,
    api_token: String,
    team_id: String,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct PostsResponse {
    #[serde(default)]
    data: Vec<RawPost>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    id: String,
    #[serde(default)]
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Severity implied by keywords in a postmortem title.
pub fn severity_from_title(title: &str) -> Severity {
    let lowered = title.to_lowercase();
    if CRITICAL_MARKERS.iter().any(|m| lowered.contains(m)) {
        Severity::Critical
    } else if MAJOR_MARKERS.iter().any(|m| lowered.contains(m)) {
        Severity::Major
    } else {
        Severity::Minor
    }
}

fn is_postmortem_title(title: &str) -> bool {
    let lowered = title.to_lowercase();
    lowered.contains("postmortem") || lowered.contains("post-mortem")
}

impl SlabSource {
    pub fn from_config(config: &SlabConfig) -> Result<Self, SourceError> {
        let missing = SourceError::MissingCredentials {
            provider: "slab",
            hint: "set SLAB_API_TOKEN and SLAB_TEAM_ID",
        };
        let (Some(api_token), Some(team_id)) = (config.api_token.clone(), config.team_id.clone()) else {
            return Err(missing);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_token,
            team_id,
            retry: RetryConfig::with_max_retries(config.max_retries),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl PostmortemSource for SlabSource {
    async fn fetch_postmortems(&self, period: &Period) -> Result<Vec<Postmortem>, SourceError> {
        let url = format!("{}/teams/{}/posts", self.api_url, self.team_id);
        let response = send_with_retry(&self.retry, || {
            self.client.get(&url).bearer_auth(&self.api_token)
        })
        .await?;

        let posts: PostsResponse = response.json().await?;

        // A post overlaps the period when it was touched after the start and
        // opened before the end.
        let postmortems: Vec<Postmortem> = posts
            .data
            .into_iter()
            .filter(|p| is_postmortem_title(&p.title))
            .filter(|p| p.updated_at >= period.start() && p.created_at <= period.end())
            .map(|p| Postmortem {
                severity: severity_from_title(&p.title),
                time_to_resolve_hours: hours_between(p.created_at, p.updated_at),
                id: p.id,
                title: p.title,
                incident_date: p.created_at,
                resolved_at: p.updated_at,
            })
            .collect();

        debug!(count = postmortems.len(), "Slab postmortems in period");
        Ok(postmortems)
    }
}

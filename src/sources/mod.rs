//! Upstream data providers and the concurrent gather that feeds the
//! calculator.
//!
//! Each provider sits behind a narrow async trait so the workflow can run
//! with any subset configured. `gather` never fails: a provider error is
//! logged, recorded as a degraded [`SourceOutcome`] and replaced with an
//! empty list.

pub mod github;
pub mod linear;
pub mod slab;

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use crate::config::DoraPulseConfig;
use crate::dora::{Deployment, Incident, Period, Postmortem, PullRequest};
use crate::observability::source_metrics;

pub use github::GitHubSource;
pub use linear::LinearSource;
pub use slab::SlabSource;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{provider} is not configured: {hint}")]
    MissingCredentials {
        provider: &'static str,
        hint: &'static str,
    },

    #[error("GitHub API error: {0}")]
    GitHub(#[from] octocrab::Error),

    #[error("HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    #[error("invalid response from {provider}: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

#[async_trait]
pub trait DeploymentSource: Send + Sync {
    async fn fetch_deployments(&self, period: &Period) -> Result<Vec<Deployment>, SourceError>;
}

#[async_trait]
pub trait PullRequestSource: Send + Sync {
    async fn fetch_pull_requests(&self, period: &Period) -> Result<Vec<PullRequest>, SourceError>;
}

#[async_trait]
pub trait IncidentSource: Send + Sync {
    async fn fetch_incidents(&self, period: &Period) -> Result<Vec<Incident>, SourceError>;
}

#[async_trait]
pub trait PostmortemSource: Send + Sync {
    async fn fetch_postmortems(&self, period: &Period) -> Result<Vec<Postmortem>, SourceError>;
}

/// The providers available to a run. `None` means the provider is not
/// configured and contributes an empty list.
#[derive(Clone, Default)]
pub struct SourceSet {
    pub deployments: Option<Arc<dyn DeploymentSource>>,
    pub pull_requests: Option<Arc<dyn PullRequestSource>>,
    pub incidents: Option<Arc<dyn IncidentSource>>,
    pub postmortems: Option<Arc<dyn PostmortemSource>>,
}

impl SourceSet {
    /// Build every provider the configuration has credentials for.
    pub fn from_config(config: &DoraPulseConfig) -> Self {
        let mut set = SourceSet::default();

        match GitHubSource::from_config(&config.github) {
            Ok(github) => {
                let github = Arc::new(github);
                set.deployments = Some(github.clone());
                set.pull_requests = Some(github);
            }
            Err(e) => report_unavailable("github", &e),
        }

        match LinearSource::from_config(&config.linear) {
            Ok(linear) => set.incidents = Some(Arc::new(linear)),
            Err(e) => report_unavailable("linear", &e),
        }

        match SlabSource::from_config(&config.slab) {
            Ok(slab) => set.postmortems = Some(Arc::new(slab)),
            Err(e) => report_unavailable("slab", &e),
        }

        set
    }
}

fn report_unavailable(provider: &str, error: &SourceError) {
    match error {
        SourceError::MissingCredentials { .. } => info!(provider, "{}", error),
        _ => warn!(provider, error = %error, "source could not be initialized"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Deployments,
    PullRequests,
    Incidents,
    Postmortems,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Deployments => "deployments",
            SourceKind::PullRequests => "pull_requests",
            SourceKind::Incidents => "incidents",
            SourceKind::Postmortems => "postmortems",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    Fetched { records: usize },
    /// No provider configured
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub kind: SourceKind,
    #[serde(flatten)]
    pub status: FetchStatus,
}

impl SourceOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, FetchStatus::Failed { .. })
    }
}

/// Everything the calculator needs for one period.
#[derive(Debug, Clone, Default)]
pub struct DataFetchResult {
    pub deployments: Vec<Deployment>,
    pub pull_requests: Vec<PullRequest>,
    pub incidents: Vec<Incident>,
    pub postmortems: Vec<Postmortem>,
    pub outcomes: Vec<SourceOutcome>,
}

impl DataFetchResult {
    /// Sources whose fetch failed and were substituted with empty lists.
    pub fn degraded(&self) -> Vec<SourceKind> {
        self.outcomes
            .iter()
            .filter(|o| o.is_degraded())
            .map(|o| o.kind)
            .collect()
    }
}

/// Fetch all four record kinds for `period` concurrently.
pub async fn gather(sources: &SourceSet, period: &Period) -> DataFetchResult {
    let (deployments, pull_requests, incidents, postmortems) = tokio::join!(
        settle(
            SourceKind::Deployments,
            period,
            sources.deployments.as_ref().map(|s| s.fetch_deployments(period)),
        ),
        settle(
            SourceKind::PullRequests,
            period,
            sources.pull_requests.as_ref().map(|s| s.fetch_pull_requests(period)),
        ),
        settle(
            SourceKind::Incidents,
            period,
            sources.incidents.as_ref().map(|s| s.fetch_incidents(period)),
        ),
        settle(
            SourceKind::Postmortems,
            period,
            sources.postmortems.as_ref().map(|s| s.fetch_postmortems(period)),
        ),
    );

    DataFetchResult {
        deployments: deployments.0,
        pull_requests: pull_requests.0,
        incidents: incidents.0,
        postmortems: postmortems.0,
        outcomes: vec![deployments.1, pull_requests.1, incidents.1, postmortems.1],
    }
}

async fn settle<T, F>(kind: SourceKind, period: &Period, fetch: Option<F>) -> (Vec<T>, SourceOutcome)
where
    F: Future<Output = Result<Vec<T>, SourceError>>,
{
    let Some(fetch) = fetch else {
        return (Vec::new(), SourceOutcome { kind, status: FetchStatus::Skipped });
    };

    let span = tracing::info_span!("source_fetch", source = %kind, period.start = %period.start());
    match fetch.instrument(span).await {
        Ok(records) => {
            source_metrics().record_fetch(records.len());
            info!(source = %kind, records = records.len(), "source fetched");
            let status = FetchStatus::Fetched { records: records.len() };
            (records, SourceOutcome { kind, status })
        }
        Err(e) => {
            source_metrics().record_failure();
            warn!(source = %kind, error = %e, "source fetch failed, continuing with no records");
            let status = FetchStatus::Failed { error: e.to_string() };
            (Vec::new(), SourceOutcome { kind, status })
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{DeploymentSource, PullRequestSource, SourceError};
use crate::config::GitHubConfig;
use crate::dora::{Deployment, DeploymentStatus, Period, PullRequest};
use crate::http::RateLimitedHttpClient;

const PER_PAGE: usize = 100;

/// Deployments and merged pull requests across every active repository of
/// one organization.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: RateLimitedHttpClient,
    org: String,
    max_pages: u32,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: String,
    #[serde(default)]
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct RawDeployment {
    id: u64,
    sha: String,
    #[serde(rename = "ref")]
    git_ref: String,
    environment: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawDeploymentStatus {
    state: String,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    title: String,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    commit: RawCommitDetail,
}

#[derive(Debug, Deserialize)]
struct RawCommitDetail {
    committer: Option<RawSignature>,
}

#[derive(Debug, Deserialize)]
struct RawSignature {
    date: Option<DateTime<Utc>>,
}

impl GitHubSource {
    pub fn new(client: RateLimitedHttpClient, org: String, max_pages: u32) -> Self {
        Self {
            client,
            org,
            max_pages: max_pages.max(1),
        }
    }

    pub fn from_config(config: &GitHubConfig) -> Result<Self, SourceError> {
        let token = config.token.clone().ok_or(SourceError::MissingCredentials {
            provider: "github",
            hint: "set GITHUB_TOKEN or github.token",
        })?;
        let org = config.org.clone().ok_or(SourceError::MissingCredentials {
            provider: "github",
            hint: "set GITHUB_ORG or github.org",
        })?;

        let client = RateLimitedHttpClient::new(
            &config.api_base,
            token,
            &config.rate_limit,
            Duration::from_secs(config.cache_ttl_secs),
        )?;

        Ok(Self::new(client, org, config.max_pages))
    }

    /// Non-archived repository names of the organization.
    pub async fn repositories(&self) -> Result<Vec<String>, SourceError> {
        let route = format!("/orgs/{}/repos", self.org);
        let repos: Vec<RawRepository> = self
            .paginate(&route, &[("type", "all".to_string())], |_: &[RawRepository]| false)
            .await?;

        Ok(repos
            .into_iter()
            .filter(|r| !r.archived)
            .map(|r| r.name)
            .collect())
    }

    /// Walk pages until a short page, `max_pages`, or `exhausted` says the
    /// remaining pages cannot contain anything relevant.
    async fn paginate<T, F>(
        &self,
        route: &str,
        base_params: &[(&str, String)],
        exhausted: F,
    ) -> Result<Vec<T>, SourceError>
    where
        T: DeserializeOwned,
        F: Fn(&[T]) -> bool,
    {
        let mut items = Vec::new();

        for page in 1..=self.max_pages {
            let mut params = base_params.to_vec();
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));

            let batch: Vec<T> = self.client.get_json(route, &params).await?;
            let len = batch.len();
            let stop = exhausted(&batch);
            items.extend(batch);

            if len < PER_PAGE || stop {
                break;
            }
        }

        Ok(items)
    }

    async fn repo_deployments(&self, repo: &str, period: &Period) -> Result<Vec<Deployment>, SourceError> {
        let route = format!("/repos/{}/{}/deployments", self.org, repo);
        let start = period.start();
        // Newest first, so a page ending before the period ends the walk
        let raw: Vec<RawDeployment> = self
            .paginate(&route, &[], |page: &[RawDeployment]| {
                page.last().is_some_and(|d| d.created_at < start)
            })
            .await?;

        let mut deployments = Vec::new();
        for dep in raw.into_iter().filter(|d| period.contains(d.created_at)) {
            let status = self.latest_status(repo, dep.id).await?;
            deployments.push(Deployment {
                id: dep.id,
                commit_sha: dep.sha,
                git_ref: dep.git_ref,
                environment: dep.environment,
                created_at: dep.created_at,
                status,
                pull_request: None,
            });
        }

        debug!(repo, count = deployments.len(), "deployments in period");
        Ok(deployments)
    }

    async fn latest_status(&self, repo: &str, deployment_id: u64) -> Result<DeploymentStatus, SourceError> {
        let route = format!("/repos/{}/{}/deployments/{}/statuses", self.org, repo, deployment_id);
        let statuses: Vec<RawDeploymentStatus> = self
            .client
            .get_json(&route, &[("per_page", "1".to_string())])
            .await?;

        Ok(statuses
            .first()
            .map(|s| DeploymentStatus::from_github_state(&s.state))
            .unwrap_or(DeploymentStatus::Pending))
    }

    async fn repo_pull_requests(&self, repo: &str, period: &Period) -> Result<Vec<PullRequest>, SourceError> {
        let route = format!("/repos/{}/{}/pulls", self.org, repo);
        let start = period.start();
        let params = [
            ("state", "closed".to_string()),
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
        ];
        // A pull request is never merged after its last update
        let raw: Vec<RawPullRequest> = self
            .paginate(&route, &params, |page: &[RawPullRequest]| {
                page.last().is_some_and(|pr| pr.updated_at < start)
            })
            .await?;

        let mut pull_requests = Vec::new();
        for pr in raw {
            let Some(merged_at) = pr.merged_at.filter(|m| period.contains(*m)) else {
                continue;
            };
            let (first_commit_at, commit_count) = self.commit_summary(repo, pr.number).await?;
            pull_requests.push(PullRequest {
                number: pr.number,
                title: pr.title,
                created_at: pr.created_at,
                merged_at: Some(merged_at),
                closed_at: pr.closed_at,
                state: pr.state,
                commit_count,
                additions: 0,
                deletions: 0,
                first_commit_at,
            });
        }

        debug!(repo, count = pull_requests.len(), "merged pull requests in period");
        Ok(pull_requests)
    }

    /// Committer date of the first commit and the number of commits (the
    /// listing endpoint returns commits oldest first).
    async fn commit_summary(&self, repo: &str, number: u64) -> Result<(Option<DateTime<Utc>>, u32), SourceError> {
        let route = format!("/repos/{}/{}/pulls/{}/commits", self.org, repo, number);
        let commits: Vec<RawCommit> = self
            .client
            .get_json(&route, &[("per_page", PER_PAGE.to_string())])
            .await?;

        let first_commit_at = commits
            .first()
            .and_then(|c| c.commit.committer.as_ref())
            .and_then(|s| s.date);

        Ok((first_commit_at, commits.len() as u32))
    }
}

/// Run `fetch` for every repository concurrently, skipping repositories that fail.
async fn across_repositories<'a, T, F, Fut>(repos: &'a [String], fetch: F) -> Vec<T>
where
    F: Fn(&'a str) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<T>, SourceError>>,
{
    let results = join_all(repos.iter().map(|repo| {
        let fut = fetch(repo.as_str());
        async move { (repo.as_str(), fut.await) }
    }))
    .await;

    let mut records = Vec::new();
    for (repo, result) in results {
        match result {
            Ok(batch) => records.extend(batch),
            Err(e) => warn!(repo, error = %e, "skipping repository"),
        }
    }
    records
}

#[async_trait]
impl DeploymentSource for GitHubSource {
    async fn fetch_deployments(&self, period: &Period) -> Result<Vec<Deployment>, SourceError> {
        let repos = self.repositories().await?;
        Ok(across_repositories(&repos, |repo| self.repo_deployments(repo, period)).await)
    }
}

#[async_trait]
impl PullRequestSource for GitHubSource {
    async fn fetch_pull_requests(&self, period: &Period) -> Result<Vec<PullRequest>, SourceError> {
        let repos = self.repositories().await?;
        Ok(across_repositories(&repos, |repo| self.repo_pull_requests(repo, period)).await)
    }
}

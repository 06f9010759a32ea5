use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::period::Period;

/// DORA performance tier. Ordered so that `Low < Medium < High < Elite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Low,
    Medium,
    High,
    Elite,
}

impl Rating {
    /// Integer weight used when averaging ratings.
    pub fn score(self) -> u8 {
        match self {
            Rating::Low => 1,
            Rating::Medium => 2,
            Rating::High => 3,
            Rating::Elite => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Elite => "Elite Performer",
            Rating::High => "High Performer",
            Rating::Medium => "Medium Performer",
            Rating::Low => "Low Performer",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Elite => "elite",
            Rating::High => "high",
            Rating::Medium => "medium",
            Rating::Low => "low",
        }
    }

    /// True for the two tiers that trigger recommendations.
    pub fn needs_attention(self) -> bool {
        matches!(self, Rating::Low | Rating::Medium)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Success,
    Failure,
    Pending,
    InProgress,
}

impl DeploymentStatus {
    /// Map a GitHub deployment status `state` onto the four tracked statuses.
    pub fn from_github_state(state: &str) -> Self {
        match state {
            "success" => DeploymentStatus::Success,
            "failure" | "error" => DeploymentStatus::Failure,
            "in_progress" | "queued" => DeploymentStatus::InProgress,
            _ => DeploymentStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedPullRequest {
    pub number: u64,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: u64,
    pub commit_sha: String,
    pub git_ref: String,
    pub environment: String,
    pub created_at: DateTime<Utc>,
    pub status: DeploymentStatus,
    pub pull_request: Option<LinkedPullRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: String,
    pub commit_count: u32,
    pub additions: u64,
    pub deletions: u64,
    pub first_commit_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Hours from first commit (or creation when unknown) to merge.
    /// `None` for pull requests that were never merged.
    pub fn lead_time_hours(&self) -> Option<f64> {
        let merged_at = self.merged_at?;
        let started_at = self.first_commit_at.unwrap_or(self.created_at);
        Some(hours_between(started_at, merged_at))
    }
}

/// An incident tracked as an issue in Linear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub identifier: String,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    /// Authoritative resolution duration when present.
    pub cycle_time_hours: Option<f64>,
    pub labels: BTreeSet<String>,
    pub priority: u8,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Postmortem {
    pub id: String,
    pub title: String,
    pub incident_date: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
    pub severity: Severity,
    pub time_to_resolve_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentFrequency {
    pub per_day: f64,
    pub per_week: f64,
    pub total: u64,
    pub rating: Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTime {
    pub average_hours: f64,
    pub median_hours: f64,
    pub p90_hours: f64,
    pub rating: Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeFailureRate {
    pub percentage: f64,
    pub failure_count: u64,
    pub total_deployments: u64,
    pub rating: Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanTimeToRecovery {
    pub average_hours: f64,
    pub median_hours: f64,
    pub incident_count: u64,
    pub rating: Rating,
}

/// The four DORA summaries for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub period: Period,
    pub deployment_frequency: DeploymentFrequency,
    pub lead_time: LeadTime,
    pub change_failure_rate: ChangeFailureRate,
    pub mttr: MeanTimeToRecovery,
    pub generated_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    pub fn overall_rating(&self) -> Rating {
        super::calculator::overall_rating(self)
    }

    pub fn ratings(&self) -> [Rating; 4] {
        [
            self.deployment_frequency.rating,
            self.lead_time.rating,
            self.change_failure_rate.rating,
            self.mttr.rating,
        ]
    }
}

/// Signed percentage change per DORA driver value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub deployment_frequency: f64,
    pub lead_time: f64,
    pub change_failure_rate: f64,
    pub mttr: f64,
}

pub(crate) fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

/// Element at `floor(n / 2)` of an ascending slice: the upper median for even
/// lengths. Callers guarantee the slice is non-empty.
pub(crate) fn upper_median(sorted: &[f64]) -> f64 {
    sorted[sorted.len() / 2]
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn sort_ascending(values: &mut [f64]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

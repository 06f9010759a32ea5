use chrono::{DateTime, Utc};

use super::change_failure_rate::calculate_change_failure_rate;
use super::deployment_frequency::calculate_deployment_frequency;
use super::lead_time::calculate_lead_time;
use super::mttr::calculate_mttr;
use super::period::Period;
use super::types::{Deployment, Incident, MetricsSnapshot, Postmortem, PullRequest, Rating};
use crate::sources::DataFetchResult;

/// Run all four aggregators and bind the results to `period`.
pub fn calculate(
    deployments: &[Deployment],
    pull_requests: &[PullRequest],
    incidents: &[Incident],
    postmortems: &[Postmortem],
    period: &Period,
) -> MetricsSnapshot {
    calculate_at(deployments, pull_requests, incidents, postmortems, period, Utc::now())
}

/// Same as [`calculate`] with an explicit generation timestamp.
pub fn calculate_at(
    deployments: &[Deployment],
    pull_requests: &[PullRequest],
    incidents: &[Incident],
    postmortems: &[Postmortem],
    period: &Period,
    generated_at: DateTime<Utc>,
) -> MetricsSnapshot {
    let snapshot = MetricsSnapshot {
        period: *period,
        deployment_frequency: calculate_deployment_frequency(deployments, period),
        lead_time: calculate_lead_time(pull_requests),
        change_failure_rate: calculate_change_failure_rate(deployments, incidents),
        mttr: calculate_mttr(incidents, postmortems),
        generated_at,
    };

    tracing::debug!(
        period = %period,
        deployment_frequency = %snapshot.deployment_frequency.rating,
        lead_time = %snapshot.lead_time.rating,
        change_failure_rate = %snapshot.change_failure_rate.rating,
        mttr = %snapshot.mttr.rating,
        "DORA snapshot calculated"
    );

    snapshot
}

pub fn calculate_from(data: &DataFetchResult, period: &Period) -> MetricsSnapshot {
    calculate(
        &data.deployments,
        &data.pull_requests,
        &data.incidents,
        &data.postmortems,
        period,
    )
}

/// Average the four ratings (low=1 .. elite=4) and re-bucket the mean.
///
/// This is an average, not a minimum: three elite ratings and one low rating
/// average 3.25 and come out `High`.
pub fn overall_rating(snapshot: &MetricsSnapshot) -> Rating {
    average_rating(&snapshot.ratings())
}

pub fn average_rating(ratings: &[Rating]) -> Rating {
    if ratings.is_empty() {
        return Rating::Low;
    }
    let total: u32 = ratings.iter().map(|r| u32::from(r.score())).sum();
    let avg = f64::from(total) / ratings.len() as f64;

    if avg >= 3.5 {
        Rating::Elite
    } else if avg >= 2.5 {
        Rating::High
    } else if avg >= 1.5 {
        Rating::Medium
    } else {
        Rating::Low
    }
}

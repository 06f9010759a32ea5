use super::types::{ChangeFailureRate, Deployment, DeploymentStatus, Incident, Rating};

/// Share of production changes that failed.
///
/// The denominator counts finished deployments only (successful plus failed);
/// pending and in-progress deployments are left out entirely. Every incident
/// in the period adds one failure on top of the failed deployments, whether
/// or not it can be tied to a particular deployment.
pub fn calculate_change_failure_rate(
    deployments: &[Deployment],
    incidents: &[Incident],
) -> ChangeFailureRate {
    let (successful, failed) =
        deployments
            .iter()
            .fold((0u64, 0u64), |(ok, failed), d| match d.status {
                DeploymentStatus::Success => (ok + 1, failed),
                DeploymentStatus::Failure => (ok, failed + 1),
                DeploymentStatus::Pending | DeploymentStatus::InProgress => (ok, failed),
            });

    let total_deployments = successful + failed;
    let failure_count = failed + incidents.len() as u64;

    let percentage = if total_deployments > 0 {
        failure_count as f64 / total_deployments as f64 * 100.0
    } else {
        0.0
    };

    ChangeFailureRate {
        percentage,
        failure_count,
        total_deployments,
        rating: change_failure_rate_rating(percentage),
    }
}

pub fn change_failure_rate_rating(percentage: f64) -> Rating {
    if percentage <= 5.0 {
        Rating::Elite
    } else if percentage <= 10.0 {
        Rating::High
    } else if percentage <= 15.0 {
        Rating::Medium
    } else {
        Rating::Low
    }
}

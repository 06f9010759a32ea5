use super::period::Period;
use super::types::{Deployment, DeploymentFrequency, DeploymentStatus, Rating};

/// Count successful deployments and normalize them per day and per week.
///
/// Zero-length and same-day periods are treated as one day long so the rate
/// never divides by zero.
pub fn calculate_deployment_frequency(
    deployments: &[Deployment],
    period: &Period,
) -> DeploymentFrequency {
    let total = deployments
        .iter()
        .filter(|d| d.status == DeploymentStatus::Success)
        .count() as u64;

    let duration_days = period.duration_days().max(1) as f64;
    let per_day = total as f64 / duration_days;
    let per_week = per_day * 7.0;

    DeploymentFrequency {
        per_day,
        per_week,
        total,
        rating: deployment_frequency_rating(per_day),
    }
}

/// Thresholds are inclusive lower bounds: daily or better is elite, weekly
/// high, monthly medium.
pub fn deployment_frequency_rating(per_day: f64) -> Rating {
    if per_day >= 1.0 {
        Rating::Elite
    } else if per_day >= 1.0 / 7.0 {
        Rating::High
    } else if per_day >= 1.0 / 30.0 {
        Rating::Medium
    } else {
        Rating::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dora::period::PeriodKind;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn deployment(id: u64, status: DeploymentStatus) -> Deployment {
        Deployment {
            id,
            commit_sha: format!("sha{id}"),
            git_ref: "main".into(),
            environment: "production".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap(),
            status,
            pull_request: None,
        }
    }

    fn week() -> Period {
        Period::week_of(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn counts_only_successful_deployments() {
        let deployments = vec![
            deployment(1, DeploymentStatus::Success),
            deployment(2, DeploymentStatus::Failure),
            deployment(3, DeploymentStatus::Pending),
            deployment(4, DeploymentStatus::InProgress),
            deployment(5, DeploymentStatus::Success),
        ];
        let df = calculate_deployment_frequency(&deployments, &week());
        assert_eq!(df.total, 2);
        assert_eq!(df.per_day, 2.0 / 6.0);
        assert_eq!(df.per_week, df.per_day * 7.0);
        assert_eq!(df.rating, Rating::High);
    }

    #[test]
    fn zero_length_period_counts_as_one_day() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let period = Period::new(PeriodKind::Weekly, instant, instant).unwrap();
        let deployments = vec![deployment(1, DeploymentStatus::Success)];
        let df = calculate_deployment_frequency(&deployments, &period);
        assert_eq!(df.per_day, 1.0);
        assert_eq!(df.rating, Rating::Elite);
    }

    #[test]
    fn empty_input_is_low() {
        let df = calculate_deployment_frequency(&[], &week());
        assert_eq!(df.total, 0);
        assert_eq!(df.per_day, 0.0);
        assert_eq!(df.per_week, 0.0);
        assert_eq!(df.rating, Rating::Low);
    }

    #[test]
    fn rating_boundaries_are_inclusive() {
        assert_eq!(deployment_frequency_rating(1.0), Rating::Elite);
        assert_eq!(deployment_frequency_rating(0.999), Rating::High);
        assert_eq!(deployment_frequency_rating(1.0 / 7.0), Rating::High);
        assert_eq!(deployment_frequency_rating(1.0 / 30.0), Rating::Medium);
        assert_eq!(deployment_frequency_rating(0.03), Rating::Low);
    }
}

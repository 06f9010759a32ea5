use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use dora_pulse::dora::calculator::average_rating;
use dora_pulse::dora::change_failure_rate::change_failure_rate_rating;
use dora_pulse::dora::deployment_frequency::{calculate_deployment_frequency, deployment_frequency_rating};
use dora_pulse::dora::lead_time::recovery_style_rating;
use dora_pulse::dora::{
    compute_trend, ChangeFailureRate, Deployment, DeploymentFrequency, DeploymentStatus, LeadTime,
    MeanTimeToRecovery, MetricsSnapshot, Period, PeriodKind, Rating, Trend,
};
use dora_pulse::reports::generator::{highlights, recommendations};

fn rating() -> impl Strategy<Value = Rating> {
    prop_oneof![
        Just(Rating::Low),
        Just(Rating::Medium),
        Just(Rating::High),
        Just(Rating::Elite),
    ]
}

fn snapshot(ratings: [Rating; 4], values: [f64; 4], incidents: u64) -> MetricsSnapshot {
    MetricsSnapshot {
        period: Period::week_of(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()),
        deployment_frequency: DeploymentFrequency {
            per_day: values[0],
            per_week: values[0] * 7.0,
            total: (values[0] * 6.0) as u64,
            rating: ratings[0],
        },
        lead_time: LeadTime {
            average_hours: values[1],
            median_hours: values[1],
            p90_hours: values[1],
            rating: ratings[1],
        },
        change_failure_rate: ChangeFailureRate {
            percentage: values[2],
            failure_count: 0,
            total_deployments: 0,
            rating: ratings[2],
        },
        mttr: MeanTimeToRecovery {
            average_hours: values[3],
            median_hours: values[3],
            incident_count: incidents,
            rating: ratings[3],
        },
        generated_at: Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap(),
    }
}

proptest! {
    #[test]
    fn per_week_is_seven_times_per_day(successes in 0usize..200, days in 0i64..62) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let period = Period::new(PeriodKind::Monthly, start, start + Duration::days(days)).unwrap();
        let deployments: Vec<Deployment> = (0..successes)
            .map(|i| Deployment {
                id: i as u64,
                commit_sha: String::new(),
                git_ref: "main".into(),
                environment: "production".into(),
                created_at: start,
                status: DeploymentStatus::Success,
                pull_request: None,
            })
            .collect();

        let df = calculate_deployment_frequency(&deployments, &period);
        prop_assert_eq!(df.per_week, df.per_day * 7.0);
        prop_assert_eq!(df.total, successes as u64);
    }

    #[test]
    fn overall_rating_ignores_order(ratings in prop::array::uniform4(rating()), rotation in 0usize..4) {
        let mut rotated = ratings;
        rotated.rotate_left(rotation);
        let mut reversed = ratings;
        reversed.reverse();

        prop_assert_eq!(average_rating(&ratings), average_rating(&rotated));
        prop_assert_eq!(average_rating(&ratings), average_rating(&reversed));
    }

    #[test]
    fn slower_recovery_never_rates_better(a in 0.0f64..1000.0, b in 0.0f64..1000.0) {
        let (fast, slow) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(recovery_style_rating(fast) >= recovery_style_rating(slow));
    }

    #[test]
    fn more_failures_never_rate_better(a in 0.0f64..100.0, b in 0.0f64..100.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(change_failure_rate_rating(low) >= change_failure_rate_rating(high));
    }

    #[test]
    fn more_deployments_never_rate_worse(a in 0.0f64..5.0, b in 0.0f64..5.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(deployment_frequency_rating(high) >= deployment_frequency_rating(low));
    }

    #[test]
    fn report_lists_are_capped(
        ratings in prop::array::uniform4(rating()),
        values in prop::array::uniform4(0.0f64..500.0),
        incidents in 0u64..5,
        deltas in prop::array::uniform4(-200.0f64..200.0),
    ) {
        let current = snapshot(ratings, values, incidents);
        let trend = Trend {
            deployment_frequency: deltas[0],
            lead_time: deltas[1],
            change_failure_rate: deltas[2],
            mttr: deltas[3],
        };

        let highlights = highlights(&current, &trend);
        prop_assert!(!highlights.is_empty());
        prop_assert!(highlights.len() <= 5);
        prop_assert!(recommendations(&current).len() <= 5);
    }

    #[test]
    fn trend_against_self_is_zero(values in prop::array::uniform4(0.0f64..500.0)) {
        let current = snapshot([Rating::High; 4], values, 1);
        let trend = compute_trend(&current, Some(&current));
        prop_assert_eq!(trend, Trend::default());
    }
}

#[test]
fn every_condition_true_still_caps_highlights() {
    let current = snapshot([Rating::Elite; 4], [3.0, 0.5, 1.0, 0.2], 0);
    let trend = Trend {
        deployment_frequency: 80.0,
        lead_time: -60.0,
        change_failure_rate: -10.0,
        mttr: -10.0,
    };

    let list = highlights(&current, &trend);
    assert_eq!(list.len(), 5);
    assert!(list[0].starts_with("Overall DORA performance"));
    assert!(list[1].starts_with("Elite deployment frequency"));
}

#[test]
fn every_dimension_low_caps_recommendations() {
    let current = snapshot([Rating::Low; 4], [0.0, 300.0, 40.0, 200.0], 3);
    let list = recommendations(&current);
    assert_eq!(list.len(), 5);
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dora::{compute_trend, MetricsSnapshot, Period, Rating, Trend};

pub const MAX_HIGHLIGHTS: usize = 5;
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Improvement (in percent) that earns a trend highlight.
const TREND_HIGHLIGHT_THRESHOLD: f64 = 20.0;

const DEPLOYMENT_FREQUENCY_ADVICE: [&str; 2] = [
    "Ship smaller changes more often to raise deployment frequency",
    "Automate the release pipeline so deploying needs no manual steps",
];

const LEAD_TIME_ADVICE: [&str; 2] = [
    "Break large pull requests into smaller, reviewable changes",
    "Set a review turnaround target to cut time waiting for approval",
];

const CHANGE_FAILURE_ADVICE: [&str; 3] = [
    "Expand automated test coverage on the paths that failed in production",
    "Roll out risky changes behind feature flags or canary deployments",
    "Review recent incidents for recurring root causes",
];

const MTTR_ADVICE: [&str; 3] = [
    "Improve alerting so incidents are detected sooner",
    "Write runbooks for the most common incident types",
    "Practice rollbacks so recovery is routine rather than improvised",
];

/// A rendered-agnostic metrics report for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub metrics: MetricsSnapshot,
    pub trend: Trend,
    pub highlights: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn period(&self) -> &Period {
        &self.metrics.period
    }

    pub fn overall_rating(&self) -> Rating {
        self.metrics.overall_rating()
    }
}

pub fn generate_report(current: &MetricsSnapshot, previous: Option<&MetricsSnapshot>) -> Report {
    generate_report_at(current, previous, Utc::now())
}

pub fn generate_report_at(
    current: &MetricsSnapshot,
    previous: Option<&MetricsSnapshot>,
    generated_at: DateTime<Utc>,
) -> Report {
    let trend = compute_trend(current, previous);

    Report {
        title: report_title(&current.period),
        highlights: highlights(current, &trend),
        recommendations: recommendations(current),
        metrics: current.clone(),
        trend,
        generated_at,
    }
}

pub fn report_title(period: &Period) -> String {
    format!(
        "{} Engineering Metrics Report: {}–{}",
        period.kind().title_label(),
        period.start().format("%b %d, %Y"),
        period.end().format("%b %d, %Y")
    )
}

/// Conditions are evaluated in a fixed order; the order decides which
/// highlights survive the cap.
pub fn highlights(snapshot: &MetricsSnapshot, trend: &Trend) -> Vec<String> {
    let df = &snapshot.deployment_frequency;
    let lt = &snapshot.lead_time;
    let cfr = &snapshot.change_failure_rate;
    let mttr = &snapshot.mttr;

    let mut out = vec![format!(
        "Overall DORA performance: {}",
        snapshot.overall_rating().label()
    )];

    if df.rating == Rating::Elite {
        out.push(format!(
            "Elite deployment frequency: {:.1} deployments per day",
            df.per_day
        ));
    }
    if trend.deployment_frequency > TREND_HIGHLIGHT_THRESHOLD {
        out.push(format!(
            "Deployment frequency up {:.0}% from the previous period",
            trend.deployment_frequency
        ));
    }
    if matches!(lt.rating, Rating::High | Rating::Elite) {
        out.push(format!(
            "Fast lead time for changes: median {:.1} hours",
            lt.median_hours
        ));
    }
    // lower lead time is better
    if trend.lead_time < -TREND_HIGHLIGHT_THRESHOLD {
        out.push(format!(
            "Lead time improved {:.0}% from the previous period",
            trend.lead_time.abs()
        ));
    }
    if cfr.percentage < 5.0 {
        out.push(format!(
            "Low change failure rate: {:.1}%",
            cfr.percentage
        ));
    }
    if mttr.incident_count == 0 {
        out.push("No incidents recorded this period".to_string());
    } else if matches!(mttr.rating, Rating::High | Rating::Elite) {
        out.push(format!(
            "Quick recovery: median time to restore {:.1} hours",
            mttr.median_hours
        ));
    }

    out.truncate(MAX_HIGHLIGHTS);
    out
}

/// Advice for every dimension rated low or medium, in dimension order.
pub fn recommendations(snapshot: &MetricsSnapshot) -> Vec<String> {
    let dimensions: [(Rating, &[&str]); 4] = [
        (snapshot.deployment_frequency.rating, &DEPLOYMENT_FREQUENCY_ADVICE),
        (snapshot.lead_time.rating, &LEAD_TIME_ADVICE),
        (snapshot.change_failure_rate.rating, &CHANGE_FAILURE_ADVICE),
        (snapshot.mttr.rating, &MTTR_ADVICE),
    ];

    dimensions
        .iter()
        .filter(|(rating, _)| rating.needs_attention())
        .flat_map(|(_, advice)| advice.iter().map(|s| s.to_string()))
        .take(MAX_RECOMMENDATIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dora::calculate_at;
    use chrono::{NaiveDate, TimeZone};

    fn snapshot() -> MetricsSnapshot {
        let period = Period::week_of(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let at = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap();
        calculate_at(&[], &[], &[], &[], &period, at)
    }

    fn all_elite() -> MetricsSnapshot {
        let mut s = snapshot();
        s.deployment_frequency.per_day = 3.0;
        s.deployment_frequency.rating = Rating::Elite;
        s.lead_time.median_hours = 0.5;
        s.lead_time.rating = Rating::Elite;
        s.change_failure_rate.percentage = 2.0;
        s.change_failure_rate.rating = Rating::Elite;
        s.mttr.incident_count = 1;
        s.mttr.median_hours = 0.5;
        s.mttr.rating = Rating::Elite;
        s
    }

    #[test]
    fn title_names_kind_and_dates() {
        let s = snapshot();
        assert_eq!(
            report_title(&s.period),
            "Weekly Engineering Metrics Report: Jan 01, 2024–Jan 07, 2024"
        );

        let month = Period::month_of(2024, 2).unwrap();
        assert_eq!(
            report_title(&month),
            "Monthly Engineering Metrics Report: Feb 01, 2024–Feb 29, 2024"
        );
    }

    #[test]
    fn overall_rating_is_always_first() {
        let hl = highlights(&snapshot(), &Trend::default());
        assert_eq!(hl[0], "Overall DORA performance: High Performer");
    }

    #[test]
    fn empty_period_highlights() {
        let hl = highlights(&snapshot(), &Trend::default());
        assert_eq!(
            hl,
            vec![
                "Overall DORA performance: High Performer".to_string(),
                "Low change failure rate: 0.0%".to_string(),
                "No incidents recorded this period".to_string(),
            ]
        );
    }

    #[test]
    fn highlights_are_capped_in_evaluation_order() {
        let trend = Trend {
            deployment_frequency: 50.0,
            lead_time: -40.0,
            change_failure_rate: 0.0,
            mttr: 0.0,
        };
        let hl = highlights(&all_elite(), &trend);
        assert_eq!(hl.len(), MAX_HIGHLIGHTS);
        assert!(hl[0].starts_with("Overall DORA performance: Elite"));
        assert!(hl[1].starts_with("Elite deployment frequency"));
        assert!(hl[2].starts_with("Deployment frequency up 50%"));
        assert!(hl[3].starts_with("Fast lead time"));
        assert!(hl[4].starts_with("Lead time improved 40%"));
    }

    #[test]
    fn lead_time_increase_is_not_highlighted() {
        let trend = Trend {
            lead_time: 40.0,
            ..Trend::default()
        };
        let hl = highlights(&snapshot(), &trend);
        assert!(!hl.iter().any(|h| h.starts_with("Lead time improved")));
    }

    #[test]
    fn recovery_highlight_when_incidents_exist() {
        let s = all_elite();
        let hl = highlights(&s, &Trend::default());
        assert!(hl.iter().any(|h| h.starts_with("Quick recovery")));
        assert!(!hl.iter().any(|h| h.starts_with("No incidents")));
    }

    #[test]
    fn no_recommendations_when_all_elite() {
        assert!(recommendations(&all_elite()).is_empty());
    }

    #[test]
    fn recommendations_follow_dimension_order_and_cap() {
        let mut s = all_elite();
        s.deployment_frequency.rating = Rating::Low;
        s.lead_time.rating = Rating::Medium;
        s.change_failure_rate.rating = Rating::Low;
        s.mttr.rating = Rating::Low;

        let recs = recommendations(&s);
        assert_eq!(recs.len(), MAX_RECOMMENDATIONS);
        assert_eq!(recs[0], DEPLOYMENT_FREQUENCY_ADVICE[0]);
        assert_eq!(recs[1], DEPLOYMENT_FREQUENCY_ADVICE[1]);
        assert_eq!(recs[2], LEAD_TIME_ADVICE[0]);
        assert_eq!(recs[3], LEAD_TIME_ADVICE[1]);
        assert_eq!(recs[4], CHANGE_FAILURE_ADVICE[0]);
    }

    #[test]
    fn high_rating_produces_no_advice() {
        let mut s = all_elite();
        s.mttr.rating = Rating::High;
        s.change_failure_rate.rating = Rating::Medium;
        assert_eq!(recommendations(&s), CHANGE_FAILURE_ADVICE.map(String::from).to_vec());
    }

    #[test]
    fn report_carries_trend_against_previous() {
        let previous = snapshot();
        let mut current = snapshot();
        current.deployment_frequency.per_day = 1.0;

        let report = generate_report(&current, Some(&previous));
        assert_eq!(report.trend.deployment_frequency, 100.0);
        assert_eq!(report.metrics, current);
        assert!(report.highlights.len() <= MAX_HIGHLIGHTS);
        assert!(report.recommendations.len() <= MAX_RECOMMENDATIONS);
    }
}

use super::lead_time::recovery_style_rating;
use super::types::{mean, sort_ascending, upper_median, Incident, MeanTimeToRecovery, Postmortem, Rating};

/// Mean time to recovery from incident cycle times and postmortem
/// resolution times combined.
///
/// Unlike lead time, an empty input is rated `Elite`: a period without
/// recorded recoveries is the best possible outcome. Incidents that never
/// got a cycle time count as no recoveries at all.
pub fn calculate_mttr(incidents: &[Incident], postmortems: &[Postmortem]) -> MeanTimeToRecovery {
    let mut hours: Vec<f64> = incidents
        .iter()
        .filter_map(|i| i.cycle_time_hours)
        .chain(postmortems.iter().map(|p| p.time_to_resolve_hours))
        .collect();

    if hours.is_empty() {
        return MeanTimeToRecovery {
            average_hours: 0.0,
            median_hours: 0.0,
            incident_count: 0,
            rating: Rating::Elite,
        };
    }

    let incident_count = (incidents.len() + postmortems.len()) as u64;
    sort_ascending(&mut hours);
    let average_hours = mean(&hours);
    let median_hours = upper_median(&hours);

    MeanTimeToRecovery {
        average_hours,
        median_hours,
        incident_count,
        rating: recovery_style_rating(median_hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dora::types::Severity;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn incident(cycle_time_hours: Option<f64>) -> Incident {
        Incident {
            id: "lin_1".into(),
            identifier: "ENG-1".into(),
            title: "API errors".into(),
            state: "Done".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            completed_at: None,
            started_at: None,
            cycle_time_hours,
            labels: BTreeSet::new(),
            priority: 2,
            assignee: Some("oncall".into()),
        }
    }

    fn postmortem(hours: f64) -> Postmortem {
        let incident_date = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Postmortem {
            id: "post_1".into(),
            title: "Postmortem: database failover".into(),
            incident_date,
            resolved_at: incident_date,
            severity: Severity::Major,
            time_to_resolve_hours: hours,
        }
    }

    #[test]
    fn empty_input_is_elite_with_zero_stats() {
        let mttr = calculate_mttr(&[], &[]);
        assert_eq!(mttr.average_hours, 0.0);
        assert_eq!(mttr.median_hours, 0.0);
        assert_eq!(mttr.incident_count, 0);
        assert_eq!(mttr.rating, Rating::Elite);
    }

    #[test]
    fn incidents_without_cycle_time_report_zero_stats() {
        let mttr = calculate_mttr(&[incident(None), incident(None)], &[]);
        assert_eq!(mttr.incident_count, 0);
        assert_eq!(mttr.average_hours, 0.0);
        assert_eq!(mttr.median_hours, 0.0);
        assert_eq!(mttr.rating, Rating::Elite);
    }

    #[test]
    fn combines_incidents_and_postmortems() {
        let incidents = vec![incident(Some(3.0)), incident(None), incident(Some(30.0))];
        let postmortems = vec![postmortem(10.0), postmortem(200.0)];
        let mttr = calculate_mttr(&incidents, &postmortems);
        // sorted [3, 10, 30, 200], index 2
        assert_eq!(mttr.median_hours, 30.0);
        assert_eq!(mttr.average_hours, 60.75);
        assert_eq!(mttr.incident_count, 5);
        assert_eq!(mttr.rating, Rating::Medium);
    }

    #[test]
    fn short_recoveries_rate_high() {
        let mttr = calculate_mttr(&[incident(Some(3.0))], &[]);
        assert_eq!(mttr.median_hours, 3.0);
        assert_eq!(mttr.rating, Rating::High);
    }
}

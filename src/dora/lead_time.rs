use super::types::{mean, sort_ascending, upper_median, LeadTime, PullRequest, Rating};

/// Lead time for changes over merged pull requests, in hours.
///
/// Measured from the first commit when known, otherwise from PR creation.
/// No merged pull requests yields all-zero statistics rated `Low`.
pub fn calculate_lead_time(pull_requests: &[PullRequest]) -> LeadTime {
    let mut hours: Vec<f64> = pull_requests
        .iter()
        .filter_map(PullRequest::lead_time_hours)
        .collect();

    if hours.is_empty() {
        return LeadTime {
            average_hours: 0.0,
            median_hours: 0.0,
            p90_hours: 0.0,
            rating: Rating::Low,
        };
    }

    let average_hours = mean(&hours);
    sort_ascending(&mut hours);
    let median_hours = upper_median(&hours);

    let p90_index = (hours.len() as f64 * 0.9).floor() as usize;
    let p90_hours = hours.get(p90_index).copied().unwrap_or(median_hours);

    LeadTime {
        average_hours,
        median_hours,
        p90_hours,
        rating: recovery_style_rating(median_hours),
    }
}

/// Shared hour thresholds for lead time and MTTR: under an hour is elite,
/// under a day high, under a week medium.
pub fn recovery_style_rating(median_hours: f64) -> Rating {
    if median_hours < 1.0 {
        Rating::Elite
    } else if median_hours < 24.0 {
        Rating::High
    } else if median_hours < 168.0 {
        Rating::Medium
    } else {
        Rating::Low
    }
}

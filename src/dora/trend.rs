use super::types::{MetricsSnapshot, Trend};

/// Period-over-period change of each DORA driver value, in percent.
///
/// Without a previous snapshot every delta is zero. A previous value of zero
/// reports +100% for any positive current value instead of an unbounded
/// increase.
pub fn compute_trend(current: &MetricsSnapshot, previous: Option<&MetricsSnapshot>) -> Trend {
    let Some(previous) = previous else {
        return Trend::default();
    };

    Trend {
        deployment_frequency: percent_change(
            current.deployment_frequency.per_day,
            previous.deployment_frequency.per_day,
        ),
        lead_time: percent_change(current.lead_time.median_hours, previous.lead_time.median_hours),
        change_failure_rate: percent_change(
            current.change_failure_rate.percentage,
            previous.change_failure_rate.percentage,
        ),
        mttr: percent_change(current.mttr.median_hours, previous.mttr.median_hours),
    }
}

pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

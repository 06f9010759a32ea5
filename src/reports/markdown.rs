use super::generator::Report;
use crate::dora::Rating;

/// Render a report as Markdown suitable for a README, wiki page or chat.
pub fn render_markdown(report: &Report) -> String {
    let metrics = &report.metrics;
    let trend = &report.trend;
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", report.title));
    out.push_str(&format!(
        "**Overall rating:** {} {}\n\n",
        rating_badge(report.overall_rating()),
        report.overall_rating().label()
    ));

    out.push_str("## 📊 DORA Metrics\n\n");
    out.push_str("| Metric | Value | Rating | Trend |\n");
    out.push_str("|---|---|---|---|\n");
    out.push_str(&format!(
        "| Deployment Frequency | {:.2}/day ({:.1}/week, {} total) | {} {} | {} |\n",
        metrics.deployment_frequency.per_day,
        metrics.deployment_frequency.per_week,
        metrics.deployment_frequency.total,
        rating_badge(metrics.deployment_frequency.rating),
        metrics.deployment_frequency.rating,
        format_trend(trend.deployment_frequency)
    ));
    out.push_str(&format!(
        "| Lead Time for Changes | {} median, {} p90 | {} {} | {} |\n",
        format_hours(metrics.lead_time.median_hours),
        format_hours(metrics.lead_time.p90_hours),
        rating_badge(metrics.lead_time.rating),
        metrics.lead_time.rating,
        format_trend(trend.lead_time)
    ));
    out.push_str(&format!(
        "| Change Failure Rate | {:.1}% ({}/{}) | {} {} | {} |\n",
        metrics.change_failure_rate.percentage,
        metrics.change_failure_rate.failure_count,
        metrics.change_failure_rate.total_deployments,
        rating_badge(metrics.change_failure_rate.rating),
        metrics.change_failure_rate.rating,
        format_trend(trend.change_failure_rate)
    ));
    out.push_str(&format!(
        "| Time to Restore | {} median ({} incidents) | {} {} | {} |\n\n",
        format_hours(metrics.mttr.median_hours),
        metrics.mttr.incident_count,
        rating_badge(metrics.mttr.rating),
        metrics.mttr.rating,
        format_trend(trend.mttr)
    ));

    if !report.highlights.is_empty() {
        out.push_str("## ✨ Highlights\n\n");
        for highlight in &report.highlights {
            out.push_str(&format!("- {highlight}\n"));
        }
        out.push('\n');
    }

    if !report.recommendations.is_empty() {
        out.push_str("## 🎯 Recommendations\n\n");
        for (i, rec) in report.recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {rec}\n", i + 1));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "_Generated {}_\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out
}

pub fn rating_badge(rating: Rating) -> &'static str {
    match rating {
        Rating::Elite => "🟢",
        Rating::High => "🔵",
        Rating::Medium => "🟡",
        Rating::Low => "🔴",
    }
}

/// Human-friendly duration: minutes under an hour, days past two days.
pub fn format_hours(hours: f64) -> String {
    if hours < 1.0 {
        format!("{:.0}m", hours * 60.0)
    } else if hours < 48.0 {
        format!("{hours:.1}h")
    } else {
        format!("{:.1}d", hours / 24.0)
    }
}

pub fn format_trend(change: f64) -> String {
    if change > 0.0 {
        format!("↑ {change:.0}%")
    } else if change < 0.0 {
        format!("↓ {:.0}%", change.abs())
    } else {
        "→ 0%".to_string()
    }
}

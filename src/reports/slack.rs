use serde_json::{json, Value};

use super::generator::Report;
use super::markdown::{format_hours, format_trend, rating_badge};

/// Slack Block Kit message for an incoming webhook.
pub fn slack_payload(report: &Report) -> Value {
    let m = &report.metrics;
    let t = &report.trend;

    let fields = vec![
        mrkdwn(format!(
            "*Deployment Frequency*\n{} {:.2}/day ({})",
            rating_badge(m.deployment_frequency.rating),
            m.deployment_frequency.per_day,
            format_trend(t.deployment_frequency)
        )),
        mrkdwn(format!(
            "*Lead Time*\n{} {} median ({})",
            rating_badge(m.lead_time.rating),
            format_hours(m.lead_time.median_hours),
            format_trend(t.lead_time)
        )),
        mrkdwn(format!(
            "*Change Failure Rate*\n{} {:.1}% ({})",
            rating_badge(m.change_failure_rate.rating),
            m.change_failure_rate.percentage,
            format_trend(t.change_failure_rate)
        )),
        mrkdwn(format!(
            "*Time to Restore*\n{} {} median ({})",
            rating_badge(m.mttr.rating),
            format_hours(m.mttr.median_hours),
            format_trend(t.mttr)
        )),
    ];

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": report.title, "emoji": true }
        }),
        json!({
            "type": "section",
            "text": mrkdwn(format!(
                "*Overall:* {} {}",
                rating_badge(report.overall_rating()),
                report.overall_rating().label()
            ))
        }),
        json!({ "type": "section", "fields": fields }),
    ];

    if !report.highlights.is_empty() {
        blocks.push(json!({ "type": "divider" }));
        blocks.push(json!({
            "type": "section",
            "text": mrkdwn(bullet_list("✨ *Highlights*", &report.highlights))
        }));
    }

    if !report.recommendations.is_empty() {
        blocks.push(json!({
            "type": "section",
            "text": mrkdwn(bullet_list("🎯 *Recommendations*", &report.recommendations))
        }));
    }

    blocks.push(json!({
        "type": "context",
        "elements": [mrkdwn(format!(
            "Generated {}",
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        ))]
    }));

    json!({
        "text": report.title,
        "blocks": blocks,
    })
}

fn mrkdwn(text: String) -> Value {
    json!({ "type": "mrkdwn", "text": text })
}

fn bullet_list(heading: &str, items: &[String]) -> String {
    let mut text = heading.to_string();
    for item in items {
        text.push_str("\n• ");
        text.push_str(item);
    }
    text
}

use futures::future::join_all;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::NotificationConfig;
use crate::http::{send_with_retry, RetryConfig};
use crate::reports::{render_markdown, slack_payload, Report};
use crate::sources::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to build notification client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("delivery failed: {0}")]
    Delivery(#[from] SourceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    /// Slack incoming webhook receiving Block Kit JSON
    Slack { url: String },
    /// Generic endpoint receiving `{ title, markdown, overall_rating }`
    Webhook { url: String },
}

impl Channel {
    pub fn kind(&self) -> &'static str {
        match self {
            Channel::Slack { .. } => "slack",
            Channel::Webhook { .. } => "webhook",
        }
    }

    fn url(&self) -> &str {
        match self {
            Channel::Slack { url } | Channel::Webhook { url } => url,
        }
    }

    /// Host of the webhook URL; the full URL often embeds a secret.
    pub fn target(&self) -> String {
        reqwest::Url::parse(self.url())
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "<invalid url>".to_string())
    }

    fn payload(&self, report: &Report) -> serde_json::Value {
        match self {
            Channel::Slack { .. } => slack_payload(report),
            Channel::Webhook { .. } => json!({
                "title": report.title,
                "markdown": render_markdown(report),
                "overall_rating": report.overall_rating(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryOutcome {
    pub channel: &'static str,
    pub target: String,
    pub delivered: bool,
    pub error: Option<String>,
}

/// Posts a finished report to every configured channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
    channels: Vec<Channel>,
    retry: RetryConfig,
}

impl Notifier {
    pub fn new(channels: Vec<Channel>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            channels,
            retry: RetryConfig::with_max_retries(2),
        })
    }

    pub fn from_config(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let mut channels = Vec::new();
        if let Some(url) = &config.slack_webhook_url {
            channels.push(Channel::Slack { url: url.clone() });
        }
        channels.extend(
            config
                .webhook_urls
                .iter()
                .map(|url| Channel::Webhook { url: url.clone() }),
        );

        Self::new(channels, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Deliver to all channels concurrently. Failures are logged and
    /// reported per channel, never raised.
    pub async fn dispatch(&self, report: &Report) -> Vec<DeliveryOutcome> {
        let deliveries = self.channels.iter().map(|channel| async move {
            let result = self.deliver(channel, report).await;
            match result {
                Ok(()) => {
                    info!(channel = channel.kind(), target = %channel.target(), "report delivered");
                    DeliveryOutcome {
                        channel: channel.kind(),
                        target: channel.target(),
                        delivered: true,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(channel = channel.kind(), target = %channel.target(), error = %e, "report delivery failed");
                    DeliveryOutcome {
                        channel: channel.kind(),
                        target: channel.target(),
                        delivered: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        });

        join_all(deliveries).await
    }

    async fn deliver(&self, channel: &Channel, report: &Report) -> Result<(), NotifyError> {
        let payload = channel.payload(report);
        send_with_retry(&self.retry, || self.client.post(channel.url()).json(&payload)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dora::{calculate, Period};
    use crate::reports::generate_report;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn empty_report() -> Report {
        let period = Period::week_of(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let snapshot = calculate(&[], &[], &[], &[], &period);
        generate_report(&snapshot, None)
    }

    fn fast(notifier: Notifier) -> Notifier {
        notifier.with_retry(RetryConfig {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        })
    }

    #[test]
    fn channels_follow_configuration() {
        let config = NotificationConfig {
            slack_webhook_url: Some("https://hooks.slack.com/services/T/B/secret".into()),
            webhook_urls: vec!["https://example.com/hook".into()],
            timeout_secs: 5,
        };
        let notifier = Notifier::from_config(&config).unwrap();
        assert_eq!(notifier.channels().len(), 2);
        assert_eq!(notifier.channels()[0].kind(), "slack");
        assert_eq!(notifier.channels()[0].target(), "hooks.slack.com");
    }

    #[tokio::test]
    async fn failed_channel_does_not_block_others() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/slack"))
            .and(body_partial_json(serde_json::json!({"blocks": [{"type": "header"}]})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
            .expect(1)
            .mount(&server)
            .await;

        let channels = vec![
            Channel::Slack { url: format!("{}/slack", server.uri()) },
            Channel::Webhook { url: format!("{}/hook", server.uri()) },
        ];
        let notifier = fast(Notifier::new(channels, Duration::from_secs(5)).unwrap());

        let outcomes = notifier.dispatch(&empty_report()).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].delivered);
        assert!(!outcomes[1].delivered);
        assert!(outcomes[1].error.as_deref().unwrap_or_default().contains("bad payload"));
    }

    #[tokio::test]
    async fn webhook_receives_markdown_and_rating() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({"overall_rating": "high"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let channels = vec![Channel::Webhook { url: format!("{}/hook", server.uri()) }];
        let notifier = fast(Notifier::new(channels, Duration::from_secs(5)).unwrap());

        let outcomes = notifier.dispatch(&empty_report()).await;
        assert!(outcomes[0].delivered);
    }

    #[tokio::test]
    async fn no_channels_means_no_outcomes() {
        let notifier = Notifier::new(Vec::new(), Duration::from_secs(1)).unwrap();
        assert!(notifier.dispatch(&empty_report()).await.is_empty());
    }
}

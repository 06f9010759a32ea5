use anyhow::Result;
use chrono::Utc;

use super::Command;
use crate::cli::ReportFormat;
use crate::config::DoraPulseConfig;
use crate::dora::PeriodKind;
use crate::reports::slack_payload;
use crate::workflow::{MetricsWorkflow, WorkflowOutput};

pub struct ReportCommand {
    pub config: DoraPulseConfig,
    pub period: PeriodKind,
    pub format: ReportFormat,
    pub notify: bool,
}

impl ReportCommand {
    pub fn new(config: DoraPulseConfig, period: PeriodKind, format: ReportFormat, notify: bool) -> Self {
        Self {
            config,
            period,
            format,
            notify,
        }
    }

    fn render(&self, output: &WorkflowOutput) -> Result<String> {
        Ok(match self.format {
            ReportFormat::Markdown => output.markdown.clone(),
            ReportFormat::Json => serde_json::to_string_pretty(&output.report)?,
            ReportFormat::Slack => serde_json::to_string_pretty(&slack_payload(&output.report))?,
        })
    }
}

impl Command for ReportCommand {
    async fn execute(&self) -> Result<()> {
        let workflow = MetricsWorkflow::from_config(&self.config, self.notify)?;
        let output = workflow.run(self.period, Utc::now()).await;

        println!("{}", self.render(&output)?);

        for source in &output.degraded_sources {
            eprintln!("⚠️  {source} could not be fetched; the report counts it as empty");
        }
        for delivery in &output.deliveries {
            match &delivery.error {
                None => eprintln!("✅ Delivered to {} ({})", delivery.channel, delivery.target),
                Some(e) => eprintln!("❌ Delivery to {} ({}) failed: {e}", delivery.channel, delivery.target),
            }
        }

        Ok(())
    }
}

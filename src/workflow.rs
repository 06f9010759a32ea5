use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn, Instrument};

use crate::config::DoraPulseConfig;
use crate::dora::{calculate_from, MetricsSnapshot, Period, PeriodKind};
use crate::notify::{DeliveryOutcome, Notifier, NotifyError};
use crate::observability::{create_workflow_span, OperationTimer};
use crate::reports::{generate_report_at, render_markdown, Report};
use crate::sources::{gather, SourceKind, SourceSet};
use crate::telemetry::generate_correlation_id;

/// Result of one full reporting run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutput {
    pub report: Report,
    pub markdown: String,
    pub deliveries: Vec<DeliveryOutcome>,
    pub degraded_sources: Vec<SourceKind>,
}

/// Report plus the sources that fell back to empty lists while building it.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRun {
    pub report: Report,
    pub degraded_sources: Vec<SourceKind>,
}

/// Resolves the reporting period, fetches both it and the prior period,
/// and turns them into a report.
pub struct MetricsWorkflow {
    sources: SourceSet,
    notifier: Option<Notifier>,
}

impl MetricsWorkflow {
    pub fn new(sources: SourceSet, notifier: Option<Notifier>) -> Self {
        Self { sources, notifier }
    }

    /// Sources from credentials in `config`; notifications only when
    /// `notify` is set and at least one channel is configured.
    pub fn from_config(config: &DoraPulseConfig, notify: bool) -> Result<Self, NotifyError> {
        let notifier = if notify {
            let notifier = Notifier::from_config(&config.notifications)?;
            (!notifier.channels().is_empty()).then_some(notifier)
        } else {
            None
        };

        Ok(Self::new(SourceSet::from_config(config), notifier))
    }

    /// Snapshot of the last completed period of `kind`, no comparison.
    pub async fn snapshot(&self, kind: PeriodKind, now: DateTime<Utc>) -> MetricsSnapshot {
        let period = Period::last_completed(kind, now);
        self.snapshot_for(&period).await
    }

    /// Snapshot of an arbitrary period, no comparison.
    pub async fn snapshot_for(&self, period: &Period) -> MetricsSnapshot {
        let data = gather(&self.sources, period).await;
        for source in data.degraded() {
            warn!(%source, period = %period, "snapshot built without source");
        }
        calculate_from(&data, period)
    }

    /// Report for the last completed period of `kind`, compared with the
    /// period before it.
    pub async fn report(&self, kind: PeriodKind, now: DateTime<Utc>) -> ReportRun {
        let period = Period::last_completed(kind, now);
        self.report_for(&period, now).await
    }

    pub async fn report_for(&self, period: &Period, now: DateTime<Utc>) -> ReportRun {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("dora_report", &correlation_id);

        async {
            let timer = OperationTimer::new("dora_report");
            let previous_period = period.previous();

            let (current_data, previous_data) = tokio::join!(
                gather(&self.sources, period),
                gather(&self.sources, &previous_period),
            );

            let current = calculate_from(&current_data, period);
            let previous = calculate_from(&previous_data, &previous_period);
            let report = generate_report_at(&current, Some(&previous), now);

            let mut degraded_sources = current_data.degraded();
            for source in previous_data.degraded() {
                if !degraded_sources.contains(&source) {
                    degraded_sources.push(source);
                }
            }

            info!(
                period = %period,
                overall = %report.overall_rating(),
                degraded = degraded_sources.len(),
                "report generated"
            );
            timer.finish();

            ReportRun {
                report,
                degraded_sources,
            }
        }
        .instrument(span)
        .await
    }

    /// Full run: report, markdown rendering and notification delivery.
    pub async fn run(&self, kind: PeriodKind, now: DateTime<Utc>) -> WorkflowOutput {
        let ReportRun {
            report,
            degraded_sources,
        } = self.report(kind, now).await;
        let markdown = render_markdown(&report);

        let deliveries = match &self.notifier {
            Some(notifier) => notifier.dispatch(&report).await,
            None => Vec::new(),
        };

        WorkflowOutput {
            report,
            markdown,
            deliveries,
            degraded_sources,
        }
    }
}

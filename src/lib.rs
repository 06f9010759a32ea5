// dora-pulse library - DORA metrics from GitHub, Linear and Slab
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod dora;
pub mod http;
pub mod notify;
pub mod observability;
pub mod reports;
pub mod server;
pub mod shutdown;
pub mod sources;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::DoraPulseConfig;
pub use dora::{
    calculate, compute_trend, overall_rating, MetricsSnapshot, Period, PeriodError, PeriodKind,
    Rating, Trend,
};
pub use http::RateLimitedHttpClient;
pub use notify::{DeliveryOutcome, Notifier, NotifyError};
pub use observability::{source_metrics, OperationTimer, SourceFetchMetrics};
pub use reports::{generate_report, render_markdown, slack_payload, Report};
pub use sources::{gather, DataFetchResult, SourceError, SourceSet};
pub use telemetry::{generate_correlation_id, init_telemetry};
pub use workflow::{MetricsWorkflow, WorkflowOutput};

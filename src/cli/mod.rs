use clap::{Parser, Subcommand, ValueEnum};

use crate::dora::PeriodKind;

pub mod commands;

#[derive(Parser)]
#[command(name = "dora-pulse")]
#[command(about = "DORA metrics reports from GitHub, Linear and Slab")]
#[command(long_about = "dora-pulse gathers deployments and pull requests from GitHub, incidents from Linear \
                       and postmortems from Slab, then reports the four DORA metrics for the last completed \
                       week or month with a comparison against the period before it.")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub config: std::path::PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a report for the last completed period and deliver it
    Report {
        /// Reporting period
        #[arg(long, value_enum, default_value_t = PeriodArg::Weekly)]
        period: PeriodArg,
        /// Output format written to stdout
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
        /// Skip Slack and webhook delivery
        #[arg(long, help = "Print the report without notifying configured channels")]
        no_notify: bool,
    },
    /// Serve snapshots and reports over HTTP
    Serve {
        /// Address to bind, overrides server.bind_addr
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Weekly,
    Monthly,
}

impl From<PeriodArg> for PeriodKind {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Weekly => PeriodKind::Weekly,
            PeriodArg::Monthly => PeriodKind::Monthly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Markdown,
    Json,
    Slack,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_defaults_to_weekly_markdown() {
        let cli = Cli::try_parse_from(["dora-pulse", "report"]).unwrap();
        match cli.command {
            Commands::Report { period, format, no_notify } => {
                assert_eq!(period, PeriodArg::Weekly);
                assert_eq!(format, ReportFormat::Markdown);
                assert!(!no_notify);
            }
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn report_accepts_period_format_and_no_notify() {
        let cli = Cli::try_parse_from([
            "dora-pulse", "report", "--period", "monthly", "--format", "slack", "--no-notify",
        ])
        .unwrap();
        match cli.command {
            Commands::Report { period, format, no_notify } => {
                assert_eq!(PeriodKind::from(period), PeriodKind::Monthly);
                assert_eq!(format, ReportFormat::Slack);
                assert!(no_notify);
            }
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn serve_takes_optional_bind() {
        let cli = Cli::try_parse_from(["dora-pulse", "serve", "--bind", "127.0.0.1:9000"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { bind: Some(ref b) } if b == "127.0.0.1:9000"));
    }

    #[test]
    fn unknown_period_is_rejected() {
        assert!(Cli::try_parse_from(["dora-pulse", "report", "--period", "daily"]).is_err());
    }
}

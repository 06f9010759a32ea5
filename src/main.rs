use anyhow::Result;
use clap::Parser;

use dora_pulse::cli::commands::{Command, ReportCommand, ServeCommand};
use dora_pulse::cli::{Cli, Commands};
use dora_pulse::config::DoraPulseConfig;
use dora_pulse::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();

    DoraPulseConfig::load_env_file()?;
    let config = DoraPulseConfig::load_from(&cli.config)?;
    init_telemetry(&config.observability)?;

    match cli.command {
        Commands::Report {
            period,
            format,
            no_notify,
        } => tokio::runtime::Runtime::new()?.block_on(async {
            ReportCommand::new(config, period.into(), format, !no_notify)
                .execute()
                .await
        }),
        Commands::Serve { bind } => tokio::runtime::Runtime::new()?.block_on(async {
            ServeCommand::new(config, bind).execute().await
        }),
    }
}

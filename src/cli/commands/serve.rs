use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::Command;
use crate::config::DoraPulseConfig;
use crate::server::{build_router, AppState};
use crate::shutdown::shutdown_signal;
use crate::workflow::MetricsWorkflow;

pub struct ServeCommand {
    pub config: DoraPulseConfig,
    pub bind: Option<String>,
}

impl ServeCommand {
    pub fn new(config: DoraPulseConfig, bind: Option<String>) -> Self {
        Self { config, bind }
    }
}

impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        // Served reports never notify; delivery belongs to `report`
        let workflow = Arc::new(MetricsWorkflow::from_config(&self.config, false)?);
        let state = AppState::new(
            workflow,
            Duration::from_secs(self.config.server.report_cache_ttl_secs),
        );
        let app = build_router(state);

        let bind = self.bind.as_deref().unwrap_or(&self.config.server.bind_addr);
        let addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("invalid bind address '{bind}'"))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(%addr, "dora-pulse listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        Ok(())
    }
}

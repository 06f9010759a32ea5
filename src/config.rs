use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "dora-pulse.toml";

/// Main configuration structure for dora-pulse.
///
/// Every section has defaults so a partial file (or none at all) is valid.
/// Credentials stay optional here; a source without credentials is simply
/// left out of the run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DoraPulseConfig {
    pub github: GitHubConfig,
    pub linear: LinearConfig,
    pub slab: SlabConfig,
    pub notifications: NotificationConfig,
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token (falls back to GITHUB_TOKEN)
    pub token: Option<String>,
    /// Organization whose repositories are scanned (falls back to GITHUB_ORG)
    pub org: Option<String>,
    pub api_base: String,
    /// Upper bound on pages fetched per listing
    pub max_pages: u32,
    pub rate_limit: RateLimitConfig,
    /// Lifetime of cached GET responses
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_capacity: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LinearConfig {
    /// Linear API key (falls back to LINEAR_API_KEY)
    pub api_key: Option<String>,
    pub api_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Issues carrying any of these labels count as incidents
    pub incident_labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SlabConfig {
    /// Slab API token (falls back to SLAB_API_TOKEN)
    pub api_token: Option<String>,
    /// Slab team id (falls back to SLAB_TEAM_ID)
    pub team_id: Option<String>,
    pub api_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Slack incoming webhook (falls back to SLACK_WEBHOOK_URL)
    pub slack_webhook_url: Option<String>,
    /// Generic JSON webhooks receiving the markdown report
    pub webhook_urls: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub report_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json_logs: bool,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            org: None,
            api_base: "https://api.github.com".to_string(),
            max_pages: 10,
            rate_limit: RateLimitConfig::default(),
            cache_ttl_secs: 300,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // 5000 requests/hour for authenticated users is ~1.4/s
        Self {
            requests_per_second: 1,
            burst_capacity: 10,
        }
    }
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.linear.app/graphql".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            incident_labels: ["bug", "incident", "outage", "hotfix", "p0", "sev0", "sev1"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for SlabConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            team_id: None,
            api_url: "https://api.slab.com/v1".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            slack_webhook_url: None,
            webhook_urls: Vec::new(),
            timeout_secs: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            report_cache_ttl_secs: 900,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl DoraPulseConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. `dora-pulse.toml` in the working directory
    /// 3. Environment variables prefixed with `DORA_PULSE_` (sections split by `__`,
    ///    e.g. `DORA_PULSE_GITHUB__ORG`)
    /// 4. Well-known credential variables for anything still unset
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("DORA_PULSE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut dora_config: DoraPulseConfig = builder.build()?.try_deserialize()?;
        dora_config.apply_credential_fallbacks(|key| std::env::var(key).ok());

        Ok(dora_config)
    }

    /// Fill unset credentials from the conventional variable names.
    pub fn apply_credential_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        fill(&mut self.github.token, || non_empty("GITHUB_TOKEN"));
        fill(&mut self.github.org, || non_empty("GITHUB_ORG"));
        fill(&mut self.linear.api_key, || non_empty("LINEAR_API_KEY"));
        fill(&mut self.slab.api_token, || non_empty("SLAB_API_TOKEN"));
        fill(&mut self.slab.team_id, || non_empty("SLAB_TEAM_ID"));
        fill(&mut self.notifications.slack_webhook_url, || {
            non_empty("SLACK_WEBHOOK_URL")
        });
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

fn fill(slot: &mut Option<String>, fallback: impl FnOnce() -> Option<String>) {
    if slot.is_none() {
        *slot = fallback();
    }
}

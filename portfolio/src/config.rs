//! Portfolio configuration loading
//!
//! Loads configuration from `~/.config/epm/portfolio.toml` (or `EPM_CONFIG`
//! env), then applies `PS_*` environment overrides.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use epm_bridge::{BridgeApi, BridgeClient};
use epm_ps_client::{PsConnectionConfig, QueueWaitPolicy, SchedulingApi, SchedulingServiceClient};
use serde::Deserialize;

use crate::error::{PortfolioError, Result};
use crate::service::{PortfolioDataService, ServiceOptions};
use crate::static_data::StaticDataset;

/// Root configuration for the portfolio service
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PortfolioConfig {
    #[serde(default)]
    pub project_server: ProjectServerConfig,

    #[serde(default)]
    pub bridge: BridgeSettings,

    /// Directory holding the static JSON dataset
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            project_server: ProjectServerConfig::default(),
            bridge: BridgeSettings::default(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProjectServerConfig {
    #[serde(default = "default_ps_url")]
    pub url: String,

    #[serde(default)]
    pub username: String,

    /// Without a password the service runs on static data only.
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub domain: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_queue_poll_ms")]
    pub queue_poll_ms: u64,

    #[serde(default = "default_queue_max_wait_secs")]
    pub queue_max_wait_secs: u64,
}

fn default_ps_url() -> String {
    "http://localhost/pwa".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_queue_poll_ms() -> u64 {
    2_000
}

fn default_queue_max_wait_secs() -> u64 {
    60
}

impl Default for ProjectServerConfig {
    fn default() -> Self {
        Self {
            url: default_ps_url(),
            username: String::new(),
            password: None,
            domain: String::new(),
            enabled: default_enabled(),
            cache_ttl_secs: default_cache_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            queue_poll_ms: default_queue_poll_ms(),
            queue_max_wait_secs: default_queue_max_wait_secs(),
        }
    }
}

/// Where the portfolio service reaches the automation bridge.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BridgeSettings {
    /// Bridge base URL; bridge features are off when unset.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_bridge_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bridge_timeout_secs() -> u64 {
    120
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_bridge_timeout_secs(),
        }
    }
}

impl PortfolioConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "EPM_CONFIG";

    pub const DEFAULT_CONFIG_FILENAME: &'static str = "portfolio.toml";

    /// Load the config file (defaults when absent), then apply environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let path = Self::resolve_config_path();

        let config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            tracing::info!(path = %path.display(), "portfolio config not found, using defaults");
            Self::default()
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PortfolioError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;

        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: PortfolioConfig = toml::from_str(contents)
            .map_err(|e| PortfolioError::config_with_source("failed to parse config", e))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `PS_*` and `EPM_DATA_DIR` overrides read through `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let ps = &mut self.project_server;

        if let Some(url) = get("PS_URL") {
            ps.url = url;
        }
        if let Some(username) = get("PS_USERNAME") {
            ps.username = username;
        }
        if let Some(password) = get("PS_PASSWORD") {
            ps.password = Some(password);
        }
        if let Some(domain) = get("PS_DOMAIN") {
            ps.domain = domain;
        }
        if get("PS_ENABLED").as_deref() == Some("false") {
            ps.enabled = false;
        }
        if let Some(ttl) = get("PS_CACHE_TTL") {
            ps.cache_ttl_secs = ttl.trim().parse().map_err(|e| {
                PortfolioError::config_with_source(format!("invalid PS_CACHE_TTL {ttl:?}"), e)
            })?;
        }
        if let Some(url) = get("PS_BRIDGE_URL") {
            self.bridge.url = Some(url);
        }
        if let Some(dir) = get("EPM_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        self.validate()?;
        Ok(self)
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("epm").join(Self::DEFAULT_CONFIG_FILENAME))
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    fn validate(&self) -> Result<()> {
        if self.project_server.url.trim().is_empty() {
            return Err(PortfolioError::config("project_server.url must not be empty"));
        }
        if self.project_server.queue_poll_ms == 0 {
            return Err(PortfolioError::config(
                "project_server.queue_poll_ms must be positive",
            ));
        }

        if self.project_server.enabled && !self.ps_enabled() {
            tracing::warn!("PS_PASSWORD not set; Project Server disabled, serving static data");
        }

        Ok(())
    }

    /// Live access requires the switch on and a non-empty password.
    pub fn ps_enabled(&self) -> bool {
        self.project_server.enabled
            && self
                .project_server
                .password
                .as_deref()
                .is_some_and(|password| !password.is_empty())
    }

    pub fn ps_connection(&self) -> Option<PsConnectionConfig> {
        if !self.ps_enabled() {
            return None;
        }
        let ps = &self.project_server;
        let mut connection = PsConnectionConfig::new(
            ps.url.clone(),
            ps.username.clone(),
            ps.password.clone().unwrap_or_default(),
            ps.domain.clone(),
        );
        connection.request_timeout = Duration::from_secs(ps.request_timeout_secs);
        connection.queue_wait = QueueWaitPolicy {
            poll_interval: Duration::from_millis(ps.queue_poll_ms),
            max_wait: Duration::from_secs(ps.queue_max_wait_secs),
        };
        Some(connection)
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            cache_ttl: Duration::from_secs(self.project_server.cache_ttl_secs),
            enabled: self.ps_enabled(),
        }
    }

    /// Wire the production clients and the on-disk dataset into a service.
    pub fn build_service(&self) -> Result<PortfolioDataService> {
        let ps: Option<Arc<dyn SchedulingApi>> = match self.ps_connection() {
            Some(connection) => {
                let client = SchedulingServiceClient::new(connection).map_err(|e| {
                    PortfolioError::config_with_source("failed to build Project Server client", e)
                })?;
                Some(Arc::new(client))
            }
            None => None,
        };

        let bridge: Option<Arc<dyn BridgeApi>> = match &self.bridge.url {
            Some(url) => {
                let client = BridgeClient::with_timeout(
                    url.clone(),
                    Duration::from_secs(self.bridge.timeout_secs),
                )
                .map_err(|e| PortfolioError::config_with_source("failed to build bridge client", e))?;
                Some(Arc::new(client))
            }
            None => None,
        };

        let dataset = StaticDataset::load_dir(&self.data_dir)?;

        Ok(PortfolioDataService::new(
            ps,
            bridge,
            Arc::new(dataset),
            self.service_options(),
        ))
    }
}

//! Bridge server settings, read from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::runner::{AutomationCommand, PwaCredentials};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PWA_URL: &str = "http://localhost/pwa";
pub const DEFAULT_SCRIPT: &str = "Invoke-PSAssignment.ps1";
pub const DEFAULT_SHELL: &str = "powershell.exe";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub credentials: PwaCredentials,
    pub script: PathBuf,
    pub shell: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            credentials: PwaCredentials {
                pwa_url: DEFAULT_PWA_URL.to_string(),
                ..PwaCredentials::default()
            },
            script: PathBuf::from(DEFAULT_SCRIPT),
            shell: DEFAULT_SHELL.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by `PS_BRIDGE_PORT`, `PWA_URL`, `PS_USERNAME`,
    /// `PS_PASSWORD`, `PS_DOMAIN`, `PS_BRIDGE_SCRIPT` and `PS_BRIDGE_SHELL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PS_BRIDGE_PORT") {
            match port.trim().parse() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!(value = %port, "ignoring invalid PS_BRIDGE_PORT"),
            }
        }
        if let Some(url) = get("PWA_URL") {
            config.credentials.pwa_url = url;
        }
        if let Some(username) = get("PS_USERNAME") {
            config.credentials.username = username;
        }
        if let Some(password) = get("PS_PASSWORD") {
            config.credentials.password = password;
        }
        if let Some(domain) = get("PS_DOMAIN") {
            config.credentials.domain = domain;
        }
        if let Some(script) = get("PS_BRIDGE_SCRIPT") {
            config.script = PathBuf::from(script);
        }
        if let Some(shell) = get("PS_BRIDGE_SHELL") {
            config.shell = shell;
        }
        config
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn automation_command(&self) -> AutomationCommand {
        AutomationCommand::with_shell(&self.shell, self.script.clone(), self.credentials.clone())
    }
}

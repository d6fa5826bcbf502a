//! Console configuration loading.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::ConsoleError;

pub const DEFAULT_REMOTE_HOST: &str = "localhost";
pub const DEFAULT_REMOTE_PORT: u16 = 8080;
pub const DEFAULT_SITEMAP: &str = "default";
pub const DEFAULT_LISTEN_HOST: &str = "localhost";
pub const DEFAULT_LISTEN_PORT: u16 = 23234;
pub const DEFAULT_HOST_KEY: &str = ".ssh/term_info_ed25519";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_SETTLE: Duration = Duration::from_millis(25);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);
const DEFAULT_MAX_SESSIONS: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct ConsoleConfig {
    pub remote: RemoteConfig,
    pub server: ServerConfig,
    pub ui: UiConfig,
}

/// Where the sitemap lives.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub host: SmolStr,
    pub port: u16,
    pub sitemap: SmolStr,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: SmolStr::new(DEFAULT_REMOTE_HOST),
            port: DEFAULT_REMOTE_PORT,
            sitemap: SmolStr::new(DEFAULT_SITEMAP),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RemoteConfig {
    #[must_use]
    pub fn sitemap_url(&self) -> String {
        format!(
            "http://{}:{}/rest/sitemaps/{}",
            self.host, self.port, self.sitemap
        )
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub enabled: bool,
    pub host: SmolStr,
    pub port: u16,
    pub max_sessions: usize,
    pub shutdown_grace: Duration,
    /// Ed25519 host key, generated on first start when missing.
    pub host_key: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: SmolStr::new(DEFAULT_LISTEN_HOST),
            port: DEFAULT_LISTEN_PORT,
            max_sessions: DEFAULT_MAX_SESSIONS,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            host_key: PathBuf::from(DEFAULT_HOST_KEY),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    /// Wait after a command before the state is read back.
    pub settle: Duration,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
        }
    }
}

impl ConsoleConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ConsoleError::InvalidConfig(
                format!("{}: failed to read config: {err}", path.display()).into(),
            )
        })?;
        Self::parse(&text).map_err(|err| match err {
            ConsoleError::InvalidConfig(message) => {
                ConsoleError::InvalidConfig(format!("{}: {message}", path.display()).into())
            }
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self, ConsoleError> {
        let raw: ConsoleToml = toml::from_str(text)
            .map_err(|err| ConsoleError::InvalidConfig(format!("{err}").into()))?;
        raw.into_config()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConsoleToml {
    remote: Option<RemoteSection>,
    server: Option<ServerSection>,
    ui: Option<UiSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RemoteSection {
    host: Option<String>,
    port: Option<u16>,
    sitemap: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    enabled: Option<bool>,
    host: Option<String>,
    port: Option<u16>,
    max_sessions: Option<usize>,
    shutdown_grace_ms: Option<u64>,
    host_key: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UiSection {
    settle_ms: Option<u64>,
}

impl ConsoleToml {
    fn into_config(self) -> Result<ConsoleConfig, ConsoleError> {
        let mut config = ConsoleConfig::default();

        let remote = self.remote.unwrap_or_default();
        if let Some(host) = remote.host {
            config.remote.host = non_empty("remote.host", host)?;
        }
        if let Some(port) = remote.port {
            config.remote.port = non_zero_port("remote.port", port)?;
        }
        if let Some(sitemap) = remote.sitemap {
            config.remote.sitemap = non_empty("remote.sitemap", sitemap)?;
        }
        if let Some(timeout_ms) = remote.timeout_ms {
            if timeout_ms == 0 {
                return Err(ConsoleError::InvalidConfig(
                    "remote.timeout_ms must be greater than zero".into(),
                ));
            }
            config.remote.timeout = Duration::from_millis(timeout_ms);
        }

        let server = self.server.unwrap_or_default();
        if let Some(enabled) = server.enabled {
            config.server.enabled = enabled;
        }
        if let Some(host) = server.host {
            config.server.host = non_empty("server.host", host)?;
        }
        if let Some(port) = server.port {
            config.server.port = port;
        }
        if let Some(max_sessions) = server.max_sessions {
            if max_sessions == 0 {
                return Err(ConsoleError::InvalidConfig(
                    "server.max_sessions must be at least 1".into(),
                ));
            }
            config.server.max_sessions = max_sessions;
        }
        if let Some(grace_ms) = server.shutdown_grace_ms {
            config.server.shutdown_grace = Duration::from_millis(grace_ms);
        }
        if let Some(host_key) = server.host_key {
            if host_key.as_os_str().is_empty() {
                return Err(ConsoleError::InvalidConfig(
                    "server.host_key must not be empty".into(),
                ));
            }
            config.server.host_key = host_key;
        }

        let ui = self.ui.unwrap_or_default();
        if let Some(settle_ms) = ui.settle_ms {
            config.ui.settle = Duration::from_millis(settle_ms);
        }

        Ok(config)
    }
}

fn non_empty(key: &str, value: String) -> Result<SmolStr, ConsoleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConsoleError::InvalidConfig(
            format!("{key} must not be empty").into(),
        ));
    }
    Ok(SmolStr::new(trimmed))
}

fn non_zero_port(key: &str, port: u16) -> Result<u16, ConsoleError> {
    if port == 0 {
        return Err(ConsoleError::InvalidConfig(
            format!("{key} must not be 0").into(),
        ));
    }
    Ok(port)
}

//! `habterm` command line entry point.
//!
//! Without `--server` the console runs on the current terminal. With it,
//! every SSH shell channel gets its own console session.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use habterm::config::ConsoleConfig;
use habterm::server::{watch_signals, SessionServer};
use habterm::ui::run_console;

const LOG_ENV: &str = "HABTERM_LOG";

/// Browse and operate an openHAB sitemap from the terminal.
#[derive(Parser, Debug)]
#[command(name = "habterm", version)]
struct Cli {
    /// Host of the openHAB server
    #[arg(long)]
    ip: Option<String>,

    /// REST port of the openHAB server
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    remote_port: Option<u16>,

    /// Sitemap to use
    #[arg(long)]
    sitemap: Option<String>,

    /// Serve console sessions over the network instead of running locally
    #[arg(long)]
    server: bool,

    /// Address to host the session server on
    #[arg(long)]
    host: Option<String>,

    /// Port to run the session server on
    #[arg(long)]
    port: Option<u16>,

    /// Ed25519 host key for the session server, created when missing
    #[arg(long)]
    host_key: Option<PathBuf>,

    /// Wait after each command before reading the state back, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// REST request timeout in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,

    /// TOML configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append log records to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn console_config(&self) -> anyhow::Result<ConsoleConfig> {
        let mut config = match &self.config {
            Some(path) => ConsoleConfig::load(path)?,
            None => ConsoleConfig::default(),
        };
        if let Some(ip) = &self.ip {
            config.remote.host = non_empty("--ip", ip)?.into();
        }
        if let Some(port) = self.remote_port {
            config.remote.port = port;
        }
        if let Some(sitemap) = &self.sitemap {
            config.remote.sitemap = non_empty("--sitemap", sitemap)?.into();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.remote.timeout = Duration::from_millis(timeout_ms);
        }
        if self.server {
            config.server.enabled = true;
        }
        if let Some(host) = &self.host {
            config.server.host = non_empty("--host", host)?.into();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host_key) = &self.host_key {
            anyhow::ensure!(
                !host_key.as_os_str().is_empty(),
                "--host-key must not be empty"
            );
            config.server.host_key.clone_from(host_key);
        }
        if let Some(settle_ms) = self.settle_ms {
            config.ui.settle = Duration::from_millis(settle_ms);
        }
        Ok(config)
    }
}

fn non_empty<'a>(flag: &str, value: &'a str) -> anyhow::Result<&'a str> {
    let value = value.trim();
    anyhow::ensure!(!value.is_empty(), "{flag} must not be empty");
    Ok(value)
}

/// Logging goes to stderr in server mode. The local console owns the
/// screen, so there it stays off unless a log file is given.
fn init_tracing(server_mode: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default = if server_mode || log_file.is_some() {
        "info"
    } else {
        "off"
    };
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.console_config()?;
    init_tracing(config.server.enabled, cli.log_file.as_deref())?;

    if config.server.enabled {
        info!(
            listen = %config.server.listen_addr(),
            sitemap = %config.remote.sitemap_url(),
            "starting session server"
        );
        let server = SessionServer::new(config);
        watch_signals(server.shutdown_flag())?;
        server.run()?;
        info!("session server stopped");
    } else {
        run_console(&config)?;
    }
    Ok(())
}

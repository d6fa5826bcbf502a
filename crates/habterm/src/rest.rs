//! Sitemap transport over the openHAB REST API.

use std::sync::Arc;

use tracing::debug;

use crate::config::RemoteConfig;
use crate::entity::Command;
use crate::error::ConsoleError;
use crate::sitemap::{Sitemap, Widget};

/// What the console needs from the remote installation.
///
/// Both calls block until the remote side answered or the transport gave up.
pub trait SitemapSource {
    /// Reads the current widget tree of the configured sitemap.
    fn fetch(&self) -> Result<Vec<Widget>, ConsoleError>;

    /// Sends a new state to a single item.
    fn send_command(&self, command: &Command) -> Result<(), ConsoleError>;
}

impl<S: SitemapSource + ?Sized> SitemapSource for Arc<S> {
    fn fetch(&self) -> Result<Vec<Widget>, ConsoleError> {
        (**self).fetch()
    }

    fn send_command(&self, command: &Command) -> Result<(), ConsoleError> {
        (**self).send_command(command)
    }
}

/// Blocking REST client for one sitemap.
#[derive(Clone)]
pub struct RestClient {
    agent: ureq::Agent,
    sitemap: String,
    sitemap_url: String,
}

impl RestClient {
    /// Creates a client for the sitemap described by `config`.
    #[must_use]
    pub fn new(config: &RemoteConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self {
            agent,
            sitemap: config.sitemap.to_string(),
            sitemap_url: config.sitemap_url(),
        }
    }

    /// URL the sitemap is read from.
    #[must_use]
    pub fn sitemap_url(&self) -> &str {
        &self.sitemap_url
    }

    /// Reads and decodes the whole sitemap document.
    pub fn fetch_sitemap(&self) -> Result<Sitemap, ConsoleError> {
        let response = self
            .agent
            .get(&self.sitemap_url)
            .call()
            .map_err(|err| transport_error(&self.sitemap_url, &err))?;
        let body = response.into_string().map_err(|err| {
            ConsoleError::Transport(format!("{}: failed to read body: {err}", self.sitemap_url).into())
        })?;
        if body.trim().is_empty() {
            return Err(ConsoleError::InvalidSitemap(
                format!("no sitemap found with the name {}", self.sitemap).into(),
            ));
        }
        serde_json::from_str(&body).map_err(|err| {
            ConsoleError::InvalidSitemap(format!("{}: {err}", self.sitemap_url).into())
        })
    }
}

impl SitemapSource for RestClient {
    fn fetch(&self) -> Result<Vec<Widget>, ConsoleError> {
        Ok(self.fetch_sitemap()?.homepage.widgets)
    }

    fn send_command(&self, command: &Command) -> Result<(), ConsoleError> {
        if command.target.is_empty() {
            return Err(ConsoleError::Transport(
                "item has no command link".into(),
            ));
        }
        debug!(target = %command.target, value = %command.value, "sending command");
        self.agent
            .post(&command.target)
            .set("Content-Type", "text/plain")
            .send_string(&command.value)
            .map_err(|err| transport_error(&command.target, &err))?;
        Ok(())
    }
}

fn transport_error(url: &str, err: &ureq::Error) -> ConsoleError {
    match err {
        ureq::Error::Status(code, _) => {
            ConsoleError::Transport(format!("{url}: server answered {code}").into())
        }
        ureq::Error::Transport(transport) => {
            ConsoleError::Transport(format!("{url}: {transport}").into())
        }
    }
}

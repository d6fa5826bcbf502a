//! Network sessions: every SSH shell channel gets its own console.

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossterm::{
    cursor::Show,
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::{Terminal, TerminalOptions, Viewport};
use russh::keys::key::{KeyPair, PublicKey};
use russh::server::{Auth, Handle, Handler, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::navigator::{Flow, Navigator};
use crate::rest::{RestClient, SitemapSource};
use crate::ui::{draw, map_key};

pub mod keys;
mod session;
mod ssh;

use keys::KeyDecoder;
use session::{run_session, SessionInput};
use ssh::ConsoleHandler;

const ACCEPT_POLL: Duration = Duration::from_millis(25);
const BUSY_MESSAGE: &[u8] = b"server busy, try again later\r\n";
const AUTH_REJECTION_TIME: Duration = Duration::from_secs(1);
const RUNTIME_DRAIN: Duration = Duration::from_millis(250);

/// Accepts console sessions until the shutdown flag is raised.
pub struct SessionServer {
    config: ConsoleConfig,
    shutdown: Arc<AtomicBool>,
}

impl SessionServer {
    #[must_use]
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raising this flag stops the accept loop and asks live sessions to end.
    #[must_use]
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn bind(&self) -> Result<std::net::TcpListener, ConsoleError> {
        let addr = self.config.server.listen_addr();
        std::net::TcpListener::bind(&addr).map_err(|err| {
            ConsoleError::Transport(format!("failed to listen on {addr}: {err}").into())
        })
    }

    /// Binds the configured address and serves sessions against the
    /// configured sitemap.
    pub fn run(&self) -> Result<(), ConsoleError> {
        let listener = self.bind()?;
        let remote = self.config.remote.clone();
        self.serve(listener, move || RestClient::new(&remote))
    }

    /// Serves sessions on `listener`; `open_source` is called once per
    /// accepted connection that gets a console.
    pub fn serve<S, F>(
        &self,
        listener: std::net::TcpListener,
        open_source: F,
    ) -> Result<(), ConsoleError>
    where
        S: SitemapSource + Send + 'static,
        F: Fn() -> S,
    {
        let host_key = load_host_key(&self.config.server.host_key)?;
        let ssh_config = Arc::new(russh::server::Config {
            keys: vec![host_key],
            auth_rejection_time: AUTH_REJECTION_TIME,
            auth_rejection_time_initial: Some(Duration::ZERO),
            inactivity_timeout: None,
            ..Default::default()
        });
        listener.set_nonblocking(true)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("habterm-ssh")
            .build()?;

        let result = runtime.block_on(async {
            let listener = TcpListener::from_std(listener)?;
            info!(addr = %listener.local_addr()?, "session server listening");
            let live = Arc::new(AtomicUsize::new(0));
            self.accept_loop(&listener, &ssh_config, &live, &open_source)
                .await;
            drop(listener);
            info!(live = live.load(Ordering::Acquire), "session server shutting down");
            self.wait_for_sessions(&live).await;
            Ok::<(), ConsoleError>(())
        });
        runtime.shutdown_timeout(RUNTIME_DRAIN);
        result
    }

    async fn accept_loop<S, F>(
        &self,
        listener: &TcpListener,
        ssh_config: &Arc<russh::server::Config>,
        live: &Arc<AtomicUsize>,
        open_source: &F,
    ) where
        S: SitemapSource + Send + 'static,
        F: Fn() -> S,
    {
        let limit = self.config.server.max_sessions;
        let mut next_id = 0_u64;
        while !self.shutdown.load(Ordering::Acquire) {
            let (stream, peer) = match tokio::time::timeout(ACCEPT_POLL, listener.accept()).await
            {
                Err(_) => continue,
                Ok(Ok(accepted)) => accepted,
                Ok(Err(err)) => {
                    warn!(error = %err, "accept failed");
                    continue;
                }
            };
            next_id += 1;
            let shutdown = Arc::clone(&self.shutdown);
            if live.load(Ordering::Acquire) >= limit {
                warn!(%peer, limit, "session refused, server busy");
                let handler = ConsoleHandler::<S>::busy(next_id, peer, shutdown);
                tokio::spawn(serve_connection(
                    Arc::clone(ssh_config),
                    stream,
                    handler,
                    None,
                ));
                continue;
            }
            let guard = LiveGuard::enter(live);
            let handler = ConsoleHandler::console(
                next_id,
                peer,
                open_source(),
                self.config.ui.settle,
                shutdown,
            );
            tokio::spawn(serve_connection(
                Arc::clone(ssh_config),
                stream,
                handler,
                Some(guard),
            ));
        }
    }

    async fn wait_for_sessions(&self, live: &AtomicUsize) {
        let deadline = Instant::now() + self.config.server.shutdown_grace;
        while live.load(Ordering::Acquire) > 0 && Instant::now() < deadline {
            tokio::time::sleep(ACCEPT_POLL).await;
        }
        let remaining = live.load(Ordering::Acquire);
        if remaining > 0 {
            warn!(remaining, "connections still open after shutdown grace period");
        }
    }
}

/// Counts a connection as live until dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

async fn serve_connection<S>(
    config: Arc<russh::server::Config>,
    stream: tokio::net::TcpStream,
    handler: ConsoleHandler<S>,
    guard: Option<LiveGuard>,
) where
    S: SitemapSource + Send + 'static,
{
    let _guard = guard;
    let peer = stream.peer_addr().ok();
    let started = Instant::now();
    let result = match russh::server::run_stream(config, stream, handler).await {
        Ok(running) => running.await,
        Err(err) => Err(err),
    };
    let duration_ms = started.elapsed().as_millis();
    match result {
        Ok(()) => debug!(?peer, duration_ms, "connection closed"),
        Err(err) => info!(?peer, duration_ms, error = %err, "connection ended with error"),
    }
}

/// Loads the ed25519 host key at `path`, generating and saving one when
/// the file does not exist yet.
pub fn load_host_key(path: &Path) -> Result<KeyPair, ConsoleError> {
    if path.exists() {
        return russh::keys::load_secret_key(path, None).map_err(|err| {
            ConsoleError::InvalidConfig(
                format!("failed to load host key {}: {err}", path.display()).into(),
            )
        });
    }

    let key = KeyPair::generate_ed25519()
        .ok_or_else(|| ConsoleError::InvalidConfig("failed to generate host key".into()))?;
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = open_private(path)?;
    russh::keys::encode_pkcs8_pem(&key, file).map_err(|err| {
        ConsoleError::InvalidConfig(
            format!("failed to write host key {}: {err}", path.display()).into(),
        )
    })?;
    info!(path = %path.display(), "generated ssh host key");
    Ok(key)
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// What a termination signal asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Stop accepting and let sessions finish.
    Stop,
    /// A shutdown was already underway; leave now.
    Exit,
}

/// Raises `flag`; a second call reports that the process should exit.
pub fn on_signal(flag: &AtomicBool) -> SignalAction {
    if flag.swap(true, Ordering::AcqRel) {
        SignalAction::Exit
    } else {
        SignalAction::Stop
    }
}

/// Raises `flag` on SIGINT or SIGTERM and exits on the second one.
#[cfg(unix)]
pub fn watch_signals(flag: Arc<AtomicBool>) -> Result<(), ConsoleError> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("habterm-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                match on_signal(&flag) {
                    SignalAction::Stop => {
                        info!(signal, "shutdown requested, signal again to exit at once");
                    }
                    SignalAction::Exit => {
                        warn!(signal, "second signal, exiting without waiting for sessions");
                        std::process::exit(128 + signal);
                    }
                }
            }
        })?;
    Ok(())
}

#[cfg(not(unix))]
pub fn watch_signals(_flag: Arc<AtomicBool>) -> Result<(), ConsoleError> {
    warn!("signal handling is not available on this platform");
    Ok(())
}

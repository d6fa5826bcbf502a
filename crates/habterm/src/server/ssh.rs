use super::*;

const DEFAULT_SIZE: (u16, u16) = (80, 24);

/// Per-connection SSH handler. The first shell channel gets a console;
/// a connection accepted over the session limit only gets the busy notice.
pub(super) struct ConsoleHandler<S> {
    id: u64,
    peer: SocketAddr,
    source: Option<S>,
    busy: bool,
    settle: Duration,
    shutdown: Arc<AtomicBool>,
    size: (u16, u16),
    input: Option<Sender<SessionInput>>,
}

impl<S> ConsoleHandler<S>
where
    S: SitemapSource + Send + 'static,
{
    pub(super) fn console(
        id: u64,
        peer: SocketAddr,
        source: S,
        settle: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            peer,
            source: Some(source),
            busy: false,
            settle,
            shutdown,
            size: DEFAULT_SIZE,
            input: None,
        }
    }

    pub(super) fn busy(id: u64, peer: SocketAddr, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            id,
            peer,
            source: None,
            busy: true,
            settle: Duration::ZERO,
            shutdown,
            size: DEFAULT_SIZE,
            input: None,
        }
    }

    fn forward(&mut self, input: SessionInput) {
        let closed = self
            .input
            .as_ref()
            .is_some_and(|sender| sender.send(input).is_err());
        if closed {
            self.input = None;
        }
    }

    fn start_console(&mut self, channel: ChannelId, session: &mut Session) {
        let Some(source) = self.source.take() else {
            debug!(session = self.id, "extra shell request ignored");
            session.close(channel);
            return;
        };
        let (sender, receiver) = mpsc::channel();
        let handle = session.handle();
        let runtime = tokio::runtime::Handle::current();
        let output = ChannelWriter::new(handle.clone(), channel, runtime.clone());
        let (id, peer, settle, size) = (self.id, self.peer, self.settle, self.size);
        let shutdown = Arc::clone(&self.shutdown);

        let spawned = thread::Builder::new()
            .name(format!("habterm-session-{id}"))
            .spawn(move || {
                let started = Instant::now();
                info!(session = id, %peer, width = size.0, height = size.1, "session opened");
                match run_session(output, &receiver, source, settle, size, &shutdown) {
                    Ok(end) => info!(
                        session = id,
                        %peer,
                        ?end,
                        duration_ms = started.elapsed().as_millis(),
                        "session closed"
                    ),
                    Err(err) => warn!(
                        session = id,
                        %peer,
                        error = %err,
                        duration_ms = started.elapsed().as_millis(),
                        "session failed"
                    ),
                }
                let _ = runtime.block_on(handle.close(channel));
            });
        match spawned {
            Ok(_) => self.input = Some(sender),
            Err(err) => {
                warn!(session = id, %peer, error = %err, "failed to start session thread");
                session.close(channel);
            }
        }
    }
}

#[async_trait]
impl<S> Handler for ConsoleHandler<S>
where
    S: SitemapSource + Send + 'static,
{
    type Error = russh::Error;

    async fn auth_none(&mut self, _user: &str) -> Result<Auth, Self::Error> {
        Ok(Auth::Accept)
    }

    async fn auth_publickey(
        &mut self,
        _user: &str,
        _public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        debug!(session = self.id, term, col_width, row_height, "pty requested");
        self.size = (clamp_dimension(col_width), clamp_dimension(row_height));
        session.channel_success(channel);
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        _channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.size = (clamp_dimension(col_width), clamp_dimension(row_height));
        self.forward(SessionInput::Resize {
            width: self.size.0,
            height: self.size.1,
        });
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        session.channel_success(channel);
        if self.busy {
            session.data(channel, CryptoVec::from_slice(BUSY_MESSAGE));
            session.close(channel);
            return Ok(());
        }
        self.start_console(channel, session);
        Ok(())
    }

    async fn data(
        &mut self,
        _channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.forward(SessionInput::Bytes(data.to_vec()));
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.input = None;
        Ok(())
    }

    async fn channel_close(
        &mut self,
        _channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.input = None;
        Ok(())
    }
}

/// Zero means the client did not report a size.
fn clamp_dimension(value: u32) -> u16 {
    match u16::try_from(value) {
        Ok(0) => 1,
        Ok(value) => value,
        Err(_) => u16::MAX,
    }
}

/// Buffers terminal output and ships it as one channel packet per flush.
#[derive(Clone)]
pub(super) struct ChannelWriter {
    handle: Handle,
    channel: ChannelId,
    runtime: tokio::runtime::Handle,
    pending: Vec<u8>,
}

impl ChannelWriter {
    fn new(handle: Handle, channel: ChannelId, runtime: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            channel,
            runtime,
            pending: Vec::new(),
        }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let data = CryptoVec::from_slice(&self.pending);
        self.pending.clear();
        self.runtime
            .block_on(self.handle.data(self.channel, data))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "ssh channel closed"))
    }
}

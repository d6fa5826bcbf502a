use super::*;

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Input forwarded from the connection to its console thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SessionInput {
    Bytes(Vec<u8>),
    Resize { width: u16, height: u16 },
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SessionEnd {
    /// The user quit.
    Quit,
    /// The client closed the channel.
    Disconnected,
    /// The server is shutting down.
    Shutdown,
}

/// Runs one console until the user quits, the client goes away or the
/// server shuts down.
///
/// `output` is cloned for every terminal the session builds; a client
/// resize replaces the terminal with one of the new size.
pub(super) fn run_session<S, W>(
    mut output: W,
    input: &Receiver<SessionInput>,
    source: S,
    settle: Duration,
    size: (u16, u16),
    shutdown: &AtomicBool,
) -> Result<SessionEnd, ConsoleError>
where
    S: SitemapSource,
    W: Write + Clone,
{
    let mut navigator = match Navigator::open(source, settle) {
        Ok(navigator) => navigator,
        Err(err) => {
            let _ = write!(output, "Error: {err}\r\n");
            let _ = output.flush();
            return Err(err);
        }
    };

    let mut terminal = session_terminal(output.clone(), size.0, size.1)?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal.clear()?;

    let result = drive(&mut terminal, &output, input, &mut navigator, shutdown);

    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen, Show);
    if let Err(err) = &result {
        let _ = write!(output, "Error: {err}\r\n");
        let _ = output.flush();
    }
    result
}

fn drive<S, W>(
    terminal: &mut Terminal<CrosstermBackend<W>>,
    output: &W,
    input: &Receiver<SessionInput>,
    navigator: &mut Navigator<S>,
    shutdown: &AtomicBool,
) -> Result<SessionEnd, ConsoleError>
where
    S: SitemapSource,
    W: Write + Clone,
{
    let mut decoder = KeyDecoder::new();
    loop {
        draw(terminal, &navigator.view())?;
        let keys = loop {
            if shutdown.load(Ordering::Acquire) {
                return Ok(SessionEnd::Shutdown);
            }
            match input.recv_timeout(INPUT_POLL) {
                Ok(SessionInput::Bytes(bytes)) => break decoder.feed(&bytes),
                Ok(SessionInput::Resize { width, height }) => {
                    debug!(width, height, "session window resized");
                    *terminal = session_terminal(output.clone(), width, height)?;
                    terminal.clear()?;
                    break Vec::new();
                }
                Err(RecvTimeoutError::Timeout) => {
                    let keys = decoder.flush();
                    if !keys.is_empty() {
                        break keys;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(SessionEnd::Disconnected),
            }
        };
        for key in keys {
            let Some(event) = map_key(key) else {
                continue;
            };
            if navigator.handle(event)? == Flow::Quit {
                return Ok(SessionEnd::Quit);
            }
        }
    }
}

/// Terminal with a fixed, client-reported size.
fn session_terminal<W: Write>(
    output: W,
    width: u16,
    height: u16,
) -> io::Result<Terminal<CrosstermBackend<W>>> {
    Terminal::with_options(
        CrosstermBackend::new(output),
        TerminalOptions {
            viewport: Viewport::Fixed(Rect::new(0, 0, width.max(1), height.max(1))),
        },
    )
}

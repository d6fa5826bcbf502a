//! Terminal UI for browsing and operating a sitemap.

#![allow(missing_docs)]

use std::io;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Terminal,
};
use tracing::info;

use crate::config::ConsoleConfig;
use crate::navigator::{ConsoleView, Flow, NavEvent, Navigator};
use crate::rest::RestClient;

mod input;
mod render;

pub use input::map_key;
pub use render::render_console;

const COLOR_TEAL: Color = Color::Rgb(0, 168, 150);
const COLOR_RED: Color = Color::Rgb(231, 76, 60);
const COLOR_INFO: Color = Color::Rgb(142, 142, 147);
const COLOR_PROMPT_BG: Color = Color::Rgb(24, 24, 24);

const FOOTER: &str = "Press Ctrl+c or Esc to quit.";
const SEARCH_PLACEHOLDER: &str = "Search...";

struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Runs the console on the local terminal until the user quits.
///
/// The sitemap is read once before the terminal switches to raw mode so a
/// failing endpoint is reported on a normal screen.
pub fn run_console(config: &ConsoleConfig) -> anyhow::Result<()> {
    let client = RestClient::new(&config.remote);
    info!(url = %client.sitemap_url(), "opening sitemap");
    let mut navigator = Navigator::open(client, config.ui.settle)?;

    let mut guard = TerminalGuard::enter()?;
    loop {
        draw(&mut guard.terminal, &navigator.view())?;
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(nav_event) = map_key(key) else {
            continue;
        };
        if navigator.handle(nav_event)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

/// Draws one frame of the console.
pub fn draw<B: Backend>(terminal: &mut Terminal<B>, view: &ConsoleView<'_>) -> io::Result<()> {
    terminal.draw(|frame| render_console(frame.size(), frame, view))?;
    Ok(())
}

fn marker_style() -> Style {
    Style::default().fg(COLOR_TEAL).add_modifier(Modifier::BOLD)
}

fn info_style() -> Style {
    Style::default().fg(COLOR_INFO)
}

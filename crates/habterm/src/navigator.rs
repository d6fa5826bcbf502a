//! Cursor navigation, search and dispatch over the flattened sitemap.
//!
//! A [`Navigator`] belongs to exactly one console session. Every input event
//! is processed to completion: the cursor, the query or the selected entity
//! changes, then the sitemap is fetched again, flattened, filtered by the
//! query and the cursor is clamped back onto an interactive row.

#![allow(missing_docs)]

use std::thread;
use std::time::Duration;

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::entity::{Action, Row};
use crate::error::ConsoleError;
use crate::flatten::flatten;
use crate::rest::SitemapSource;

/// Longest accepted search query, in characters.
pub const QUERY_LIMIT: usize = 156;

/// Discrete input accepted by [`Navigator::handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    MoveUp,
    MoveDown,
    StepLeft,
    StepRight,
    Activate,
    JumpToStart,
    JumpToEnd,
    QueryInput(char),
    QueryBackspace,
    QueryClear,
    Quit,
}

/// Whether the session goes on after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleView<'a> {
    pub rows: &'a [Row],
    pub cursor: Option<usize>,
    pub query: &'a str,
    pub notice: Option<&'a str>,
}

pub struct Navigator<S> {
    source: S,
    settle: Duration,
    rows: Vec<Row>,
    cursor: Option<usize>,
    query: String,
    notice: Option<SmolStr>,
}

impl<S: SitemapSource> Navigator<S> {
    /// Fetches the sitemap once and selects the first interactive row.
    pub fn open(source: S, settle: Duration) -> Result<Self, ConsoleError> {
        let rows = flatten(&source.fetch()?, 0, "");
        let cursor = first_interactive(&rows);
        Ok(Self {
            source,
            settle,
            rows,
            cursor,
            query: String::new(),
            notice: None,
        })
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Message about the last action that could not be delivered.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Row> {
        self.cursor.and_then(|index| self.rows.get(index))
    }

    #[must_use]
    pub fn view(&self) -> ConsoleView<'_> {
        ConsoleView {
            rows: &self.rows,
            cursor: self.cursor,
            query: &self.query,
            notice: self.notice(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Applies one event and re-reads the sitemap.
    ///
    /// Failed commands only leave a notice behind. A failed fetch is returned
    /// as an error; the session cannot continue without a sitemap.
    pub fn handle(&mut self, event: NavEvent) -> Result<Flow, ConsoleError> {
        self.notice = None;
        match event {
            NavEvent::Quit => return Ok(Flow::Quit),
            NavEvent::MoveUp => self.move_cursor(Direction::Up),
            NavEvent::MoveDown => self.move_cursor(Direction::Down),
            NavEvent::StepLeft => self.dispatch(Action::StepLeft),
            NavEvent::StepRight => self.dispatch(Action::StepRight),
            NavEvent::Activate => self.dispatch(Action::Activate),
            NavEvent::JumpToStart => self.jump_to_start(),
            NavEvent::JumpToEnd => self.jump_to_end(),
            NavEvent::QueryInput(ch) => self.push_query_char(ch),
            NavEvent::QueryBackspace => self.pop_query_char(),
            NavEvent::QueryClear => self.clear_query(),
        }
        self.refresh()?;
        Ok(Flow::Continue)
    }

    /// Moves to the next interactive row in `direction`.
    ///
    /// Groups in between are skipped. The scan stops at the first and last
    /// row; if the row it stops on is not interactive the cursor stays put.
    pub fn move_cursor(&mut self, direction: Direction) {
        if let Some(current) = self.cursor {
            self.cursor = Some(next_interactive(&self.rows, current, direction));
        }
    }

    pub fn jump_to_start(&mut self) {
        self.cursor = first_interactive(&self.rows);
    }

    pub fn jump_to_end(&mut self) {
        self.cursor = self.rows.iter().rposition(Row::interactive);
    }

    pub fn set_query(&mut self, text: &str) {
        self.query = text.chars().take(QUERY_LIMIT).collect();
    }

    pub fn push_query_char(&mut self, ch: char) {
        if ch.is_control() || self.query.chars().count() >= QUERY_LIMIT {
            return;
        }
        self.query.push(ch);
    }

    pub fn pop_query_char(&mut self) {
        self.query.pop();
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
    }

    /// Runs `action` on the selected entity and forwards the resulting command.
    pub fn dispatch(&mut self, action: Action) {
        let Some(row) = self.cursor.and_then(|index| self.rows.get_mut(index)) else {
            return;
        };
        let Some(command) = row.entity.apply(action) else {
            return;
        };
        match self.source.send_command(&command) {
            Ok(()) => {
                debug!(label = %row.label(), value = %command.value, "command sent");
                if !self.settle.is_zero() {
                    thread::sleep(self.settle);
                }
            }
            Err(err) => {
                warn!(label = %row.label(), error = %err, "command failed");
                self.notice = Some(SmolStr::new(format!("{}: {err}", row.label())));
            }
        }
    }

    /// Re-reads the sitemap, applies the query and clamps the cursor.
    pub fn refresh(&mut self) -> Result<(), ConsoleError> {
        let widgets = self.source.fetch()?;
        let terms = query_terms(&self.query);
        self.rows = flatten(&widgets, 0, "")
            .into_iter()
            .filter(|row| row.matches(&terms))
            .collect();
        self.clamp_cursor();
        Ok(())
    }

    fn clamp_cursor(&mut self) {
        let Some(last) = self.rows.len().checked_sub(1) else {
            self.cursor = None;
            return;
        };
        let Some(cursor) = self.cursor else {
            self.cursor = first_interactive(&self.rows);
            return;
        };
        let cursor = cursor.min(last);
        if self.rows[cursor].interactive() {
            self.cursor = Some(cursor);
            return;
        }
        self.cursor = self.rows[..cursor]
            .iter()
            .rposition(Row::interactive)
            .or_else(|| {
                self.rows[cursor..]
                    .iter()
                    .position(Row::interactive)
                    .map(|offset| cursor + offset)
            });
    }
}

/// Lowercase, whitespace-separated search terms.
#[must_use]
pub fn query_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

fn first_interactive(rows: &[Row]) -> Option<usize> {
    rows.iter().position(Row::interactive)
}

fn next_interactive(rows: &[Row], current: usize, direction: Direction) -> usize {
    let len = rows.len();
    let mut index = match direction {
        Direction::Up => match current.checked_sub(1) {
            Some(index) => index,
            None => return current,
        },
        Direction::Down => {
            if current + 1 >= len {
                return current;
            }
            current + 1
        }
    };
    while index > 0 && index + 1 < len && !rows[index].interactive() {
        index = match direction {
            Direction::Up => index - 1,
            Direction::Down => index + 1,
        };
    }
    if rows[index].interactive() {
        index
    } else {
        current
    }
}

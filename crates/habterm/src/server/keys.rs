//! Key decoding for the raw byte stream of a remote terminal.
//!
//! A pty client sends what its terminal emits: printable text, control
//! bytes and escape sequences. They are turned into the same key events the
//! local console receives from crossterm.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const ESC: u8 = 0x1b;
const MAX_PENDING: usize = 16;

/// Incremental decoder; sequences split across reads are completed by later
/// calls to [`KeyDecoder::feed`].
#[derive(Debug, Default)]
pub struct KeyDecoder {
    pending: Vec<u8>,
    after_cr: bool,
}

impl KeyDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyEvent> {
        self.pending.extend_from_slice(bytes);
        let mut keys = Vec::new();
        let mut start = 0;
        while start < self.pending.len() {
            let rest = &self.pending[start..];
            if self.after_cr {
                self.after_cr = false;
                if matches!(rest[0], b'\n' | 0) {
                    start += 1;
                    continue;
                }
            }
            match decode_key(rest) {
                Step::Key(key, used) => {
                    self.after_cr = rest[0] == b'\r';
                    keys.push(key);
                    start += used;
                }
                Step::Skip(used) => start += used,
                Step::Incomplete if rest.len() >= MAX_PENDING => start += 1,
                Step::Incomplete => break,
            }
        }
        self.pending.drain(..start);
        keys
    }

    /// Called when no further input arrived for a while.
    ///
    /// A lone ESC still waiting for a follow-up byte is the Esc key; any
    /// other unfinished sequence is dropped.
    pub fn flush(&mut self) -> Vec<KeyEvent> {
        let keys = if self.pending == [ESC] {
            vec![key(KeyCode::Esc)]
        } else {
            Vec::new()
        };
        self.pending.clear();
        keys
    }
}

enum Step {
    Key(KeyEvent, usize),
    Skip(usize),
    Incomplete,
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(ch: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
}

fn decode_key(bytes: &[u8]) -> Step {
    let Some(&first) = bytes.first() else {
        return Step::Incomplete;
    };
    match first {
        ESC => decode_escape(bytes),
        b'\r' | b'\n' => Step::Key(key(KeyCode::Enter), 1),
        0x7f | 0x08 => Step::Key(key(KeyCode::Backspace), 1),
        b'\t' => Step::Key(key(KeyCode::Tab), 1),
        0x01..=0x1a => Step::Key(ctrl(char::from(b'a' + first - 1)), 1),
        0x20..=0x7e => Step::Key(key(KeyCode::Char(char::from(first))), 1),
        0x80..=0xff => decode_utf8(bytes),
        _ => Step::Skip(1),
    }
}

/// `ESC [` and `ESC O` start a sequence, `ESC <printable>` is an Alt chord.
fn decode_escape(bytes: &[u8]) -> Step {
    match bytes.get(1) {
        None => Step::Incomplete,
        Some(b'[' | b'O') => decode_csi(bytes),
        Some(&next @ 0x20..=0x7e) => Step::Key(
            KeyEvent::new(KeyCode::Char(char::from(next)), KeyModifiers::ALT),
            2,
        ),
        Some(_) => Step::Key(key(KeyCode::Esc), 1),
    }
}

fn decode_csi(bytes: &[u8]) -> Step {
    let Some(end) = bytes[2..]
        .iter()
        .position(|byte| (0x40..=0x7e).contains(byte))
    else {
        return Step::Incomplete;
    };
    let last = 2 + end;
    let params = &bytes[2..last];
    let code = match (bytes[last], params) {
        (b'A', _) => Some(KeyCode::Up),
        (b'B', _) => Some(KeyCode::Down),
        (b'C', _) => Some(KeyCode::Right),
        (b'D', _) => Some(KeyCode::Left),
        (b'H', _) | (b'~', b"1" | b"7") => Some(KeyCode::Home),
        (b'F', _) | (b'~', b"4" | b"8") => Some(KeyCode::End),
        (b'~', b"3") => Some(KeyCode::Delete),
        _ => None,
    };
    match code {
        Some(code) => Step::Key(key(code), last + 1),
        None => Step::Skip(last + 1),
    }
}

fn decode_utf8(bytes: &[u8]) -> Step {
    let width = match bytes[0] {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Step::Skip(1),
    };
    if bytes.len() < width {
        return Step::Incomplete;
    }
    match std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|text| text.chars().next())
    {
        Some(ch) => Step::Key(key(KeyCode::Char(ch)), width),
        None => Step::Skip(1),
    }
}

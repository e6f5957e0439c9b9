//! Keyboard input and console output for an interactive terminal.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, Write};
use std::time::Duration;

use crate::control::{Key, KeySource};

/// How long one `next_key` call waits for a keystroke.
pub const KEY_POLL: Duration = Duration::from_millis(250);

/// Keys from the real terminal. Raw mode is held only while polling.
#[derive(Debug, Clone)]
pub struct CrosstermKeys {
    poll: Duration,
}

impl CrosstermKeys {
    pub fn new() -> Self {
        Self { poll: KEY_POLL }
    }
}

impl Default for CrosstermKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for CrosstermKeys {
    fn next_key(&mut self) -> io::Result<Option<Key>> {
        let _raw = RawMode::enable()?;
        if !event::poll(self.poll)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => Ok(map_key(key)),
            _ => Ok(None),
        }
    }
}

pub fn map_key(event: KeyEvent) -> Option<Key> {
    match event.code {
        KeyCode::Char('c') | KeyCode::Char('C')
            if event.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(Key::Interrupt)
        }
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Quit),
        KeyCode::Char(c) => Key::from_char(c),
        _ => None,
    }
}

struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Console output that stays readable while raw mode is on and survives a
/// closed pipe.
///
/// Raw mode turns off the terminal's `\n` to `\r\n` translation, so lines are
/// translated here instead. Writes to a closed reader are dropped.
pub struct ConsoleWriter<W: Write> {
    inner: W,
    crlf: LineEnding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnding {
    /// CRLF only while the terminal is in raw mode.
    Auto,
    Always,
}

impl ConsoleWriter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { inner: io::stdout(), crlf: LineEnding::Auto }
    }
}

impl<W: Write> ConsoleWriter<W> {
    /// Always translate line endings; for captured output.
    pub fn crlf(inner: W) -> Self {
        Self { inner, crlf: LineEnding::Always }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn translate(&self) -> bool {
        match self.crlf {
            LineEnding::Always => true,
            LineEnding::Auto => terminal::is_raw_mode_enabled().unwrap_or(false),
        }
    }
}

impl<W: Write> Write for ConsoleWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = if self.translate() && buf.contains(&b'\n') {
            let mut translated = Vec::with_capacity(buf.len() + 16);
            let mut previous = 0u8;
            for &byte in buf {
                if byte == b'\n' && previous != b'\r' {
                    translated.push(b'\r');
                }
                translated.push(byte);
                previous = byte;
            }
            self.inner.write_all(&translated)
        } else {
            self.inner.write_all(buf)
        };
        match result {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(buf.len()),
            Err(e) => Err(e),
            Ok(()) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.flush() {
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    }
}

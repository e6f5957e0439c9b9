use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use stressapi_common::TUNING_STEP;
use tracing::{info, warn};

use crate::pool::WorkerPool;
use crate::report::{format_duration, ConfigSnapshot, RateSnapshot, StatsSnapshot};
use crate::session::{Session, Verbosity};
use crate::usage::{self, ProcessUsage};

/// Every keyboard command the control loop understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Right,
    Left,
    Plus,
    Minus,
    Greater,
    Less,
    Memory,
    Pause,
    Config,
    Enter,
    Stats,
    Reset,
    Verbose,
    VerboseBody,
    Finish,
    Quit,
    Help,
    /// Ctrl+C read as a key while the terminal is in raw mode.
    Interrupt,
}

impl Key {
    /// Letter and symbol commands, case-insensitive.
    pub fn from_char(c: char) -> Option<Self> {
        let key = match c.to_ascii_lowercase() {
            '+' | '=' => Key::Plus,
            '-' | '_' => Key::Minus,
            '>' | '.' => Key::Greater,
            '<' | ',' => Key::Less,
            'm' => Key::Memory,
            'p' => Key::Pause,
            'c' => Key::Config,
            's' => Key::Stats,
            'r' => Key::Reset,
            'v' => Key::Verbose,
            'b' => Key::VerboseBody,
            'f' => Key::Finish,
            'q' => Key::Quit,
            'h' => Key::Help,
            '\r' | '\n' => Key::Enter,
            '\u{1b}' => Key::Quit,
            _ => return None,
        };
        Some(key)
    }
}

/// A source of keystrokes. `Ok(None)` means no key arrived within the
/// source's poll window.
pub trait KeySource {
    fn next_key(&mut self) -> io::Result<Option<Key>>;
}

/// Replays a fixed sequence of keys, then keeps answering [`Key::Quit`].
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<Option<Key>>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self { keys: keys.into_iter().map(Some).collect() }
    }

    /// Insert a poll window in which no key arrives.
    pub fn idle(mut self) -> Self {
        self.keys.push_back(None);
        self
    }

    pub fn then(mut self, key: Key) -> Self {
        self.keys.push_back(Some(key));
        self
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> io::Result<Option<Key>> {
        Ok(self.keys.pop_front().unwrap_or(Some(Key::Quit)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Paused,
    Finished,
}

/// Something for the operator to look at.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Help,
    Config(ConfigSnapshot),
    Rate(RateSnapshot),
    Stats(StatsSnapshot),
    Usage(Option<ProcessUsage>),
}

pub trait Presenter {
    fn present(&mut self, report: &Report);
}

/// Collects reports instead of printing them.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub reports: Vec<Report>,
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, report: &Report) {
        self.reports.push(report.clone());
    }
}

/// Main-thread state machine: keys in, tuning changes and reports out.
pub struct ControlLoop {
    session: Arc<Session>,
    pool: WorkerPool,
    state: State,
}

impl ControlLoop {
    pub fn new(session: Arc<Session>, pool: WorkerPool) -> Self {
        Self { session, pool, state: State::Running }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Drive the run until it finishes. A quit request raised elsewhere
    /// (signal handler) ends the run with a final stats report, taken after
    /// every worker has been joined.
    pub fn run(&mut self, keys: &mut dyn KeySource, presenter: &mut dyn Presenter) {
        while self.state != State::Finished {
            if self.session.should_quit() {
                info!("Stop signal received, finishing");
                self.finish();
                presenter.present(&Report::Stats(StatsSnapshot::capture(&self.session)));
                break;
            }
            match keys.next_key() {
                Ok(Some(key)) => {
                    if let Some(report) = self.handle_key(key) {
                        presenter.present(&report);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Cannot read from the keyboard: {e}");
                    self.finish();
                    presenter.present(&Report::Stats(StatsSnapshot::capture(&self.session)));
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: Key) -> Option<Report> {
        if self.state == State::Finished {
            return None;
        }
        let config = &self.session.config;
        match key {
            Key::Up => {
                let interval = config.set_interval(config.interval() * TUNING_STEP);
                self.session.stats.rate.reset();
                info!("Increasing the interval between requests to {interval:.6} sec (slower)");
            }
            Key::Down => {
                let interval = config.set_interval(config.interval() / TUNING_STEP);
                self.session.stats.rate.reset();
                info!("Decreasing the interval between requests to {interval:.6} sec (faster)");
            }
            Key::Right => {
                let burst = config.set_burst(i64::from(config.burst()) + 1);
                self.session.stats.rate.reset();
                info!("Increasing the burst to {} (faster)", plural(burst as usize, "request"));
            }
            Key::Left => {
                let burst = config.set_burst(i64::from(config.burst()) - 1);
                self.session.stats.rate.reset();
                info!("Decreasing the burst to {} (slower)", plural(burst as usize, "request"));
            }
            Key::Plus => {
                let timeout = config.set_timeout(config.timeout() * TUNING_STEP);
                info!("Increasing the request timeout to {timeout:.6} sec");
            }
            Key::Minus => {
                let before = config.timeout();
                let timeout = config.set_timeout(before / TUNING_STEP);
                let limit = if timeout == before { " (limit reached!)" } else { "" };
                info!("Decreasing the request timeout to {timeout:.6} sec{limit}");
            }
            Key::Greater => match self.pool.grow() {
                Ok(_) => {}
                Err(e) => warn!("Cannot start one more thread: {e}"),
            },
            Key::Less => {
                self.pool.shrink_oldest();
            }
            Key::Memory => return Some(Report::Usage(usage::sample())),
            Key::Pause => self.toggle_pause(),
            Key::Config => {
                return Some(Report::Config(ConfigSnapshot::capture(&self.session, self.pool.len())))
            }
            Key::Enter => return Some(Report::Rate(RateSnapshot::capture(&self.session))),
            Key::Stats => return Some(Report::Stats(StatsSnapshot::capture(&self.session))),
            Key::Reset => {
                self.session.stats.reset();
                info!("All statistics have been reset");
            }
            Key::Verbose => self.toggle_verbosity(Verbosity::Status),
            Key::VerboseBody => self.toggle_verbosity(Verbosity::StatusAndBody),
            Key::Finish | Key::Interrupt => {
                self.finish();
                return Some(Report::Stats(StatsSnapshot::capture(&self.session)));
            }
            Key::Quit => self.finish(),
            Key::Help => return Some(Report::Help),
        }
        None
    }

    fn toggle_pause(&mut self) {
        self.session.stats.rate.reset();
        if self.state == State::Paused {
            let paused_for = self.session.resume();
            self.state = State::Running;
            info!("Resuming after {}", format_duration(paused_for));
        } else {
            self.session.pause();
            self.state = State::Paused;
            info!("Paused, press P again to resume");
        }
    }

    fn toggle_verbosity(&self, mode: Verbosity) {
        match self.session.toggle_verbosity(mode) {
            Verbosity::Quiet => info!("Request logging disabled"),
            Verbosity::Status => info!("Logging the status of every request"),
            Verbosity::StatusAndBody => info!("Logging the status and body of every request"),
        }
    }

    /// Stop every worker and enter the terminal state.
    fn finish(&mut self) {
        self.session.request_quit();
        if self.session.is_paused() {
            self.session.resume();
        }
        self.pool.stop_all();
        self.state = State::Finished;
        info!("All threads stopped after {}", format_duration(self.session.uptime()));
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stressapi_client::RequestClient;
use stressapi_common::DEFAULT_WINDOW_SIZE;
use tracing::info;

use crate::config::RunConfig;
use crate::counters::{RateAverageCounter, RateCounter};
use crate::latency::LatencyWindow;
use crate::tally::StatusTally;

/// Per-request logging level, toggled from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Verbosity {
    Quiet = 0,
    Status = 1,
    StatusAndBody = 2,
}

impl Verbosity {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Verbosity::Status,
            2 => Verbosity::StatusAndBody,
            _ => Verbosity::Quiet,
        }
    }
}

/// The statistics engine shared by every worker and the control loop.
pub struct Stats {
    pub latency: LatencyWindow,
    pub tally: StatusTally,
    pub requests: RateCounter,
    pub rate: RateAverageCounter,
}

impl Stats {
    pub fn new(window_size: usize) -> Self {
        Self::with_rate(window_size, RateAverageCounter::new())
    }

    pub fn with_rate(window_size: usize, rate: RateAverageCounter) -> Self {
        Self {
            latency: LatencyWindow::new(window_size),
            tally: StatusTally::new(),
            requests: RateCounter::new(),
            rate,
        }
    }

    /// One completed request, successful or not.
    pub fn record(&self, status: u16, elapsed: Duration) {
        self.requests.incr();
        self.rate.mark();
        self.latency.save(elapsed.as_secs_f64());
        self.tally.save(status);
    }

    pub fn reset(&self) {
        self.tally.reset();
        self.latency.reset();
        self.requests.reset();
        self.rate.reset();
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

/// Everything a run shares between the control loop and its workers.
pub struct Session {
    pub config: RunConfig,
    pub stats: Stats,
    pub client: Arc<dyn RequestClient>,
    started: Instant,
    paused: AtomicBool,
    paused_at: Mutex<Option<Instant>>,
    quit: AtomicBool,
    verbosity: AtomicU8,
}

impl Session {
    pub fn new(config: RunConfig, stats: Stats, client: Arc<dyn RequestClient>) -> Self {
        Self {
            config,
            stats,
            client,
            started: Instant::now(),
            paused: AtomicBool::new(false),
            paused_at: Mutex::new(None),
            quit: AtomicBool::new(false),
            verbosity: AtomicU8::new(Verbosity::Quiet as u8),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        *self.paused_at.lock() = Some(Instant::now());
        self.paused.store(true, Ordering::Release);
    }

    /// Clear the pause flag; returns how long the run was paused.
    pub fn resume(&self) -> Duration {
        self.paused.store(false, Ordering::Release);
        self.paused_at.lock().take().map(|at| at.elapsed()).unwrap_or_default()
    }

    pub fn should_quit(&self) -> bool {
        self.quit.load(Ordering::Acquire)
    }

    /// Ask every worker and the control loop to wind down.
    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_u8(self.verbosity.load(Ordering::Relaxed))
    }

    /// Switch to `mode`, or back to quiet if it is already active.
    pub fn toggle_verbosity(&self, mode: Verbosity) -> Verbosity {
        let next = if self.verbosity() == mode { Verbosity::Quiet } else { mode };
        self.verbosity.store(next as u8, Ordering::Relaxed);
        next
    }

    /// Emit the per-request line for the current verbosity.
    pub fn log_response(&self, label: &str, status: u16, elapsed: Duration, body: &str) {
        let ok = if self.config.is_success(status) { "ok" } else { "fail" };
        match self.verbosity() {
            Verbosity::Quiet => {}
            Verbosity::Status => {
                info!("{label} {status} {ok} {:.6}s", elapsed.as_secs_f64());
            }
            Verbosity::StatusAndBody => {
                info!("{label} {status} {ok} {:.6}s {body}", elapsed.as_secs_f64());
            }
        }
    }
}

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Abstraction over the monotonic clock for testability.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now`.
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Total request counter with a resettable baseline.
///
/// `total` only ever grows; `reset` moves the baseline instead of clearing it,
/// so reading [`RateCounter::value`] never mutates anything.
#[derive(Debug, Default)]
pub struct RateCounter {
    total: AtomicU64,
    baseline: AtomicU64,
}

impl RateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self) {
        self.total.fetch_add(1, Ordering::AcqRel);
    }

    /// Requests counted since the last reset.
    pub fn value(&self) -> u64 {
        // Baseline first: it was copied from an earlier total, so it never exceeds a later one.
        let baseline = self.baseline.load(Ordering::Acquire);
        self.total.load(Ordering::Acquire).saturating_sub(baseline)
    }

    /// Requests counted since construction.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.baseline.store(self.total.load(Ordering::Acquire), Ordering::Release);
    }
}

/// Throughput derived from the time between consecutive marks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Average {
    pub per_sec: f64,
    pub secs_per_request: f64,
}

struct AverageState {
    sum: f64,
    count: u64,
    last_mark: Instant,
}

/// Accumulates inter-arrival times across all workers until read.
pub struct RateAverageCounter {
    clock: Arc<dyn Clock>,
    state: Mutex<AverageState>,
}

impl RateAverageCounter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let last_mark = clock.now();
        Self { clock, state: Mutex::new(AverageState { sum: 0.0, count: 0, last_mark }) }
    }

    pub fn mark(&self) {
        let mut state = self.state.lock();
        let now = self.clock.now();
        state.sum += now.saturating_duration_since(state.last_mark).as_secs_f64();
        state.count += 1;
        state.last_mark = now;
    }

    /// Read and clear the accumulated marks; zero when nothing was marked.
    pub fn take_average(&self) -> Average {
        let (sum, count) = {
            let mut state = self.state.lock();
            let taken = (state.sum, state.count);
            state.sum = 0.0;
            state.count = 0;
            state.last_mark = self.clock.now();
            taken
        };
        if count == 0 || sum <= 0.0 {
            return Average::default();
        }
        Average { per_sec: count as f64 / sum, secs_per_request: sum / count as f64 }
    }

    /// Marks accumulated since the last read or reset.
    pub fn pending(&self) -> u64 {
        self.state.lock().count
    }

    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.sum = 0.0;
        state.count = 0;
        state.last_mark = self.clock.now();
    }
}

impl Default for RateAverageCounter {
    fn default() -> Self {
        Self::new()
    }
}

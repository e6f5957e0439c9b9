use parking_lot::Mutex;
use std::collections::VecDeque;

/// Bounded sliding window of request latencies (seconds) with percentile
/// queries over the most recent `capacity` samples.
///
/// Eviction is FIFO across every writer: insert and evict happen under one
/// lock, so the window always holds the last `capacity` saves in global order.
pub struct LatencyWindow {
    capacity: usize,
    inner: Mutex<Samples>,
}

#[derive(Default)]
struct Samples {
    /// Arrival order, oldest first.
    arrivals: VecDeque<f64>,
    /// Same multiset as `arrivals`, ascending.
    sorted: Vec<f64>,
}

/// Point-in-time summary of a window; every field is `None` when empty.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatencyStats {
    pub samples: usize,
    pub capacity: usize,
    pub min: Option<f64>,
    pub avg: Option<f64>,
    pub max: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub p99: Option<f64>,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Samples {
                arrivals: VecDeque::with_capacity(capacity),
                sorted: Vec::with_capacity(capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn save(&self, sample: f64) {
        let mut samples = self.inner.lock();
        if samples.arrivals.len() == self.capacity {
            if let Some(oldest) = samples.arrivals.pop_front() {
                // Remove exactly one occurrence, equal values may repeat.
                let idx = samples.sorted.partition_point(|&v| v < oldest);
                if idx < samples.sorted.len() {
                    samples.sorted.remove(idx);
                }
            }
        }
        samples.arrivals.push_back(sample);
        let idx = samples.sorted.partition_point(|&v| v <= sample);
        samples.sorted.insert(idx, sample);
    }

    pub fn reset(&self) {
        let mut samples = self.inner.lock();
        samples.arrivals.clear();
        samples.sorted.clear();
    }

    pub fn min(&self) -> Option<f64> {
        self.inner.lock().sorted.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.inner.lock().sorted.last().copied()
    }

    pub fn avg(&self) -> Option<f64> {
        mean(&self.inner.lock().arrivals)
    }

    /// Linearly interpolated percentile, `p` in `0..=100`.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        percentile_of(&self.inner.lock().sorted, p)
    }

    /// Window contents in arrival order, oldest first.
    pub fn samples(&self) -> Vec<f64> {
        self.inner.lock().arrivals.iter().copied().collect()
    }

    /// All summary figures computed under a single lock.
    pub fn stats(&self) -> LatencyStats {
        let samples = self.inner.lock();
        LatencyStats {
            samples: samples.arrivals.len(),
            capacity: self.capacity,
            min: samples.sorted.first().copied(),
            avg: mean(&samples.arrivals),
            max: samples.sorted.last().copied(),
            p50: percentile_of(&samples.sorted, 50.0),
            p75: percentile_of(&samples.sorted, 75.0),
            p90: percentile_of(&samples.sorted, 90.0),
            p99: percentile_of(&samples.sorted, 99.0),
        }
    }
}

fn mean(values: &VecDeque<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn percentile_of(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let k = (n - 1) as f64 * p.clamp(0.0, 100.0) / 100.0;
    let f = k.floor() as usize;
    let c = f + 1;
    if c >= n {
        return Some(sorted[f]);
    }
    Some(sorted[f] * (c as f64 - k) + sorted[c] * (k - f as f64))
}

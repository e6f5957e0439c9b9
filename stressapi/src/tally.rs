use parking_lot::Mutex;
use std::collections::BTreeMap;
use stressapi_common::status::SEEDED_CODES;

/// Concurrent histogram of outcome codes, real and synthetic.
pub struct StatusTally {
    counts: Mutex<BTreeMap<u16, u64>>,
}

impl StatusTally {
    pub fn new() -> Self {
        Self { counts: Mutex::new(seeded()) }
    }

    pub fn save(&self, code: u16) {
        *self.counts.lock().entry(code).or_insert(0) += 1;
    }

    /// Drop every code outside the seeded set and zero the seeded ones.
    pub fn reset(&self) {
        *self.counts.lock() = seeded();
    }

    pub fn get(&self, code: u16) -> Option<u64> {
        self.counts.lock().get(&code).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<u16, u64> {
        self.counts.lock().clone()
    }

    pub fn total(&self) -> u64 {
        self.counts.lock().values().sum()
    }
}

impl Default for StatusTally {
    fn default() -> Self {
        Self::new()
    }
}

fn seeded() -> BTreeMap<u16, u64> {
    SEEDED_CODES.iter().map(|&code| (code, 0)).collect()
}

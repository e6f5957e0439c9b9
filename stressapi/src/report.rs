use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use stressapi_common::Method;

use crate::config::SyslogTarget;
use crate::counters::Average;
use crate::latency::LatencyStats;
use crate::session::Session;

/// Result of the Enter key: throughput since the last read plus latency extremes.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub paused: bool,
    pub average: Average,
    pub min: Option<f64>,
    pub avg: Option<f64>,
    pub max: Option<f64>,
    pub total: u64,
}

impl RateSnapshot {
    /// Consumes the average counter unless the run is paused.
    pub fn capture(session: &Session) -> Self {
        let paused = session.is_paused();
        let average = if paused { Average::default() } else { session.stats.rate.take_average() };
        let latency = &session.stats.latency;
        Self {
            paused,
            average,
            min: latency.min(),
            avg: latency.avg(),
            max: latency.max(),
            total: session.stats.requests.value(),
        }
    }
}

/// Request counts bucketed the way the stats chart shows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusGroups {
    pub success: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub connection_errors: u64,
}

impl StatusGroups {
    pub fn from_counts(counts: &BTreeMap<u16, u64>, success_codes: &[u16]) -> Self {
        let mut groups = Self::default();
        for (&code, &count) in counts {
            if success_codes.contains(&code) {
                groups.success += count;
            }
            match code {
                400..=499 => groups.client_errors += count,
                500..=599 => groups.server_errors += count,
                900..=u16::MAX => groups.connection_errors += count,
                _ => {}
            }
        }
        groups
    }

    pub fn total(&self) -> u64 {
        self.success + self.client_errors + self.server_errors + self.connection_errors
    }

    /// Share of `value` in the grouped total, 0 when nothing was grouped.
    pub fn percent(&self, value: u64) -> f64 {
        match self.total() {
            0 => 0.0,
            total => value as f64 * 100.0 / total as f64,
        }
    }

    pub fn rows(&self) -> [(&'static str, u64); 4] {
        [
            ("Success", self.success),
            ("HTTP 4XX errors", self.client_errors),
            ("HTTP 5XX errors", self.server_errors),
            ("Connection errors", self.connection_errors),
        ]
    }
}

/// Result of the S and F keys.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub total: u64,
    pub groups: StatusGroups,
    /// Codes seen at least once, ascending.
    pub codes: Vec<(u16, u64)>,
    pub latency: LatencyStats,
}

impl StatsSnapshot {
    pub fn capture(session: &Session) -> Self {
        let counts = session.stats.tally.snapshot();
        Self {
            total: session.stats.requests.value(),
            groups: StatusGroups::from_counts(&counts, session.config.success_status_codes()),
            codes: counts.into_iter().filter(|&(_, count)| count > 0).collect(),
            latency: session.stats.latency.stats(),
        }
    }
}

/// Result of the C key.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub source: Option<PathBuf>,
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub post_data: Map<String, Value>,
    pub timeout: f64,
    pub success_status_codes: Vec<u16>,
    pub interval: f64,
    pub burst: u32,
    pub threads: usize,
    pub cpu_affinity: Vec<usize>,
    pub syslog: Option<SyslogTarget>,
    pub window_size: usize,
    pub uptime: Duration,
}

impl ConfigSnapshot {
    pub fn capture(session: &Session, threads: usize) -> Self {
        let config = &session.config;
        Self {
            source: config.source().map(PathBuf::from),
            url: config.url().to_string(),
            method: config.method(),
            headers: config.headers().to_vec(),
            post_data: if config.method().sends_body() {
                config.post_data().clone()
            } else {
                Map::new()
            },
            timeout: config.timeout(),
            success_status_codes: config.success_status_codes().to_vec(),
            interval: config.interval(),
            burst: config.burst(),
            threads,
            cpu_affinity: config.cpu_affinity().to_vec(),
            syslog: config.syslog().cloned(),
            window_size: session.stats.latency.capacity(),
            uptime: session.uptime(),
        }
    }
}

/// `1h 02m 03s`, `2m 05s`, `7.250s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, secs / 60 % 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

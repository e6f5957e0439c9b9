use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use stressapi_client::{is_valid_header, Url};
use stressapi_common::{
    ConfigError, Method, Result, BURST_MAX, BURST_MIN, CONTENT_TYPES, DEFAULT_BURST,
    DEFAULT_INTERVAL_SECS, DEFAULT_SUCCESS_STATUS_CODES, DEFAULT_THREADS, DEFAULT_TIMEOUT_SECS,
    INTERVAL_MAX_SECS, INTERVAL_MIN_SECS, MIN_CONFIGURED_TIMEOUT_SECS, SYSLOG_FACILITIES,
    TIMEOUT_MAX_SECS, TIMEOUT_MIN_SECS,
};

use crate::template::UrlTemplate;

/// User-Agent sent when the configuration does not set one.
pub const DEFAULT_USER_AGENT: &str = concat!("stressapi/", env!("CARGO_PKG_VERSION"));

/// The JSON configuration file as written by the operator, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub url: Option<Value>,
    pub method: Option<Value>,
    pub post_data: Option<Value>,
    pub headers: Option<Value>,
    pub timeout: Option<Value>,
    pub success_status_codes: Option<Value>,
    pub start_interval: Option<Value>,
    pub start_burst: Option<Value>,
    pub start_threads: Option<Value>,
    pub cpu_affinity: Option<Value>,
    pub syslog_server_url: Option<Value>,
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyslogTransport {
    Udp,
    Tcp,
    Unix,
}

/// Validated `syslog_server_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogTarget {
    pub transport: SyslogTransport,
    pub address: String,
    pub facility: String,
}

impl SyslogTarget {
    /// Accepts `udp://host[:port]?facility=<name>`, `tcp://...` or
    /// `/path/to/socket?facility=<name>`.
    pub fn parse(raw: &str) -> Result<Self> {
        let (address, query) = raw.split_once('?').unwrap_or((raw, ""));
        let (transport, address) = if let Some(host) = address.strip_prefix("udp://") {
            (SyslogTransport::Udp, host)
        } else if let Some(host) = address.strip_prefix("tcp://") {
            (SyslogTransport::Tcp, host)
        } else if address.starts_with('/') {
            (SyslogTransport::Unix, address)
        } else {
            return Err(ConfigError::InvalidSyslogTarget(raw.to_string()));
        };
        if address.is_empty() || (transport != SyslogTransport::Unix && address.contains('/')) {
            return Err(ConfigError::InvalidSyslogTarget(raw.to_string()));
        }

        let facility = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("facility="))
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !SYSLOG_FACILITIES.contains(&facility.as_str()) {
            return Err(ConfigError::InvalidSyslogFacility(facility));
        }

        Ok(Self { transport, address: address.to_string(), facility })
    }
}

impl std::fmt::Display for SyslogTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.transport {
            SyslogTransport::Udp => write!(f, "udp://{}", self.address)?,
            SyslogTransport::Tcp => write!(f, "tcp://{}", self.address)?,
            SyslogTransport::Unix => f.write_str(&self.address)?,
        }
        write!(f, "?facility={}", self.facility)
    }
}

/// A fully validated configuration, every value within its allowed range.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub url: String,
    pub method: Method,
    pub post_data: Map<String, Value>,
    pub headers: Vec<(String, String)>,
    pub timeout: f64,
    pub success_status_codes: Vec<u16>,
    pub interval: f64,
    pub burst: u32,
    pub threads: usize,
    pub cpu_affinity: Vec<usize>,
    pub syslog: Option<SyslogTarget>,
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Request body: compact JSON of `post_data` for POST/PUT, empty otherwise.
    pub fn body(&self) -> Vec<u8> {
        if !self.method.sends_body() {
            return Vec::new();
        }
        serde_json::to_vec(&self.post_data).unwrap_or_default()
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Unreadable(path.display().to_string(), e.to_string()))?;
        let mut file = Self::from_json(&text)?;
        file.source = Some(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));
        Ok(file)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ConfigError::InvalidJson(e.to_string()))
    }

    /// Example configuration printed by `--template`.
    pub fn template() -> Value {
        json!({
            "url": "http://localhost:8000/api/v1/foo_action",
            "method": Method::ALL.iter().map(Method::as_str).collect::<Vec<_>>().join("|"),
            "post_data": {"id": "my_customer_id", "name": "spécial_çhärs", "token": "mysupertoken"},
            "headers": {
                "User-Agent": DEFAULT_USER_AGENT,
                "Host": "set_your_api_hostname_here",
                "Content-Type": "application/json",
                "X-Forwarded-For": "1.2.3.4",
                "X-Forwarded-Host": "1.2.3.4",
                "X-Real-IP": "1.2.3.4",
            },
            "timeout": DEFAULT_TIMEOUT_SECS,
            "success_status_codes": DEFAULT_SUCCESS_STATUS_CODES,
            "start_interval": DEFAULT_INTERVAL_SECS,
            "start_burst": DEFAULT_BURST,
            "start_threads": DEFAULT_THREADS,
            "cpu_affinity": [-1],
            "syslog_server_url": "udp://127.0.0.1:514?facility=local0",
        })
    }

    /// Validate against a machine with `cpu_count` CPUs.
    pub fn validate(self, cpu_count: usize) -> Result<Settings> {
        let url = match &self.url {
            None | Some(Value::Null) => return Err(ConfigError::MissingField("url")),
            Some(Value::String(s)) if s.is_empty() => return Err(ConfigError::MissingField("url")),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(ConfigError::InvalidType { field: "url", expected: "a string" }),
        };
        validate_url(&url)?;

        let method = match &self.method {
            None | Some(Value::Null) => return Err(ConfigError::MissingField("method")),
            Some(Value::String(s)) => Method::parse(s)?,
            Some(other) => return Err(ConfigError::InvalidMethod(other.to_string())),
        };

        let post_data = match self.post_data {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(ConfigError::InvalidType { field: "post_data", expected: "an object" })
            }
        };

        let headers = validate_headers(self.headers)?;

        let timeout = match self.timeout {
            None | Some(Value::Null) => DEFAULT_TIMEOUT_SECS,
            Some(v) => as_f64("timeout", &v)?,
        };
        let timeout = if timeout < MIN_CONFIGURED_TIMEOUT_SECS { DEFAULT_TIMEOUT_SECS } else { timeout };

        let success_status_codes = match self.success_status_codes {
            None | Some(Value::Null) => DEFAULT_SUCCESS_STATUS_CODES.to_vec(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    as_i64("success_status_codes", v).and_then(|code| {
                        u16::try_from(code).map_err(|_| ConfigError::InvalidType {
                            field: "success_status_codes",
                            expected: "a list of status codes",
                        })
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(ConfigError::InvalidType {
                    field: "success_status_codes",
                    expected: "a list of integers",
                })
            }
        };

        let interval = positive_f64("start_interval", self.start_interval, DEFAULT_INTERVAL_SECS)?;
        let burst = positive_i64("start_burst", self.start_burst, i64::from(DEFAULT_BURST))?;
        let threads = positive_i64("start_threads", self.start_threads, DEFAULT_THREADS as i64)?;

        let cpu_affinity = validate_cpu_affinity(self.cpu_affinity, cpu_count)?;

        let syslog = match self.syslog_server_url {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(SyslogTarget::parse(&s)?),
            Some(other) => return Err(ConfigError::InvalidSyslogTarget(other.to_string())),
        };

        Ok(Settings {
            url,
            method,
            post_data,
            headers,
            timeout: timeout.clamp(TIMEOUT_MIN_SECS, TIMEOUT_MAX_SECS),
            success_status_codes,
            interval: interval.clamp(INTERVAL_MIN_SECS, INTERVAL_MAX_SECS),
            burst: burst.clamp(i64::from(BURST_MIN), i64::from(BURST_MAX)) as u32,
            threads: threads as usize,
            cpu_affinity,
            syslog,
            source: self.source,
        })
    }
}

fn validate_url(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::UnsupportedScheme(url.to_string()));
    }
    let template = UrlTemplate::parse(url)?;
    match Url::parse(&template.example()) {
        Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(()),
        _ => Err(ConfigError::MalformedUrl(url.to_string())),
    }
}

fn validate_headers(headers: Option<Value>) -> Result<Vec<(String, String)>> {
    let map = match headers {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ConfigError::InvalidType { field: "headers", expected: "an object" }),
    };

    let mut headers = Vec::with_capacity(map.len() + 1);
    for (name, value) in map {
        let Value::String(value) = value else {
            return Err(ConfigError::InvalidHeader(name));
        };
        if name.eq_ignore_ascii_case("content-type")
            && !CONTENT_TYPES.contains(&value.to_ascii_lowercase().as_str())
        {
            return Err(ConfigError::InvalidContentType(value));
        }
        if !is_valid_header(&name, &value) {
            return Err(ConfigError::InvalidHeader(name));
        }
        headers.push((name, value));
    }

    if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("user-agent")) {
        headers.push(("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()));
    }
    Ok(headers)
}

fn validate_cpu_affinity(value: Option<Value>, cpu_count: usize) -> Result<Vec<usize>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ConfigError::InvalidType { field: "cpu_affinity", expected: "a list of integers" })
        }
    };
    let cpus = items.iter().map(|v| as_i64("cpu_affinity", v)).collect::<Result<Vec<_>>>()?;

    let last = cpu_count.saturating_sub(1);
    if cpus == [-1] {
        return Ok(vec![last]);
    }
    cpus.into_iter()
        .map(|cpu| match usize::try_from(cpu) {
            Ok(idx) if idx <= last => Ok(idx),
            _ => Err(ConfigError::InvalidCpu { cpu, max: last }),
        })
        .collect()
}

fn positive_f64(field: &'static str, value: Option<Value>, default: f64) -> Result<f64> {
    let v = match value {
        None | Some(Value::Null) => return Ok(default),
        Some(v) => as_f64(field, &v)?,
    };
    if v > 0.0 && v.is_finite() {
        Ok(v)
    } else {
        Err(ConfigError::NotPositive { field, value: v.to_string() })
    }
}

fn positive_i64(field: &'static str, value: Option<Value>, default: i64) -> Result<i64> {
    let v = match value {
        None | Some(Value::Null) => return Ok(default),
        Some(v) => as_i64(field, &v)?,
    };
    if v > 0 {
        Ok(v)
    } else {
        Err(ConfigError::NotPositive { field, value: v.to_string() })
    }
}

/// Numbers, or strings holding a number.
fn as_f64(field: &'static str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or(ConfigError::InvalidType { field, expected: "a number" })
}

fn as_i64(field: &'static str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or(ConfigError::InvalidType { field, expected: "an integer" })
}

/// Shared, live-tunable run parameters.
///
/// Target fields are fixed for the run. The tunables (interval, burst,
/// timeout, thread target) are written by the control loop and read by
/// workers once per cycle without further coordination: a change lands on
/// each worker at its next cycle boundary.
#[derive(Debug)]
pub struct RunConfig {
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    post_data: Map<String, Value>,
    success_status_codes: Vec<u16>,
    cpu_affinity: Vec<usize>,
    syslog: Option<SyslogTarget>,
    source: Option<PathBuf>,
    interval_bits: AtomicU64,
    timeout_bits: AtomicU64,
    burst: AtomicU32,
    thread_target: AtomicUsize,
}

/// The tunables as one worker sees them for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cycle {
    pub interval: Duration,
    pub burst: u32,
    pub timeout: Duration,
}

impl RunConfig {
    pub fn new(settings: Settings) -> Self {
        let body = settings.body();
        let config = Self {
            url: settings.url,
            method: settings.method,
            headers: settings.headers,
            body,
            post_data: settings.post_data,
            success_status_codes: settings.success_status_codes,
            cpu_affinity: settings.cpu_affinity,
            syslog: settings.syslog,
            source: settings.source,
            interval_bits: AtomicU64::new(0),
            timeout_bits: AtomicU64::new(0),
            burst: AtomicU32::new(BURST_MIN),
            thread_target: AtomicUsize::new(settings.threads.max(1)),
        };
        config.set_interval(settings.interval);
        config.set_timeout(settings.timeout);
        config.set_burst(i64::from(settings.burst));
        config
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn post_data(&self) -> &Map<String, Value> {
        &self.post_data
    }

    pub fn success_status_codes(&self) -> &[u16] {
        &self.success_status_codes
    }

    pub fn is_success(&self, code: u16) -> bool {
        self.success_status_codes.contains(&code)
    }

    pub fn cpu_affinity(&self) -> &[usize] {
        &self.cpu_affinity
    }

    pub fn syslog(&self) -> Option<&SyslogTarget> {
        self.syslog.as_ref()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn interval(&self) -> f64 {
        f64::from_bits(self.interval_bits.load(Ordering::Relaxed))
    }

    /// Store `secs` clamped to the interval range; returns the stored value.
    pub fn set_interval(&self, secs: f64) -> f64 {
        let secs = secs.clamp(INTERVAL_MIN_SECS, INTERVAL_MAX_SECS);
        self.interval_bits.store(secs.to_bits(), Ordering::Relaxed);
        secs
    }

    pub fn timeout(&self) -> f64 {
        f64::from_bits(self.timeout_bits.load(Ordering::Relaxed))
    }

    pub fn set_timeout(&self, secs: f64) -> f64 {
        let secs = secs.clamp(TIMEOUT_MIN_SECS, TIMEOUT_MAX_SECS);
        self.timeout_bits.store(secs.to_bits(), Ordering::Relaxed);
        secs
    }

    pub fn burst(&self) -> u32 {
        self.burst.load(Ordering::Relaxed)
    }

    pub fn set_burst(&self, burst: i64) -> u32 {
        let burst = burst.clamp(i64::from(BURST_MIN), i64::from(BURST_MAX)) as u32;
        self.burst.store(burst, Ordering::Relaxed);
        burst
    }

    pub fn thread_target(&self) -> usize {
        self.thread_target.load(Ordering::Relaxed)
    }

    pub fn set_thread_target(&self, threads: usize) {
        self.thread_target.store(threads.max(1), Ordering::Relaxed);
    }

    /// Snapshot of the tunables, read once at the top of every worker cycle.
    pub fn cycle(&self) -> Cycle {
        Cycle {
            interval: Duration::from_secs_f64(self.interval()),
            burst: self.burst(),
            timeout: Duration::from_secs_f64(self.timeout()),
        }
    }
}

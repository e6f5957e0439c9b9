use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod status;

/// Default latency window capacity (most recent samples kept for percentiles).
pub const DEFAULT_WINDOW_SIZE: usize = 10_000;

pub const DEFAULT_INTERVAL_SECS: f64 = 0.5;
pub const DEFAULT_BURST: u32 = 1;
pub const DEFAULT_THREADS: usize = 1;
pub const DEFAULT_TIMEOUT_SECS: f64 = 1.0;
pub const DEFAULT_SUCCESS_STATUS_CODES: [u16; 4] = [200, 201, 202, 204];

/// Configured timeouts below this value fall back to [`DEFAULT_TIMEOUT_SECS`].
pub const MIN_CONFIGURED_TIMEOUT_SECS: f64 = 0.001;

pub const INTERVAL_MIN_SECS: f64 = 0.000_01;
pub const INTERVAL_MAX_SECS: f64 = 5.0;
pub const BURST_MIN: u32 = 1;
pub const BURST_MAX: u32 = 300;
pub const TIMEOUT_MIN_SECS: f64 = 0.000_01;
pub const TIMEOUT_MAX_SECS: f64 = 60.0;

/// Multiplicative step applied by the interval and timeout controls (+/-10%).
pub const TUNING_STEP: f64 = 1.10;

/// Content-Type values accepted in the configured headers.
pub const CONTENT_TYPES: [&str; 20] = [
    "application/javascript",
    "application/json",
    "application/zip",
    "application/ogg",
    "application/pdf",
    "audio/mpeg",
    "audio/x-wav",
    "image/gif",
    "image/jpeg",
    "image/png",
    "multipart/form-data",
    "text/css",
    "text/csv",
    "text/html",
    "text/plain",
    "text/xml",
    "video/mpeg",
    "video/mp4",
    "video/quicktime",
    "video/webm",
];

/// The 24 standard syslog facility names.
pub const SYSLOG_FACILITIES: [&str; 24] = [
    "kern", "user", "mail", "daemon", "auth", "syslog", "lpr", "news", "uucp", "cron",
    "authpriv", "ftp", "ntp", "security", "console", "solaris-cron", "local0", "local1",
    "local2", "local3", "local4", "local5", "local6", "local7",
];

/// HTTP methods the generator can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const ALL: [Method; 5] =
        [Method::Get, Method::Post, Method::Put, Method::Patch, Method::Delete];

    /// Case-insensitive parse; anything outside [`Method::ALL`] is rejected.
    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::InvalidMethod(name.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the configured `post_data` is sent as the request body.
    pub fn sends_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal configuration errors, reported once before any worker starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Cannot read configuration file {0}: {1}")]
    Unreadable(String, String),

    #[error("The json file appears to be invalid - {0}")]
    InvalidJson(String),

    #[error("Missing \"{0}\" information in configuration")]
    MissingField(&'static str),

    #[error("Malformed URL - must start with http:// or https://, not \"{0}\"")]
    UnsupportedScheme(String),

    #[error("Malformed URL - \"{0}\"")]
    MalformedUrl(String),

    #[error("Invalid URL template token \"{0}\"")]
    InvalidUrlTemplate(String),

    #[error("The allowed methods are GET, POST, PUT, PATCH or DELETE, not \"{0}\"")]
    InvalidMethod(String),

    #[error("Error in \"{field}\", must be {expected}")]
    InvalidType { field: &'static str, expected: &'static str },

    #[error("Invalid content-type: {0}")]
    InvalidContentType(String),

    #[error("Invalid header \"{0}\"")]
    InvalidHeader(String),

    #[error("Invalid \"{field}\" value, must be greater than 0 - \"{value}\"")]
    NotPositive { field: &'static str, value: String },

    #[error("Error in \"cpu_affinity\", invalid cpu number {cpu} - valid cpu numbers are from 0 to {max}")]
    InvalidCpu { cpu: i64, max: usize },

    #[error("Invalid syslog server url \"{0}\" - use udp://, tcp:// or a unix socket path")]
    InvalidSyslogTarget(String),

    #[error("Invalid syslog facility \"{0}\"")]
    InvalidSyslogFacility(String),
}

/// Result type for configuration handling
pub type Result<T> = std::result::Result<T, ConfigError>;

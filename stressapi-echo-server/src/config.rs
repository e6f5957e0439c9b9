use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// How often the average request rate is reported.
pub const STATS_INTERVAL: Duration = Duration::from_secs(5);

pub mod affinity;
pub mod config;
pub mod control;
pub mod counters;
pub mod latency;
pub mod pool;
pub mod render;
pub mod report;
pub mod session;
pub mod syslog;
pub mod tally;
pub mod telemetry;
pub mod template;
pub mod terminal;
pub mod usage;
pub mod worker;

use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::SyslogTarget;
use crate::syslog::SyslogSink;
use crate::terminal::ConsoleWriter;

/// Console logging, plus syslog forwarding when a target is configured.
///
/// `RUST_LOG` overrides the level chosen by `debug`.
pub fn init_tracing(debug: bool, nodate: bool, syslog: Option<&SyslogTarget>) {
    let directive = if debug { LevelFilter::DEBUG } else { LevelFilter::INFO }.into();
    let filter = EnvFilter::builder().with_default_directive(directive).from_env_lossy();

    let console = fmt::layer().with_writer(ConsoleWriter::stdout).with_target(false);
    let console = if nodate { console.without_time().boxed() } else { console.boxed() };

    let (sink, failure) = match syslog.map(SyslogSink::connect) {
        Some(Ok(sink)) => (Some(sink), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let remote = sink.map(|sink| {
        fmt::layer().with_writer(sink).with_ansi(false).without_time().with_target(false)
    });

    tracing_subscriber::registry().with(filter).with(console).with(remote).init();

    if let (Some(target), Some(e)) = (syslog, failure) {
        warn!("Cannot reach the syslog server {target}: {e}, logging to the console only");
    }
}

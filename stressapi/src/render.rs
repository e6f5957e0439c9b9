use std::fmt::Write as _;
use std::io::Write;
use stressapi_common::status;

use crate::control::{Presenter, Report};
use crate::report::{format_duration, ConfigSnapshot, RateSnapshot, StatsSnapshot};
use crate::usage::ProcessUsage;

const RULE: &str = "────────────────────────────────────────────────────────────────────────";
const BAR_WIDTH: usize = 30;
const BAR_MARK: char = '◼';

pub const HELP: &str = "\
  Control keys available:
    Up    -> Increase the interval between requests by 10% (slower)
    Down  -> Decrease the interval between requests by 10% (faster)
    Right -> Increase the burst of requests (faster)
    Left  -> Reduce the burst of requests (slower)
    + -   -> Increase/decrease the timeout by 10%
    > <   -> Increase/decrease the number of threads
    C     -> Show the current configuration
    P     -> Pause/resume the run
    M     -> Show memory and CPU usage
    V     -> Start/stop logging every request with its status code
    B     -> Same as V, also logging the response body
    S     -> Show success/failure counts and latency percentiles
    R     -> Reset all statistics
    F     -> Finish the run, showing the statistics
    Enter -> Show the current request rate
    Esc/Q -> Exit
    H     -> Show this help";

/// Writes reports as plain text.
pub struct ConsolePresenter<W: Write> {
    out: W,
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn present(&mut self, report: &Report) {
        let text = render(report);
        // A closed console is not worth failing the run over.
        let _ = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush());
    }
}

pub fn render(report: &Report) -> String {
    match report {
        Report::Help => format!("{RULE}\n{HELP}\n{RULE}\n"),
        Report::Config(config) => render_config(config),
        Report::Rate(rate) => render_rate(rate),
        Report::Stats(stats) => render_stats(stats),
        Report::Usage(usage) => render_usage(usage.as_ref()),
    }
}

fn render_rate(rate: &RateSnapshot) -> String {
    if rate.paused {
        return ">>> Average: 0 requests/sec (PAUSED)\n".to_string();
    }
    format!(
        ">>> Average {:.0} req/sec - Min/Avg/Max: {}/{}/{} - Total: {} reqs\n",
        rate.average.per_sec,
        secs(rate.min),
        secs(rate.avg),
        secs(rate.max),
        rate.total,
    )
}

fn render_usage(usage: Option<&ProcessUsage>) -> String {
    match usage {
        Some(u) => format!(
            ">>> Memory usage: {:.2} MiB - CPU usage: {:.1}%\n",
            u.memory_mib, u.cpu_percent
        ),
        None => ">>> Memory and CPU usage are not available\n".to_string(),
    }
}

fn render_config(config: &ConfigSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\n>>> Current configuration:\n");
    if let Some(source) = &config.source {
        let _ = writeln!(out, "    Config file:    {}", source.display());
    }
    let _ = writeln!(out, "    URL:            {}", config.url);
    let _ = writeln!(out, "    Method:         {}", config.method);
    for (i, (name, value)) in config.headers.iter().enumerate() {
        let title = if i == 0 { "Headers:" } else { "" };
        let _ = writeln!(out, "    {title:<16}{name}: {value}");
    }
    if !config.post_data.is_empty() {
        let body = serde_json::to_string(&config.post_data).unwrap_or_default();
        let _ = writeln!(out, "    Post data:      {body}");
    }
    let _ = writeln!(out, "    Timeout:        {:.6} sec", config.timeout);
    let codes: Vec<String> = config.success_status_codes.iter().map(u16::to_string).collect();
    let _ = writeln!(out, "    Success codes:  {}", codes.join(", "));
    let _ = writeln!(out, "    Interval:       {:.6} sec", config.interval);
    let _ = writeln!(out, "    Burst:          {}", config.burst);
    let _ = writeln!(out, "    Threads:        {}", config.threads);
    if !config.cpu_affinity.is_empty() {
        let _ = writeln!(out, "    CPU affinity:   {:?}", config.cpu_affinity);
    }
    if let Some(syslog) = &config.syslog {
        let _ = writeln!(out, "    Syslog server:  {syslog}");
    }
    let _ = writeln!(out, "    Window size:    {}", config.window_size);
    let _ = writeln!(out, "    Running for:    {}", format_duration(config.uptime));
    let _ = writeln!(out, "{RULE}");
    out
}

fn render_stats(stats: &StatsSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\n>>> Statistics: Success vs. Errors");

    let groups = stats.groups;
    let peak = groups.rows().iter().map(|&(_, n)| n).max().unwrap_or(0);
    for (name, count) in groups.rows() {
        let filled = if peak == 0 { 0 } else { (count as usize * BAR_WIDTH).div_ceil(peak as usize) };
        let bar: String = std::iter::repeat(BAR_MARK).take(filled).collect();
        let _ = writeln!(
            out,
            "    {name:>18} {bar:<BAR_WIDTH$} {count} ({:.2}%)",
            groups.percent(count)
        );
    }

    let _ = writeln!(out);
    let cells: Vec<String> =
        stats.codes.iter().map(|&(code, count)| format!("{}: {count}", status::label(code))).collect();
    let half = cells.len().div_ceil(2);
    for i in 0..half {
        let left = &cells[i];
        let right = cells.get(half + i).map(String::as_str).unwrap_or_default();
        let _ = writeln!(out, "    {left:<36} {right}");
    }

    let latency = &stats.latency;
    let _ = writeln!(
        out,
        "\n>>> Statistics: Elapsed time of last {} requests",
        latency.samples.min(latency.capacity)
    );
    let _ = writeln!(
        out,
        "    {:>14} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Total Requests", "Min", "Avg", "Max", "50th pct", "75th pct", "90th pct", "99th pct"
    );
    let _ = writeln!(
        out,
        "    {:>14} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        stats.total,
        secs(latency.min),
        secs(latency.avg),
        secs(latency.max),
        secs(latency.p50),
        secs(latency.p75),
        secs(latency.p90),
        secs(latency.p99),
    );
    let _ = writeln!(out, "{RULE}");
    out
}

fn secs(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.6}"),
        None => "-".to_string(),
    }
}

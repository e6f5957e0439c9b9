use std::thread;
use std::time::Duration;
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

/// Memory and CPU figures for this process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessUsage {
    pub memory_mib: f64,
    pub cpu_percent: f32,
}

/// Sample the current process. CPU usage needs two refreshes, so this blocks
/// for a short measurement window.
pub fn sample() -> Option<ProcessUsage> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_process(pid);
    thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL.max(Duration::from_millis(200)));
    system.refresh_process(pid);

    let process = system.process(pid)?;
    Some(ProcessUsage {
        memory_mib: process.memory() as f64 / (1024.0 * 1024.0),
        cpu_percent: process.cpu_usage(),
    })
}

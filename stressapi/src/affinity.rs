use std::io;
use sysinfo::{CpuRefreshKind, RefreshKind, System};
#[cfg(not(target_os = "linux"))]
use tracing::warn;

/// Number of logical CPUs on this machine.
pub fn available_cpus() -> usize {
    let system = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new()));
    match system.cpus().len() {
        0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        n => n,
    }
}

/// Pin the calling thread, and every thread it spawns afterwards, to `cpus`.
#[cfg(target_os = "linux")]
pub fn set_cpu_affinity(cpus: &[usize]) -> io::Result<()> {
    if cpus.is_empty() {
        return Ok(());
    }
    // SAFETY: cpu_set_t is plain data; the macros and the syscall only touch `set`.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        for &cpu in cpus {
            libc::CPU_SET(cpu, &mut set);
        }
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_cpu_affinity(cpus: &[usize]) -> io::Result<()> {
    if !cpus.is_empty() {
        warn!("CPU affinity is not supported on this platform, ignoring {cpus:?}");
    }
    Ok(())
}

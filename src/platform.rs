//! Platform queries and the optional process-inspection capability.
//!
//! Process inspection (memory totals, parent pids, killing by name) is
//! backed by `sysinfo` when available. Callers receive a
//! [`ProcessInspector`] at startup and branch on the variant instead of
//! guarding every call site.

use crate::config::RenderNodeConfig;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

pub fn is_windows() -> bool {
    cfg!(target_os = "windows")
}

pub fn is_linux() -> bool {
    cfg!(target_os = "linux")
}

pub fn is_mac() -> bool {
    cfg!(target_os = "macos")
}

/// Short platform name for logs.
pub fn platform_name() -> &'static str {
    if is_windows() {
        "windows"
    } else if is_mac() {
        "mac"
    } else if is_linux() {
        "linux"
    } else {
        "other"
    }
}

/// A process terminated by [`ProcessInspector::kill_matching`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KilledProcess {
    pub pid: u32,
    pub name: String,
}

/// Process inspection capability.
pub enum ProcessInspector {
    Available(Box<System>),
    Unavailable,
}

impl std::fmt::Debug for ProcessInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessInspector::Available(_) => write!(f, "ProcessInspector::Available"),
            ProcessInspector::Unavailable => write!(f, "ProcessInspector::Unavailable"),
        }
    }
}

impl ProcessInspector {
    /// Probe the system and return the available variant when supported.
    pub fn detect() -> Self {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            tracing::warn!(platform = platform_name(), "process inspection not supported");
            return ProcessInspector::Unavailable;
        }
        let mut system = System::new();
        system.refresh_memory();
        ProcessInspector::Available(Box::new(system))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ProcessInspector::Available(_))
    }

    /// Total physical memory in bytes.
    pub fn total_memory(&mut self) -> Option<u64> {
        match self {
            ProcessInspector::Available(system) => {
                system.refresh_memory();
                Some(system.total_memory())
            }
            ProcessInspector::Unavailable => None,
        }
    }

    pub fn parent_pid(&mut self, pid: u32) -> Option<u32> {
        match self {
            ProcessInspector::Available(system) => {
                let pid = Pid::from_u32(pid);
                system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                system
                    .process(pid)
                    .and_then(|p| p.parent())
                    .map(|p| p.as_u32())
            }
            ProcessInspector::Unavailable => None,
        }
    }

    /// Whether `pid` refers to a live process. Zombies count as dead except
    /// on Windows, which has no such state. `None` when it can't be told.
    pub fn is_alive(&mut self, pid: u32) -> Option<bool> {
        match self {
            ProcessInspector::Available(system) => {
                let pid = Pid::from_u32(pid);
                system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                let alive = match system.process(pid) {
                    None => false,
                    Some(p) => is_windows() || !matches!(p.status(), ProcessStatus::Zombie),
                };
                Some(alive)
            }
            ProcessInspector::Unavailable => signal_probe(pid),
        }
    }

    /// Terminate every process whose name contains one of `patterns`,
    /// skipping `protected` pids. Failures are logged and skipped.
    pub fn kill_matching(&mut self, patterns: &[String], protected: &[u32]) -> Vec<KilledProcess> {
        let system = match self {
            ProcessInspector::Available(system) => system,
            ProcessInspector::Unavailable => {
                tracing::warn!("process inspection unavailable, not killing job processes");
                return Vec::new();
            }
        };
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut killed = Vec::new();
        for (pid, process) in system.processes() {
            let pid = pid.as_u32();
            if protected.contains(&pid) {
                continue;
            }
            let name = process.name().to_string_lossy().to_string();
            if !patterns.iter().any(|p| !p.is_empty() && name.contains(p.as_str())) {
                continue;
            }
            tracing::info!(pid, name = %name, "terminating process");
            if process.kill() {
                killed.push(KilledProcess { pid, name });
            } else {
                tracing::warn!(pid, name = %name, "failed to terminate process");
            }
        }
        killed
    }
}

#[cfg(unix)]
fn signal_probe(pid: u32) -> Option<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as NixPid;

    let Ok(raw) = i32::try_from(pid) else {
        return Some(false);
    };
    match kill(NixPid::from_raw(raw), None::<Signal>) {
        Ok(()) => Some(true),
        // Exists but belongs to someone else.
        Err(Errno::EPERM) => Some(true),
        Err(Errno::ESRCH) => Some(false),
        Err(_) => None,
    }
}

#[cfg(not(unix))]
fn signal_probe(_pid: u32) -> Option<bool> {
    None
}

/// Host name used to recognize render nodes.
pub fn host_name() -> Option<String> {
    System::host_name()
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .or_else(|| std::env::var("HOSTNAME").ok())
}

/// Kill leftover job processes on a render node.
///
/// With `nodes_only`, nothing happens unless the host name contains the
/// configured marker. The current process and its parent are never touched.
pub fn kill_job_processes(
    inspector: &mut ProcessInspector,
    config: &RenderNodeConfig,
    nodes_only: bool,
) -> Vec<KilledProcess> {
    if nodes_only {
        let host = host_name().unwrap_or_default();
        if !host.contains(&config.name_marker) {
            tracing::debug!(host = %host, marker = %config.name_marker, "not a render node, skipping");
            return Vec::new();
        }
    }

    let current = std::process::id();
    let mut protected = vec![current];
    if let Some(parent) = inspector.parent_pid(current) {
        protected.push(parent);
    }
    inspector.kill_matching(&config.kill_patterns, &protected)
}

//! Client process helpers: where to launch it from, whether it runs, and
//! force-termination.

use std::path::PathBuf;
use std::process::Command;

use sysinfo::{ProcessRefreshKind, System};

use crate::backend::LaunchTarget;
use crate::config::ClientConfig;
use crate::error::{UiError, UiResult};

const PROGRAM_FILES_PATHS: [&str; 2] = [
    r"C:\Program Files\Zoom\bin\Zoom.exe",
    r"C:\Program Files (x86)\Zoom\bin\Zoom.exe",
];
const PROTOCOL_FALLBACK: &str = "zoommtg:";

/// Launch targets in priority order: configured executable, per-user
/// install, machine-wide installs, then the protocol handler. Executables
/// that don't exist on disk are skipped.
pub fn launch_candidates(client: &ClientConfig) -> Vec<LaunchTarget> {
    let mut paths: Vec<PathBuf> = Vec::new();
    if let Some(path) = &client.executable {
        paths.push(path.clone());
    }
    if let Some(roaming) = dirs::config_dir() {
        paths.push(roaming.join("Zoom").join("bin").join("Zoom.exe"));
    }
    paths.extend(PROGRAM_FILES_PATHS.iter().map(PathBuf::from));

    let mut targets: Vec<LaunchTarget> = paths
        .into_iter()
        .filter(|path| path.exists())
        .map(LaunchTarget::Executable)
        .collect();
    targets.push(LaunchTarget::Protocol(PROTOCOL_FALLBACK.to_string()));
    targets
}

/// Starts the client without waiting for it.
pub fn spawn(target: &LaunchTarget) -> UiResult<()> {
    let result = match target {
        LaunchTarget::Executable(path) => Command::new(path).spawn(),
        LaunchTarget::Protocol(scheme) => protocol_command(scheme).spawn(),
    };
    result
        .map(|_| ())
        .map_err(|err| UiError::action_failed(format!("launch {}: {}", target, err)))
}

#[cfg(windows)]
fn protocol_command(scheme: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", scheme]);
    command
}

#[cfg(not(windows))]
fn protocol_command(scheme: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(scheme);
    command
}

fn refreshed_system() -> System {
    let mut sys = System::new();
    sys.refresh_processes_specifics(ProcessRefreshKind::new());
    sys
}

/// PIDs of processes whose name equals `process_name` (case-insensitive).
pub fn running_pids(process_name: &str) -> Vec<u32> {
    let sys = refreshed_system();
    let mut pids: Vec<u32> = sys
        .processes()
        .values()
        .filter(|process| process.name().eq_ignore_ascii_case(process_name))
        .map(|process| process.pid().as_u32())
        .collect();
    pids.sort_unstable();
    pids
}

/// Kills every process named `process_name`. Returns how many were
/// signalled; zero when none were running.
pub fn terminate_by_name(process_name: &str) -> usize {
    let sys = refreshed_system();
    let mut killed = 0;
    for process in sys
        .processes()
        .values()
        .filter(|process| process.name().eq_ignore_ascii_case(process_name))
    {
        if process.kill() {
            killed += 1;
        } else {
            tracing::warn!(pid = process.pid().as_u32(), process = process_name, "Failed to kill process");
        }
    }
    killed
}

/// Whether `pid` refers to a live process.
pub fn is_pid_alive(pid: u32) -> bool {
    let mut sys = System::new();
    let sys_pid = sysinfo::Pid::from(pid as usize);
    sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new())
}

/// Start time of `pid` in seconds since the epoch, if it is running.
pub fn start_time(pid: u32) -> Option<u64> {
    let mut sys = System::new();
    let sys_pid = sysinfo::Pid::from(pid as usize);
    sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new());
    sys.process(sys_pid).map(|process| process.start_time())
}

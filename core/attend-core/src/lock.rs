//! Machine-wide run lock.
//!
//! Join, leave and recovery drive the same desktop, so only one of them may
//! run at a time. The lock is a directory created atomically under the state
//! directory:
//!
//! ```text
//! ~/.attend/attend.lock/
//! ├── pid          # Plain text: owner process ID
//! └── meta.json    # { pid, created, proc_started }
//! ```
//!
//! Acquisition never blocks. A lock whose owner is gone (dead pid, or a pid
//! recycled by a process with a different start time) is stale and taken
//! over. A directory without readable metadata belongs to an owner that has
//! not finished writing it; it only counts as stale once it is older than
//! `SETUP_GRACE`. The lock is released when the guard is dropped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AttendError, Result};
use crate::process;

const LOCK_DIR_NAME: &str = "attend.lock";
const PID_FILE: &str = "pid";
const META_FILE: &str = "meta.json";

/// Tolerance when comparing recorded and observed process start times.
const START_TIME_TOLERANCE_SECS: u64 = 2;

/// How long a lock directory may stay without metadata before it is stale.
const SETUP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockMeta {
    pub pid: u32,
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proc_started: Option<u64>,
}

/// Held run lock; dropping it releases the lock.
#[derive(Debug)]
pub struct RunLock {
    dir: PathBuf,
    meta: LockMeta,
}

impl RunLock {
    /// Takes the lock under `state_dir`, or fails with `LockHeld` when a live
    /// process owns it and `LockBusy` when another run is still creating it.
    pub fn try_acquire(state_dir: &Path) -> Result<RunLock> {
        Self::acquire(state_dir, SETUP_GRACE)
    }

    fn acquire(state_dir: &Path, setup_grace: Duration) -> Result<RunLock> {
        fs_err::create_dir_all(state_dir).map_err(|source| AttendError::Io {
            context: format!("creating {}", state_dir.display()),
            source,
        })?;
        let dir = state_dir.join(LOCK_DIR_NAME);

        match fs_err::create_dir(&dir) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                match read_meta(&dir) {
                    Some(meta) if owner_alive(&meta) => {
                        return Err(AttendError::LockHeld { pid: meta.pid });
                    }
                    Some(meta) => {
                        tracing::info!(stale_pid = meta.pid, "Taking over stale run lock");
                    }
                    None if lock_age(&dir).is_some_and(|age| age < setup_grace) => {
                        return Err(AttendError::LockBusy { path: dir });
                    }
                    None => tracing::warn!(path = %dir.display(), "Unreadable run lock; taking it over"),
                }
                remove_dir(&dir)?;
                fs_err::create_dir(&dir).map_err(|source| {
                    if source.kind() == ErrorKind::AlreadyExists {
                        AttendError::LockBusy { path: dir.clone() }
                    } else {
                        lock_io(&dir, source)
                    }
                })?;
            }
            Err(source) => return Err(lock_io(&dir, source)),
        }

        let pid = std::process::id();
        let meta = LockMeta {
            pid,
            created: Utc::now(),
            proc_started: process::start_time(pid),
        };
        if let Err(err) = write_meta(&dir, &meta) {
            let _ = fs_err::remove_dir_all(&dir);
            return Err(err);
        }

        tracing::debug!(path = %dir.display(), pid, "Run lock acquired");
        Ok(RunLock { dir, meta })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn meta(&self) -> &LockMeta {
        &self.meta
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs_err::remove_dir_all(&self.dir) {
            Ok(()) => tracing::debug!(path = %self.dir.display(), "Run lock released"),
            Err(err) => tracing::warn!(error = %err, "Failed to release run lock"),
        }
    }
}

/// Reads the owner of an existing lock directory. `None` when the directory
/// is missing or half-written.
pub fn read_meta(dir: &Path) -> Option<LockMeta> {
    let pid: u32 = fs_err::read_to_string(dir.join(PID_FILE))
        .ok()?
        .trim()
        .parse()
        .ok()?;
    let content = fs_err::read_to_string(dir.join(META_FILE)).ok()?;
    let meta: LockMeta = serde_json::from_str(&content).ok()?;
    (meta.pid == pid).then_some(meta)
}

fn owner_alive(meta: &LockMeta) -> bool {
    if !process::is_pid_alive(meta.pid) {
        return false;
    }
    match (meta.proc_started, process::start_time(meta.pid)) {
        (Some(recorded), Some(actual)) => recorded.abs_diff(actual) <= START_TIME_TOLERANCE_SECS,
        _ => true,
    }
}

/// Time since the lock directory was last modified.
fn lock_age(dir: &Path) -> Option<Duration> {
    let modified = fs_err::metadata(dir).ok()?.modified().ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

fn write_meta(dir: &Path, meta: &LockMeta) -> Result<()> {
    fs_err::write(dir.join(PID_FILE), meta.pid.to_string()).map_err(|source| lock_io(dir, source))?;
    let content = serde_json::to_string_pretty(meta).map_err(|source| AttendError::Json {
        context: "serializing run lock metadata".to_string(),
        source,
    })?;
    fs_err::write(dir.join(META_FILE), content).map_err(|source| lock_io(dir, source))
}

fn remove_dir(dir: &Path) -> Result<()> {
    match fs_err::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(lock_io(dir, source)),
    }
}

fn lock_io(dir: &Path, source: std::io::Error) -> AttendError {
    AttendError::Io {
        context: format!("run lock {}", dir.display()),
        source,
    }
}

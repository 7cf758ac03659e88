//! Error types for attend-core operations.
//!
//! Two layers: `UiError` travels between the desktop backend and the
//! workflows and is never surfaced to the caller of the orchestrator;
//! `AttendError` covers the setup work (configuration, run lock) that happens
//! before any workflow starts.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// UI Automation Outcomes
// ═══════════════════════════════════════════════════════════════════════════════

/// Why a UI interaction did not happen.
///
/// `Absent` is an expected outcome (the surface or control is simply not
/// there) and feeds the next strategy. `ActionFailed` means the control was
/// found but the interaction could not be confirmed. `Timeout` is a required
/// wait that exhausted its budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UiError {
    #[error("not found: {0}")]
    Absent(String),

    #[error("action failed: {0}")]
    ActionFailed(String),

    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },
}

impl UiError {
    pub fn absent(what: impl Into<String>) -> Self {
        UiError::Absent(what.into())
    }

    pub fn action_failed(what: impl Into<String>) -> Self {
        UiError::ActionFailed(what.into())
    }
}

pub type UiResult<T> = std::result::Result<T, UiError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Setup Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur before a workflow runs.
#[derive(Debug, thiserror::Error)]
pub enum AttendError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Invalid configuration value: {field}: {reason}")]
    ConfigInvalid { field: String, reason: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    // ─────────────────────────────────────────────────────────────────────
    // Run Lock Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Another attend run is in progress (pid {pid})")]
    LockHeld { pid: u32 },

    #[error("Another attend run is setting up the run lock at {path}")]
    LockBusy { path: PathBuf },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results using AttendError.
pub type Result<T> = std::result::Result<T, AttendError>;

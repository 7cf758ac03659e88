//! # attend-core
//!
//! Session keeper for an unattended meeting client: detects whether the
//! machine is still in its meeting, and rejoins it when it is not.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Every wait goes through an injected [`Clock`].
//! - **Graceful degradation**: A missing window or control is a value (`None`,
//!   [`UiError::Absent`]), never a panic.
//! - **One seam to the OS**: Workflows only talk to a [`Desktop`]; the UI
//!   Automation backend lives behind it.
//! - **Client windows only**: Window scans see only windows owned by the
//!   client process, never another application's.
//! - **Declarative workflows**: Join and leave are step tables run by
//!   [`workflow::run_steps`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use attend_core::{ensure_session, load_config, config_path, platform_desktop, SystemClock};
//!
//! let config = load_config(&config_path(None)?)?;
//! let desktop = platform_desktop(&config);
//! if ensure_session(&config, desktop.as_ref(), &SystemClock) {
//!     // capture
//! }
//! ```

pub mod backend;
pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod join;
pub mod leave;
pub mod locator;
pub mod lock;
pub mod popups;
pub mod process;
pub mod recovery;
pub mod surface;
pub mod workflow;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::{platform_desktop, Desktop, LaunchTarget};
pub use clock::{Clock, SystemClock};
pub use config::*;
pub use detector::{Detector, MeetingHealth, SessionState};
pub use error::{AttendError, Result, UiError, UiResult};
pub use join::JoinWorkflow;
pub use leave::LeaveWorkflow;
pub use locator::Locator;
pub use lock::RunLock;
pub use popups::PopupDismisser;
pub use recovery::{ensure_session, Recovery, RecoveryOutcome};
pub use surface::{Surface, SurfaceKind, WindowHandle};
pub use workflow::{Step, StepResult, WorkflowReport};

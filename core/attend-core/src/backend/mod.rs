//! Desktop backends.
//!
//! `Desktop` is the single seam between the workflows and the operating
//! system: surface resolution, top-level enumeration, synthetic input, and
//! the client process. Workflows only ever hold a `&dyn Desktop`.
//!
//! - [`windows`]: UI Automation backend (Windows only)
//! - [`inert`]: backend for platforms without the client; every lookup is
//!   absent, every action fails

use std::path::PathBuf;
use std::time::Duration;

use crate::config::AttendConfig;
use crate::error::UiResult;
use crate::surface::{Surface, SurfaceKind};

pub mod inert;
#[cfg(windows)]
pub mod windows;

/// How to start the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    Executable(PathBuf),
    /// Shell-registered protocol handler, e.g. `zoommtg:`.
    Protocol(String),
}

impl std::fmt::Display for LaunchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchTarget::Executable(path) => write!(f, "{}", path.display()),
            LaunchTarget::Protocol(scheme) => write!(f, "{}", scheme),
        }
    }
}

pub trait Desktop {
    /// Resolves a well-known surface right now, without waiting.
    fn resolve(&self, kind: SurfaceKind) -> Option<Box<dyn Surface>>;

    /// Every top-level window on the desktop, whatever process owns it.
    fn top_level(&self) -> Vec<Box<dyn Surface>>;

    /// Ids of the running client processes.
    fn client_pids(&self) -> Vec<u32>;

    fn move_pointer(&self, x: i32, y: i32) -> UiResult<()>;
    fn click_at(&self, x: i32, y: i32, clicks: u32, interval: Duration) -> UiResult<()>;

    /// Presses the key that accepts the focused dialog's default button.
    fn press_default_accept(&self) -> UiResult<()>;

    /// Sends the global maximize-window hotkey to the foreground window.
    fn maximize_hotkey(&self) -> UiResult<()>;

    fn screen_size(&self) -> (i32, i32);

    fn launch(&self, target: &LaunchTarget) -> UiResult<()>;

    /// Force-terminates every process named `process_name`. Returns how many
    /// were signalled.
    fn terminate(&self, process_name: &str) -> UiResult<usize>;
}

/// The backend for the current platform.
pub fn platform_desktop(config: &AttendConfig) -> Box<dyn Desktop> {
    let process_name = config.client.process_name.clone();

    #[cfg(windows)]
    {
        match windows::UiaDesktop::new(process_name.clone()) {
            Ok(desktop) => return Box::new(desktop),
            Err(err) => {
                tracing::error!(error = %err, "UI Automation unavailable; falling back to inert backend");
            }
        }
    }

    Box::new(inert::InertDesktop::new(process_name))
}

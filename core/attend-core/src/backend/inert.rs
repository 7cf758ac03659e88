//! Backend for platforms where the client's windows cannot be automated.
//!
//! Nothing ever resolves, so the detector reports `NotRunning` and the leave
//! workflow treats the machine as already idle.

use std::time::Duration;

use super::{Desktop, LaunchTarget};
use crate::error::{UiError, UiResult};
use crate::process;
use crate::surface::{Surface, SurfaceKind};

#[derive(Debug, Clone)]
pub struct InertDesktop {
    process_name: String,
}

impl InertDesktop {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }
}

fn unsupported<T>() -> UiResult<T> {
    Err(UiError::action_failed(format!(
        "UI automation is not supported on {}",
        std::env::consts::OS
    )))
}

impl Desktop for InertDesktop {
    fn resolve(&self, _kind: SurfaceKind) -> Option<Box<dyn Surface>> {
        None
    }

    fn top_level(&self) -> Vec<Box<dyn Surface>> {
        Vec::new()
    }

    fn client_pids(&self) -> Vec<u32> {
        process::running_pids(&self.process_name)
    }

    fn move_pointer(&self, _x: i32, _y: i32) -> UiResult<()> {
        unsupported()
    }

    fn click_at(&self, _x: i32, _y: i32, _clicks: u32, _interval: Duration) -> UiResult<()> {
        unsupported()
    }

    fn press_default_accept(&self) -> UiResult<()> {
        unsupported()
    }

    fn maximize_hotkey(&self) -> UiResult<()> {
        unsupported()
    }

    fn screen_size(&self) -> (i32, i32) {
        (0, 0)
    }

    fn launch(&self, _target: &LaunchTarget) -> UiResult<()> {
        unsupported()
    }

    fn terminate(&self, process_name: &str) -> UiResult<usize> {
        Ok(process::terminate_by_name(process_name))
    }
}

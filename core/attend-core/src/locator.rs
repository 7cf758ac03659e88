//! Window locator.
//!
//! `find` is one bounded polling attempt: it returns the surface as soon as
//! it resolves, or `None` when the timeout runs out. Absence is a normal
//! outcome; retry policy beyond the timeout belongs to the caller.

use std::time::Duration;

use crate::backend::Desktop;
use crate::clock::Clock;
use crate::surface::{SurfaceKind, WindowHandle};

/// Spacing between resolve attempts inside one `find`.
const RESOLVE_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Clone, Copy)]
pub struct Locator<'a> {
    desktop: &'a dyn Desktop,
    clock: &'a dyn Clock,
}

impl<'a> Locator<'a> {
    pub fn new(desktop: &'a dyn Desktop, clock: &'a dyn Clock) -> Self {
        Self { desktop, clock }
    }

    pub fn desktop(&self) -> &'a dyn Desktop {
        self.desktop
    }

    pub fn clock(&self) -> &'a dyn Clock {
        self.clock
    }

    pub fn find(&self, kind: SurfaceKind, timeout: Duration) -> Option<WindowHandle> {
        let deadline = self.clock.now() + timeout;
        loop {
            if let Some(surface) = self.desktop.resolve(kind) {
                return Some(WindowHandle::new(Some(kind), surface));
            }
            let now = self.clock.now();
            if now >= deadline {
                return None;
            }
            self.clock.sleep(RESOLVE_INTERVAL.min(deadline - now));
        }
    }

    /// Tries each kind in order; the first that resolves wins.
    pub fn find_any(&self, kinds: &[SurfaceKind], timeout: Duration) -> Option<WindowHandle> {
        kinds.iter().find_map(|kind| self.find(*kind, timeout))
    }

    /// Top-level windows owned by a running client process, untagged.
    /// Windows of other applications never show up here.
    pub fn top_level(&self) -> Vec<WindowHandle> {
        let owners = self.desktop.client_pids();
        if owners.is_empty() {
            return Vec::new();
        }
        self.desktop
            .top_level()
            .into_iter()
            .filter(|surface| surface.process_id().is_some_and(|pid| owners.contains(&pid)))
            .map(|surface| WindowHandle::new(None, surface))
            .collect()
    }
}

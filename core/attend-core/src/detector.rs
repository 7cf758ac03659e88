//! Session state detection.
//!
//! The client exposes no reliable "connected" flag, so state is inferred
//! from several weak signals: which well-known surfaces resolve, whether any
//! window carries meeting controls, and whether any window talks about a
//! lost connection.
//!
//! # In-session priority
//!
//! The in-session surface is checked first. Only when it does not resolve do
//! we fall back to the control heuristic (some window exposing both a mute
//! and a leave control), which covers the connecting phase where the meeting
//! window exists but has not been assigned its class yet.

use std::fmt;
use std::time::Duration;

use crate::locator::Locator;
use crate::surface::{ControlQuery, SurfaceKind, WindowHandle};

const RUNNING_PROBE: Duration = Duration::from_secs(1);
const IN_SESSION_PROBE: Duration = Duration::from_secs(1);
const INDICATOR_PROBE: Duration = Duration::from_millis(300);
const TEXT_SCAN_LIMIT: usize = 10;

pub const MUTE_LABELS: [&str; 2] = ["Mute", "음소거"];
pub const LEAVE_LABELS: [&str; 2] = ["Leave", "나가기"];

/// Substrings (matched case-insensitively) that indicate a lost or unstable
/// connection.
pub const DISCONNECT_KEYWORDS: [&str; 14] = [
    "연결이 끊어",
    "연결 끊김",
    "연결이 불안정",
    "네트워크 연결",
    "회의에서 연결",
    "재연결",
    "인터넷 연결",
    "disconnected",
    "connection",
    "unstable",
    "reconnect",
    "network",
    "internet",
    "lost connection",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotRunning,
    Idle,
    DialogActive,
    InSession,
    DisconnectAlert,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::NotRunning => "not running",
            SessionState::Idle => "idle",
            SessionState::DialogActive => "dialog active",
            SessionState::InSession => "in session",
            SessionState::DisconnectAlert => "disconnect alert",
        };
        f.write_str(label)
    }
}

/// How sure we are that the meeting window is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingHealth {
    /// No meeting window.
    Absent,
    /// Meeting window with mute or leave controls.
    Confirmed,
    /// Meeting window present, controls not visible (toolbar hidden).
    WindowOnly,
}

#[derive(Clone, Copy)]
pub struct Detector<'a> {
    locator: Locator<'a>,
}

fn matches_keyword(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    DISCONNECT_KEYWORDS
        .iter()
        .find(|keyword| lowered.contains(&keyword.to_lowercase()))
        .copied()
}

impl<'a> Detector<'a> {
    pub fn new(locator: Locator<'a>) -> Self {
        Self { locator }
    }

    pub fn is_running(&self) -> bool {
        self.locator.find(SurfaceKind::Main, RUNNING_PROBE).is_some()
            || self
                .locator
                .find(SurfaceKind::InSession, RUNNING_PROBE)
                .is_some()
    }

    pub fn is_in_session(&self) -> bool {
        if self
            .locator
            .find(SurfaceKind::InSession, IN_SESSION_PROBE)
            .is_some()
        {
            return true;
        }

        let has_any = |handle: &WindowHandle, labels: &[&str]| {
            labels.iter().any(|label| {
                let query = ControlQuery::button(label)
                    .containing()
                    .with_probe(INDICATOR_PROBE);
                handle.surface().exists(&query)
            })
        };

        let found = self
            .locator
            .top_level()
            .into_iter()
            .find(|handle| has_any(handle, &MUTE_LABELS) && has_any(handle, &LEAVE_LABELS))
            .map(|handle| handle.title().to_string());
        if let Some(title) = found {
            tracing::debug!(surface = %title, "Meeting controls found outside the in-session surface");
            return true;
        }
        false
    }

    /// Scans window titles and the first few text elements of every window
    /// for a disconnect keyword. Stops at the first hit.
    pub fn check_disconnect_alert(&self) -> bool {
        for handle in self.locator.top_level() {
            if let Some(keyword) = matches_keyword(handle.title()) {
                tracing::info!(surface = %handle.title(), keyword, "Disconnect alert in window title");
                return true;
            }
            for text in handle.surface().read_texts(TEXT_SCAN_LIMIT) {
                if let Some(keyword) = matches_keyword(&text) {
                    tracing::info!(surface = %handle.title(), keyword, "Disconnect alert in window text");
                    return true;
                }
            }
        }
        false
    }

    /// Coarse state, most urgent signal first.
    pub fn detect(&self) -> SessionState {
        if self.check_disconnect_alert() {
            return SessionState::DisconnectAlert;
        }
        if self.is_in_session() {
            return SessionState::InSession;
        }
        if self.locator.find(SurfaceKind::Dialog, RUNNING_PROBE).is_some() {
            return SessionState::DialogActive;
        }
        if self.locator.find(SurfaceKind::Main, RUNNING_PROBE).is_some() {
            return SessionState::Idle;
        }
        SessionState::NotRunning
    }

    pub fn meeting_health(&self) -> MeetingHealth {
        let Some(handle) = self.locator.find(SurfaceKind::InSession, IN_SESSION_PROBE) else {
            return MeetingHealth::Absent;
        };
        let confirmed = MUTE_LABELS.iter().chain(LEAVE_LABELS.iter()).any(|label| {
            let query = ControlQuery::button(label)
                .containing()
                .with_probe(Duration::from_millis(500));
            handle.surface().exists(&query)
        });
        if confirmed {
            MeetingHealth::Confirmed
        } else {
            MeetingHealth::WindowOnly
        }
    }
}

//! Join workflow.
//!
//! Eleven steps, strictly ordered:
//!
//! | # | Step            | Required | Skipped when          |
//! |---|-----------------|----------|-----------------------|
//! | 1 | Launch          | yes      |                       |
//! | 2 | JoinClick       | yes      |                       |
//! | 3 | IDEntry         | yes      |                       |
//! | 4 | AudioToggle     | no       | `no_audio` is false   |
//! | 5 | JoinConfirm     | yes      |                       |
//! | 6 | PasswordEntry   | yes      | password is empty     |
//! | 7 | PasswordConfirm | yes      | password is empty     |
//! | 8 | ConnectionWait  | yes      |                       |
//! | 9 | WindowMaximize  | no       | `maximize` is false   |
//! | 10| ViewModeSwitch  | no       |                       |
//! | 11| TabActivate     | no       |                       |

use std::time::Duration;

use crate::clock;
use crate::config::{AttendConfig, RetryPolicy};
use crate::detector::Detector;
use crate::error::{UiError, UiResult};
use crate::locator::Locator;
use crate::popups::PopupDismisser;
use crate::process;
use crate::surface::{ControlQuery, SurfaceKind, WindowHandle};
use crate::workflow::{run_steps, Step, WorkflowReport};

const JOIN_LABELS: [&str; 4] = ["Join", "참가", "Join a Meeting", "회의 참가"];
const JOIN_CONFIRM_LABELS: [&str; 4] = ["참가", "Join", "Join Meeting", "회의 참가"];
const PASSWORD_CONFIRM_LABELS: [&str; 4] = ["회의 참가", "Join Meeting", "참가", "Join"];
const AUDIO_LABELS: [&str; 2] = ["오디오에 연결하지 않음", "Don't connect to audio"];
const VIEW_MENU_LABELS: [&str; 2] = ["View", "보기"];

const SURFACE_WAIT: Duration = Duration::from_secs(2);
const BUTTON_PROBE: Duration = Duration::from_secs(1);
const SETTLE: Duration = Duration::from_millis(300);

/// Offset of the meeting tab from the in-session surface's top-left corner.
const TAB_OFFSET: (i32, i32) = (254, 22);
const TAB_CLICKS: u32 = 3;
const TAB_CLICK_INTERVAL: Duration = Duration::from_millis(300);

/// Distance above the bottom screen edge that makes the meeting toolbar show.
const TOOLBAR_REVEAL_OFFSET: i32 = 100;

fn buttons(labels: &[&str]) -> Vec<ControlQuery> {
    labels
        .iter()
        .map(|label| ControlQuery::button(label).with_probe(BUTTON_PROBE))
        .collect()
}

/// Moves the pointer near the bottom centre of the screen so the meeting
/// toolbar slides in.
pub(crate) fn reveal_toolbar(locator: &Locator<'_>) {
    let desktop = locator.desktop();
    let (width, height) = desktop.screen_size();
    if let Err(err) = desktop.move_pointer(width / 2, height - TOOLBAR_REVEAL_OFFSET) {
        tracing::debug!(error = %err, "Could not move pointer to reveal toolbar");
    }
    locator.clock().sleep(SETTLE);
}

/// Brings the meeting window forward and maximizes it: hotkey first, then
/// the window's own maximize when the hotkey did not stick.
pub fn maximize_meeting_window(locator: &Locator<'_>) -> UiResult<String> {
    let meeting = locator
        .find(SurfaceKind::InSession, SURFACE_WAIT)
        .ok_or_else(|| UiError::absent("meeting window"))?;
    let surface = meeting.surface();

    if let Err(err) = surface.focus() {
        tracing::debug!(error = %err, "Focus failed; maximizing anyway");
    }
    locator.clock().sleep(SETTLE);

    if surface.is_maximized() {
        return Ok("already maximized".to_string());
    }
    match locator.desktop().maximize_hotkey() {
        Ok(()) => {
            locator.clock().sleep(SETTLE);
            if surface.is_maximized() {
                return Ok("maximized via hotkey".to_string());
            }
        }
        Err(err) => tracing::debug!(error = %err, "Maximize hotkey failed"),
    }

    surface.maximize()?;
    locator.clock().sleep(SETTLE);
    Ok("maximized directly".to_string())
}

/// Triple-clicks the meeting tab of the in-session surface (brings the
/// meeting view back when a share has taken over), then parks the pointer in
/// the bottom-left corner so the toolbar hides again.
pub fn activate_tab(locator: &Locator<'_>) -> UiResult<String> {
    let meeting = locator
        .find(SurfaceKind::InSession, SURFACE_WAIT)
        .ok_or_else(|| UiError::absent("meeting window"))?;
    let bounds = meeting.surface().bounds()?;
    let (x, y) = bounds.offset(TAB_OFFSET.0, TAB_OFFSET.1);

    let desktop = locator.desktop();
    desktop.click_at(x, y, TAB_CLICKS, TAB_CLICK_INTERVAL)?;
    locator.clock().sleep(SETTLE);

    let (_, height) = desktop.screen_size();
    desktop.move_pointer(1, height - 1)?;
    Ok(format!("clicked meeting tab at ({}, {})", x, y))
}

pub struct JoinWorkflow<'a> {
    config: &'a AttendConfig,
    locator: Locator<'a>,
}

impl<'a> JoinWorkflow<'a> {
    pub fn new(config: &'a AttendConfig, locator: Locator<'a>) -> Self {
        Self { config, locator }
    }

    pub fn run(&self) -> WorkflowReport {
        tracing::info!(meeting_id = %self.config.meeting.id, "Joining meeting");
        let report = run_steps(
            self.steps(),
            self.locator.clock(),
            self.config.timing.step_delay(),
        );
        if report.success {
            tracing::info!("Joined meeting");
        } else {
            tracing::error!(outcome = %report.summary(), "Join failed");
        }
        report
    }

    pub fn steps(&self) -> Vec<Step<'_>> {
        let meeting = &self.config.meeting;
        let window = &self.config.window;
        vec![
            Step::required(1, "Launch", || self.launch()),
            Step::required(2, "JoinClick", || self.click_join()),
            Step::required(3, "IDEntry", || self.enter_id()),
            Step::optional(4, "AudioToggle", || self.toggle_audio())
                .skip_when(!meeting.no_audio, "audio connection requested"),
            Step::required(5, "JoinConfirm", || self.confirm_join()),
            Step::required(6, "PasswordEntry", || self.enter_password())
                .skip_when(!self.config.has_password(), "no password configured"),
            Step::required(7, "PasswordConfirm", || self.confirm_password())
                .skip_when(!self.config.has_password(), "no password configured"),
            Step::required(8, "ConnectionWait", || self.wait_for_connection()),
            Step::optional(9, "WindowMaximize", || maximize_meeting_window(&self.locator))
                .skip_when(!window.maximize, "maximize disabled"),
            Step::optional(10, "ViewModeSwitch", || self.switch_view_mode()),
            Step::optional(11, "TabActivate", || activate_tab(&self.locator)),
        ]
    }

    fn detector(&self) -> Detector<'a> {
        Detector::new(self.locator)
    }

    fn poll_surface(&self, kind: SurfaceKind, policy: RetryPolicy) -> Option<WindowHandle> {
        clock::poll(self.locator.clock(), policy, |_| {
            self.locator.find(kind, Duration::ZERO)
        })
    }

    fn require(&self, kind: SurfaceKind) -> UiResult<WindowHandle> {
        self.locator
            .find(kind, SURFACE_WAIT)
            .ok_or_else(|| UiError::absent(format!("{} surface", kind)))
    }

    fn launch(&self) -> UiResult<String> {
        if self.detector().is_running() {
            return Ok("client already running".to_string());
        }

        let timing = &self.config.timing;
        let desktop = self.locator.desktop();
        let mut launched = None;
        for target in process::launch_candidates(&self.config.client) {
            match desktop.launch(&target) {
                Ok(()) => {
                    launched = Some(target);
                    break;
                }
                Err(err) => tracing::warn!(launch_target = %target, error = %err, "Launch attempt failed"),
            }
        }
        let Some(target) = launched else {
            return Err(UiError::action_failed("no launch method succeeded"));
        };
        tracing::info!(launch_target = %target, "Client launched; waiting for main window");

        self.poll_surface(SurfaceKind::Main, timing.launch_policy())
            .map(|_| format!("started from {}", target))
            .ok_or(UiError::Timeout {
                what: "main window".to_string(),
                secs: timing.launch_wait,
            })
    }

    fn click_join(&self) -> UiResult<String> {
        let main = self.require(SurfaceKind::Main)?;
        main.click_first(buttons(&JOIN_LABELS))
            .map(|label| format!("clicked '{}'", label))
            .ok_or_else(|| UiError::absent("join button"))
    }

    fn enter_id(&self) -> UiResult<String> {
        let id = self.config.meeting.id.trim();
        if id.is_empty() {
            return Err(UiError::action_failed("no meeting id configured"));
        }

        let timing = &self.config.timing;
        let dialog = self
            .poll_surface(SurfaceKind::Dialog, timing.dialog_policy())
            .ok_or(UiError::Timeout {
                what: "join dialog".to_string(),
                secs: timing.dialog_wait,
            })?;
        dialog.surface().type_into_entry(id, true)?;
        Ok(format!("entered meeting id {}", id))
    }

    fn toggle_audio(&self) -> UiResult<String> {
        let dialog = self.require(SurfaceKind::Dialog)?;
        let surface = dialog.surface();
        let query = AUDIO_LABELS
            .into_iter()
            .map(|label| ControlQuery::checkbox(label).with_probe(BUTTON_PROBE))
            .find(|query| surface.exists(query))
            .ok_or_else(|| UiError::absent("audio checkbox"))?;

        if surface.is_checked(&query)? {
            return Ok("audio already disabled".to_string());
        }
        surface.click_control(&query)?;
        Ok("audio disabled".to_string())
    }

    fn confirm_join(&self) -> UiResult<String> {
        let dialog = self.require(SurfaceKind::Dialog)?;
        dialog
            .click_first(buttons(&JOIN_CONFIRM_LABELS))
            .map(|label| format!("clicked '{}'", label))
            .ok_or_else(|| UiError::absent("join confirm button"))
    }

    fn enter_password(&self) -> UiResult<String> {
        let timing = &self.config.timing;
        self.locator.clock().sleep(timing.password_wait());

        let dialog = self
            .poll_surface(SurfaceKind::Dialog, timing.dialog_policy())
            .ok_or_else(|| UiError::absent("password dialog"))?;
        dialog
            .surface()
            .type_into_entry(&self.config.meeting.password, true)?;
        Ok("entered password".to_string())
    }

    fn confirm_password(&self) -> UiResult<String> {
        let dialog = self.require(SurfaceKind::Dialog)?;
        dialog
            .click_first(buttons(&PASSWORD_CONFIRM_LABELS))
            .map(|label| format!("clicked '{}'", label))
            .ok_or_else(|| UiError::absent("password confirm button"))
    }

    fn wait_for_connection(&self) -> UiResult<String> {
        let timing = &self.config.timing;
        let dismisser = PopupDismisser::new(self.locator);
        let detector = self.detector();

        clock::poll(self.locator.clock(), timing.connect_policy(), |attempt| {
            dismisser.dismiss_notices();
            if detector.is_in_session() {
                return Some(attempt + 1);
            }
            if (attempt + 1) % 10 == 0 {
                tracing::info!(attempts = attempt + 1, "Still waiting for the meeting to connect");
            }
            None
        })
        .map(|attempts| format!("connected after {} checks", attempts))
        .ok_or(UiError::Timeout {
            what: "meeting to connect".to_string(),
            secs: timing.connect_wait,
        })
    }

    fn switch_view_mode(&self) -> UiResult<String> {
        let mode = self.config.window.view_mode;
        let labels = mode.labels();
        let Some(meeting) = self.locator.find(SurfaceKind::InSession, SURFACE_WAIT) else {
            return Ok("no meeting window; view unchanged".to_string());
        };

        reveal_toolbar(&self.locator);

        let direct = buttons(labels);
        if let Some(label) = meeting.click_first(direct.clone()) {
            return Ok(format!("clicked '{}'", label));
        }
        if direct.iter().any(|query| meeting.surface().exists(query)) {
            return Err(UiError::action_failed(format!(
                "view control '{}' did not respond",
                labels[0]
            )));
        }

        let Some(menu) = meeting.click_first(buttons(&VIEW_MENU_LABELS)) else {
            return Ok(format!("no view control; assuming {}", labels[0]));
        };
        self.locator.clock().sleep(SETTLE);

        // The opened menu is its own top-level window.
        let items = || {
            labels
                .iter()
                .map(|label| ControlQuery::menu_item(label).with_probe(BUTTON_PROBE))
        };
        let picked = std::iter::once(meeting)
            .chain(self.locator.top_level())
            .find_map(|handle| handle.click_first(items()));
        match picked {
            Some(label) => Ok(format!("picked '{}' from '{}' menu", label, menu)),
            None => Ok(format!("'{}' menu had no {} entry", menu, labels[0])),
        }
    }
}

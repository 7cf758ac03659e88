//! Leave workflow.
//!
//! Every step is best-effort. A client that is not running has nothing to
//! leave, so the workflow reports success without touching anything.

use std::time::Duration;

use crate::config::AttendConfig;
use crate::detector::Detector;
use crate::error::{UiError, UiResult};
use crate::join::reveal_toolbar;
use crate::locator::Locator;
use crate::surface::{ControlQuery, SurfaceKind, WindowHandle};
use crate::workflow::{run_steps, Step, StepRecord, StepResult, WorkflowReport};

const LOCATE_TIMEOUT: Duration = Duration::from_secs(2);
const LOCATE_ORDER: [SurfaceKind; 3] = [SurfaceKind::InSession, SurfaceKind::Dialog, SurfaceKind::Main];

/// Toolbar controls that start leaving; matched as substrings.
const LEAVE_LABELS: [&str; 6] = ["Leave", "나가기", "End", "종료", "Leave Meeting", "회의 나가기"];
const LEAVE_ATTEMPTS: u32 = 3;

/// Buttons of the confirmation prompt; matched exactly.
const CONFIRM_LABELS: [&str; 6] = [
    "Leave Meeting",
    "회의 나가기",
    "Leave",
    "나가기",
    "End Meeting",
    "회의 종료",
];
const CONFIRM_ROUNDS: u32 = 5;
const CONFIRM_PROBE: Duration = Duration::from_millis(500);
const ROUND_PAUSE: Duration = Duration::from_millis(300);

const CLOSE_GRACE: Duration = Duration::from_secs(2);
const CLOSE_SETTLE: Duration = Duration::from_secs(1);

pub struct LeaveWorkflow<'a> {
    config: &'a AttendConfig,
    locator: Locator<'a>,
}

impl<'a> LeaveWorkflow<'a> {
    pub fn new(config: &'a AttendConfig, locator: Locator<'a>) -> Self {
        Self { config, locator }
    }

    pub fn run(&self) -> WorkflowReport {
        let Some(surface) = self.locator.find_any(&LOCATE_ORDER, LOCATE_TIMEOUT) else {
            tracing::info!("Client is not running; nothing to leave");
            return WorkflowReport {
                results: vec![StepRecord {
                    ordinal: 1,
                    name: "LocateSurface",
                    result: StepResult::ok("client not running"),
                }],
                success: true,
                failed_step: None,
            };
        };
        tracing::info!(surface = %surface.title(), "Leaving meeting");

        let in_session = Detector::new(self.locator).is_in_session();
        let title = surface.title().to_string();
        let steps = vec![
            Step::optional(1, "LocateSurface", move || Ok(format!("found '{}'", title))),
            Step::optional(2, "LeaveClick", || self.click_leave(&surface))
                .skip_when(!in_session, "not in a meeting"),
            Step::optional(3, "ConfirmClick", || self.confirm())
                .skip_when(!in_session, "not in a meeting"),
            Step::optional(4, "AppTerminate", || self.terminate())
                .skip_when(!self.config.leave.close_app, "keeping the client open"),
        ];
        let report = run_steps(steps, self.locator.clock(), self.config.timing.step_delay());
        tracing::info!(outcome = %report.summary(), "Leave finished");
        report
    }

    fn click_leave(&self, located: &WindowHandle) -> UiResult<String> {
        let queries = || {
            LEAVE_LABELS
                .into_iter()
                .map(|label| ControlQuery::button(label).containing())
        };

        for attempt in 0..LEAVE_ATTEMPTS {
            reveal_toolbar(&self.locator);
            if let Some(label) = located.click_first(queries()) {
                return Ok(format!("clicked '{}'", label));
            }
            let others = self.locator.top_level();
            if let Some(label) = others.iter().find_map(|handle| handle.click_first(queries())) {
                return Ok(format!("clicked '{}'", label));
            }
            tracing::debug!(attempt, "No leave control visible yet");
        }

        self.locator.desktop().press_default_accept()?;
        Ok("no leave control; pressed default accept".to_string())
    }

    fn confirm(&self) -> UiResult<String> {
        let clock = self.locator.clock();
        clock.sleep(Duration::from_millis(500));

        // Label priority wins over window order, so the prompt's "Leave
        // Meeting" is clicked before the toolbar's own "Leave".
        for round in 0..CONFIRM_ROUNDS {
            let windows = self.locator.top_level();
            let clicked = CONFIRM_LABELS.into_iter().find_map(|label| {
                let query = ControlQuery::button(label).with_probe(CONFIRM_PROBE);
                windows
                    .iter()
                    .find_map(|handle| handle.click_first([query.clone()]))
            });
            if let Some(label) = clicked {
                tracing::info!(label = %label, round, "Confirmed leave");
                return Ok(format!("clicked '{}'", label));
            }
            clock.sleep(ROUND_PAUSE);
        }

        self.locator.desktop().press_default_accept()?;
        Ok("no confirm prompt; pressed default accept".to_string())
    }

    fn terminate(&self) -> UiResult<String> {
        let clock = self.locator.clock();
        clock.sleep(CLOSE_GRACE);

        if let Some(main) = self.locator.find(SurfaceKind::Main, LOCATE_TIMEOUT) {
            match main.surface().close() {
                Ok(()) => clock.sleep(CLOSE_SETTLE),
                Err(err) => tracing::debug!(error = %err, "Graceful close failed"),
            }
        }

        let process_name = &self.config.client.process_name;
        let killed = self
            .locator
            .desktop()
            .terminate(process_name)
            .map_err(|err| UiError::action_failed(format!("terminate {}: {}", process_name, err)))?;
        Ok(format!("terminated {} {} process(es)", killed, process_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{meeting_window, Action, FakeClock, FakeDesktop, FakeWindow, World};

    fn leave_prompt() -> FakeWindow {
        FakeWindow::popup("Leave meeting?").with_button("Leave Meeting")
    }

    fn desktop_in_meeting(clock: &FakeClock) -> FakeDesktop {
        let desktop = FakeDesktop::new(clock);
        desktop.add_window(FakeWindow::surface(SurfaceKind::Main));
        desktop.add_window(meeting_window());
        desktop.on_click(Some(SurfaceKind::InSession), "Leave", |world: &mut World| {
            world.add_window(leave_prompt());
        });
        desktop.on_click(None, "Leave Meeting", |world: &mut World| {
            world.remove_titled("Leave meeting?");
            world.remove_kind(SurfaceKind::InSession);
        });
        desktop
    }

    #[test]
    fn nothing_running_is_success_without_clicks() {
        let clock = FakeClock::new();
        let desktop = FakeDesktop::new(&clock);
        let config = AttendConfig::default();

        let report = LeaveWorkflow::new(&config, Locator::new(&desktop, &clock)).run();
        assert!(report.success);
        assert!(desktop.actions().is_empty());
    }

    #[test]
    fn leaves_and_closes_client() {
        let clock = FakeClock::new();
        let desktop = desktop_in_meeting(&clock);
        let config = AttendConfig::default();

        let report = LeaveWorkflow::new(&config, Locator::new(&desktop, &clock)).run();
        assert!(report.success);
        assert_eq!(
            desktop.clicked_labels(),
            vec!["Leave".to_string(), "Leave Meeting".to_string()]
        );
        let actions = desktop.actions();
        assert!(actions.contains(&Action::Closed("Zoom Workplace".to_string())));
        assert!(actions.contains(&Action::Terminated("Zoom.exe".to_string())));
        assert_eq!(desktop.window_count(), 0);
    }

    #[test]
    fn keep_app_skips_termination() {
        let clock = FakeClock::new();
        let desktop = desktop_in_meeting(&clock);
        let mut config = AttendConfig::default();
        config.leave.close_app = false;

        let report = LeaveWorkflow::new(&config, Locator::new(&desktop, &clock)).run();
        assert!(report.success);
        assert!(report.result(4).expect("recorded").skipped);
        assert!(desktop.has_kind(SurfaceKind::Main));
        assert!(!desktop.has_kind(SurfaceKind::InSession));
    }

    #[test]
    fn idle_client_is_only_closed() {
        let clock = FakeClock::new();
        let desktop = FakeDesktop::new(&clock);
        desktop.add_window(FakeWindow::surface(SurfaceKind::Main).with_button("Join"));
        let config = AttendConfig::default();

        let report = LeaveWorkflow::new(&config, Locator::new(&desktop, &clock)).run();
        assert!(report.success);
        assert!(!report.executed(2));
        assert!(!report.executed(3));
        assert!(desktop.clicked_labels().is_empty());
        assert!(desktop
            .actions()
            .contains(&Action::Terminated("Zoom.exe".to_string())));
    }

    #[test]
    fn missing_confirm_prompt_falls_back_to_default_accept() {
        let clock = FakeClock::new();
        let desktop = FakeDesktop::new(&clock);
        desktop.add_window(meeting_window());
        desktop.on_click(Some(SurfaceKind::InSession), "Leave", |world: &mut World| {
            world.remove_kind(SurfaceKind::InSession);
        });
        let mut config = AttendConfig::default();
        config.leave.close_app = false;

        let report = LeaveWorkflow::new(&config, Locator::new(&desktop, &clock)).run();
        assert!(report.success);
        assert!(desktop.actions().contains(&Action::DefaultAccept));
    }

    #[test]
    fn leave_without_toolbar_control_presses_default_accept() {
        let clock = FakeClock::new();
        let desktop = FakeDesktop::new(&clock);
        desktop.add_window(FakeWindow::surface(SurfaceKind::InSession).with_button("Mute"));
        let mut config = AttendConfig::default();
        config.leave.close_app = false;

        let report = LeaveWorkflow::new(&config, Locator::new(&desktop, &clock)).run();
        assert!(report.success);
        let leave_click = report.result(2).expect("recorded");
        assert!(leave_click.success);
        assert!(leave_click.message.contains("default accept"), "{}", leave_click.message);
        assert!(desktop.clicked_labels().is_empty());
        let accepts = desktop
            .actions()
            .into_iter()
            .filter(|action| *action == Action::DefaultAccept)
            .count();
        assert_eq!(accepts, 2);
    }

    #[test]
    fn confirm_ignores_other_apps() {
        let clock = FakeClock::new();
        let desktop = FakeDesktop::new(&clock);
        desktop.add_window(
            FakeWindow::foreign("Webinar - Browser", "Chrome_WidgetWin_1").with_button("Leave Meeting"),
        );
        desktop.add_window(FakeWindow::surface(SurfaceKind::Main));
        desktop.add_window(meeting_window());
        desktop.on_click(Some(SurfaceKind::InSession), "Leave", |world: &mut World| {
            world.add_window(leave_prompt());
        });
        desktop.on_click(None, "Leave Meeting", |world: &mut World| {
            world.remove_titled("Leave meeting?");
            world.remove_kind(SurfaceKind::InSession);
        });
        let config = AttendConfig::default();

        let report = LeaveWorkflow::new(&config, Locator::new(&desktop, &clock)).run();
        assert!(report.success);
        assert!(desktop.actions().contains(&Action::Click {
            surface: "Leave meeting?".to_string(),
            label: "Leave Meeting".to_string(),
        }));
        assert!(!desktop
            .actions()
            .iter()
            .any(|action| matches!(action, Action::Click { surface, .. } if surface == "Webinar - Browser")));
        assert!(desktop.has_titled("Webinar - Browser"));
        assert_eq!(desktop.window_count(), 1);
    }
}

//! Recovery orchestrator.
//!
//! One idempotent call that answers "is the session active and in the
//! foreground", repairing it first when it is not:
//!
//! ```text
//! disconnect alert     -> dismiss it, rejoin
//! not in session       -> rejoin
//! otherwise            -> healthy
//! rejoin               -> dismiss popups, close client windows,
//!                         terminate the process, run the join workflow
//! always               -> maximize the meeting window, activate its tab
//! ```
//!
//! A healthy session only gets the final activation, so calling this on
//! every capture tick is cheap and safe.

use std::time::Duration;

use crate::backend::Desktop;
use crate::clock::Clock;
use crate::config::AttendConfig;
use crate::detector::Detector;
use crate::join::{activate_tab, maximize_meeting_window, JoinWorkflow};
use crate::locator::Locator;
use crate::popups::{PopupDismisser, DISMISS_ROUNDS};

const ALERT_SETTLE: Duration = Duration::from_millis(500);
const DISMISS_SETTLE: Duration = Duration::from_millis(300);
const CLEANUP_SETTLE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Session was already active; nothing was rejoined.
    Healthy,
    /// Session was lost and the join workflow brought it back.
    Rejoined,
    /// Rejoin was needed and the join workflow aborted at this step.
    RejoinFailed { failed_step: Option<(u8, &'static str)> },
}

impl RecoveryOutcome {
    pub fn is_active(&self) -> bool {
        !matches!(self, RecoveryOutcome::RejoinFailed { .. })
    }
}

/// Whether a window class belongs to the meeting client.
pub fn is_client_class(class_name: &str) -> bool {
    class_name.to_lowercase().contains("zoom") || class_name.starts_with("ZP")
}

pub struct Recovery<'a> {
    config: &'a AttendConfig,
    locator: Locator<'a>,
}

impl<'a> Recovery<'a> {
    pub fn new(config: &'a AttendConfig, locator: Locator<'a>) -> Self {
        Self { config, locator }
    }

    pub fn run(&self) -> RecoveryOutcome {
        let detector = Detector::new(self.locator);
        let dismisser = PopupDismisser::new(self.locator);

        let rejoin_needed = if detector.check_disconnect_alert() {
            tracing::warn!("Disconnect alert on screen; dismissing and rejoining");
            dismisser.dismiss_all(DISMISS_ROUNDS);
            self.locator.clock().sleep(ALERT_SETTLE);
            true
        } else if !detector.is_in_session() {
            tracing::warn!("Not in a meeting; rejoining");
            true
        } else {
            tracing::info!("Meeting is active");
            false
        };

        if rejoin_needed {
            self.cleanup(&dismisser);
            let report = JoinWorkflow::new(self.config, self.locator).run();
            if !report.success {
                tracing::error!(outcome = %report.summary(), "Rejoin failed");
                return RecoveryOutcome::RejoinFailed {
                    failed_step: report.failed_step,
                };
            }
            tracing::info!("Rejoined meeting");
        }

        self.bring_forward();

        if rejoin_needed {
            RecoveryOutcome::Rejoined
        } else {
            RecoveryOutcome::Healthy
        }
    }

    /// Returns the client to a clean "not running" state.
    fn cleanup(&self, dismisser: &PopupDismisser<'_>) {
        let clock = self.locator.clock();
        for _ in 0..DISMISS_ROUNDS {
            dismisser.dismiss_all(1);
            clock.sleep(DISMISS_SETTLE);
        }

        let mut closed = 0;
        for handle in self.locator.top_level() {
            let class_name = handle.surface().class_name();
            if !is_client_class(&class_name) {
                continue;
            }
            match handle.surface().close() {
                Ok(()) => closed += 1,
                Err(err) => {
                    tracing::debug!(surface = %handle.title(), class_name = %class_name, error = %err, "Close failed")
                }
            }
        }
        clock.sleep(CLEANUP_SETTLE);

        let process_name = &self.config.client.process_name;
        match self.locator.desktop().terminate(process_name) {
            Ok(killed) => {
                tracing::info!(closed, killed, process = %process_name, "Client cleaned up")
            }
            Err(err) => tracing::warn!(process = %process_name, error = %err, "Terminate failed"),
        }
        clock.sleep(CLEANUP_SETTLE);
    }

    fn bring_forward(&self) {
        if let Err(err) = maximize_meeting_window(&self.locator) {
            tracing::debug!(error = %err, "Meeting window activation skipped");
        }
        if let Err(err) = activate_tab(&self.locator) {
            tracing::debug!(error = %err, "Meeting tab activation skipped");
        }
    }
}

/// Makes sure the machine is in the configured meeting. Returns whether a
/// session is active afterwards.
pub fn ensure_session(config: &AttendConfig, desktop: &dyn Desktop, clock: &dyn Clock) -> bool {
    let outcome = Recovery::new(config, Locator::new(desktop, clock)).run();
    tracing::debug!(?outcome, "Recovery finished");
    outcome.is_active()
}

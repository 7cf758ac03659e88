//! Popup dismissal.
//!
//! Dismissing one popup can reveal another stacked behind it, so every pass
//! runs for a bounded number of rounds. Both passes are idempotent: no popup
//! at all is a successful outcome.

use std::time::Duration;

use crate::locator::Locator;
use crate::surface::{ControlQuery, SurfaceKind, WindowHandle};

pub const DISMISS_ROUNDS: u32 = 3;
const DISMISS_PROBE: Duration = Duration::from_millis(300);
const NOTICE_PROBE: Duration = Duration::from_millis(500);
const SETTLE: Duration = Duration::from_millis(500);

/// Labels that close a connection-lost or end-of-meeting notice, in the
/// order they are tried.
pub const DISMISS_LABELS: [&str; 12] = [
    "확인",
    "닫기",
    "나가기",
    "회의 나가기",
    "종료",
    "OK",
    "Close",
    "Leave",
    "Leave Meeting",
    "End",
    "Got it",
    "알겠습니다",
];

/// Acknowledgement-only labels for notices that show up while a meeting is
/// live (recording started, and the like).
pub const ACK_LABELS: [&str; 4] = ["확인", "OK", "Got it", "알겠습니다"];

const NOTICE_TITLE_MARKERS: [&str; 2] = ["녹화", "recording"];

pub struct PopupDismisser<'a> {
    locator: Locator<'a>,
}

impl<'a> PopupDismisser<'a> {
    pub fn new(locator: Locator<'a>) -> Self {
        Self { locator }
    }

    /// Clicks one dismiss control on `handle`, exact labels before substring
    /// matches.
    fn dismiss_on(&self, handle: &WindowHandle) -> Option<String> {
        let exact = DISMISS_LABELS
            .into_iter()
            .map(|label| ControlQuery::button(label).with_probe(DISMISS_PROBE));
        let partial = DISMISS_LABELS.into_iter().map(|label| {
            ControlQuery::button(label)
                .containing()
                .with_probe(DISMISS_PROBE)
        });
        handle.click_first(exact.chain(partial))
    }

    /// Runs up to `rounds` sweeps over every top-level window. Returns
    /// whether anything was dismissed.
    pub fn dismiss_all(&self, rounds: u32) -> bool {
        let mut dismissed = false;
        for round in 0..rounds {
            let mut this_round = 0;
            for handle in self.locator.top_level() {
                if let Some(label) = self.dismiss_on(&handle) {
                    tracing::info!(surface = %handle.title(), label = %label, round, "Dismissed popup");
                    this_round += 1;
                    self.locator.clock().sleep(SETTLE);
                }
            }
            if this_round == 0 {
                break;
            }
            dismissed = true;
        }
        dismissed
    }

    /// Lighter pass used while a meeting connects: only recording notices
    /// and acknowledgement buttons on the meeting window. Never clicks a
    /// leave control.
    pub fn dismiss_notices(&self) -> bool {
        let ack = || {
            ACK_LABELS
                .into_iter()
                .map(|label| ControlQuery::button(label).with_probe(NOTICE_PROBE))
        };

        for handle in self.locator.top_level() {
            let title = handle.title().to_lowercase();
            if !NOTICE_TITLE_MARKERS
                .iter()
                .any(|marker| title.contains(marker))
            {
                continue;
            }
            if let Some(label) = handle.click_first(ack()) {
                tracing::info!(surface = %handle.title(), label = %label, "Dismissed recording notice");
                return true;
            }
        }

        if let Some(meeting) = self.locator.find(SurfaceKind::InSession, Duration::from_secs(1)) {
            if let Some(label) = meeting.click_first(ack()) {
                tracing::info!(label = %label, "Dismissed notice on meeting window");
                self.locator.clock().sleep(Duration::from_millis(300));
                return true;
            }
        }

        false
    }
}

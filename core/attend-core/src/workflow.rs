//! Declarative step tables and the executor that drives them.
//!
//! A workflow is an ordered list of [`Step`]s. The executor runs them in
//! order, sleeps `step_delay` between executed steps, and stops at the first
//! required step that fails. Optional failures are logged and the run
//! continues. Nothing here returns an error: every outcome is recorded in the
//! [`WorkflowReport`].

use std::fmt;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::UiResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub success: bool,
    pub skipped: bool,
    pub message: String,
}

impl StepResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            skipped: false,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: false,
            message: message.into(),
        }
    }

    /// Skipped steps count as successful.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            skipped: true,
            message: reason.into(),
        }
    }
}

impl From<UiResult<String>> for StepResult {
    fn from(result: UiResult<String>) -> Self {
        match result {
            Ok(message) => StepResult::ok(message),
            Err(err) => StepResult::failed(err.to_string()),
        }
    }
}

type Action<'a> = Box<dyn FnMut() -> UiResult<String> + 'a>;

pub struct Step<'a> {
    pub ordinal: u8,
    pub name: &'static str,
    pub required: bool,
    skip: Option<&'static str>,
    action: Action<'a>,
}

impl<'a> Step<'a> {
    pub fn required(
        ordinal: u8,
        name: &'static str,
        action: impl FnMut() -> UiResult<String> + 'a,
    ) -> Self {
        Self {
            ordinal,
            name,
            required: true,
            skip: None,
            action: Box::new(action),
        }
    }

    pub fn optional(
        ordinal: u8,
        name: &'static str,
        action: impl FnMut() -> UiResult<String> + 'a,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(ordinal, name, action)
        }
    }

    /// Marks the step as skipped when `condition` holds.
    pub fn skip_when(mut self, condition: bool, reason: &'static str) -> Self {
        if condition {
            self.skip = Some(reason);
        }
        self
    }
}

impl fmt::Debug for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("ordinal", &self.ordinal)
            .field("name", &self.name)
            .field("required", &self.required)
            .field("skip", &self.skip)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub ordinal: u8,
    pub name: &'static str,
    pub result: StepResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowReport {
    pub results: Vec<StepRecord>,
    pub success: bool,
    /// Ordinal and name of the required step that aborted the run.
    pub failed_step: Option<(u8, &'static str)>,
}

impl WorkflowReport {
    pub fn result(&self, ordinal: u8) -> Option<&StepResult> {
        self.results
            .iter()
            .find(|record| record.ordinal == ordinal)
            .map(|record| &record.result)
    }

    /// Whether the step's action actually ran (not skipped, not unreached).
    pub fn executed(&self, ordinal: u8) -> bool {
        self.result(ordinal).is_some_and(|result| !result.skipped)
    }

    pub fn summary(&self) -> String {
        match self.failed_step {
            None => format!("completed {} steps", self.results.len()),
            Some((ordinal, name)) => format!("failed at step {} ({})", ordinal, name),
        }
    }
}

pub fn run_steps(steps: Vec<Step<'_>>, clock: &dyn Clock, step_delay: Duration) -> WorkflowReport {
    let mut report = WorkflowReport {
        success: true,
        ..WorkflowReport::default()
    };
    let mut executed_any = false;

    for mut step in steps {
        if let Some(reason) = step.skip {
            tracing::debug!(step = step.name, ordinal = step.ordinal, reason, "Step skipped");
            report.results.push(StepRecord {
                ordinal: step.ordinal,
                name: step.name,
                result: StepResult::skipped(reason),
            });
            continue;
        }

        if executed_any {
            clock.sleep(step_delay);
        }
        executed_any = true;

        tracing::info!(step = step.name, ordinal = step.ordinal, "Running step");
        let started = clock.now();
        let result = StepResult::from((step.action)());
        let elapsed_secs = clock.now().saturating_duration_since(started).as_secs_f64();

        if result.success {
            tracing::info!(
                step = step.name,
                ordinal = step.ordinal,
                elapsed_secs,
                message = %result.message,
                "Step succeeded"
            );
        } else if step.required {
            tracing::error!(
                step = step.name,
                ordinal = step.ordinal,
                elapsed_secs,
                message = %result.message,
                "Required step failed; aborting"
            );
        } else {
            tracing::warn!(
                step = step.name,
                ordinal = step.ordinal,
                elapsed_secs,
                message = %result.message,
                "Optional step failed; continuing"
            );
        }

        let abort = !result.success && step.required;
        report.results.push(StepRecord {
            ordinal: step.ordinal,
            name: step.name,
            result,
        });
        if abort {
            report.success = false;
            report.failed_step = Some((step.ordinal, step.name));
            break;
        }
    }

    report
}

//! Subcommand implementations.
//!
//! Each command returns whether it achieved its goal; `main` maps that to the
//! exit code. Workflows that touch the desktop run under the run lock.

use std::path::{Path, PathBuf};

use attend_core::workflow::WorkflowReport;
use attend_core::{
    config_path, ensure_session, load_config, platform_desktop, state_dir, AttendConfig,
    AttendError, Desktop, Detector, JoinWorkflow, LeaveWorkflow, Locator, MeetingHealth, RunLock,
    SystemClock,
};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] AttendError),

    #[error("No meeting id configured; set [meeting] id in {}", path.display())]
    MissingMeetingId { path: PathBuf },
}

pub struct Context {
    config: AttendConfig,
    config_path: PathBuf,
    state_dir: PathBuf,
}

impl Context {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, CliError> {
        let config_path = config_path(explicit)?;
        let config = load_config(&config_path)?;
        tracing::debug!(path = %config_path.display(), "Configuration loaded");
        Ok(Self {
            config,
            config_path,
            state_dir: state_dir()?,
        })
    }

    fn require_meeting_id(&self) -> Result<(), CliError> {
        if self.config.meeting.id.trim().is_empty() {
            return Err(CliError::MissingMeetingId {
                path: self.config_path.clone(),
            });
        }
        Ok(())
    }

    fn lock(&self) -> Result<RunLock, CliError> {
        Ok(RunLock::try_acquire(&self.state_dir)?)
    }

    fn desktop(&self) -> Box<dyn Desktop> {
        platform_desktop(&self.config)
    }
}

pub fn check(context: &Context, quiet: bool) -> Result<bool, CliError> {
    context.require_meeting_id()?;
    let _lock = context.lock()?;
    let desktop = context.desktop();

    let active = ensure_session(&context.config, desktop.as_ref(), &SystemClock);
    if !quiet {
        println!("{}", if active { "Meeting active" } else { "Meeting not active" });
    }
    Ok(active)
}

pub fn join(context: &Context, quiet: bool) -> Result<bool, CliError> {
    context.require_meeting_id()?;
    let _lock = context.lock()?;
    if !quiet {
        print_summary(&context.config, &context.config_path);
    }

    let desktop = context.desktop();
    let locator = Locator::new(desktop.as_ref(), &SystemClock);
    let report = JoinWorkflow::new(&context.config, locator).run();
    if !quiet {
        print_report(&report);
    }
    Ok(report.success)
}

pub fn leave(context: &Context, quiet: bool, keep: bool) -> Result<bool, CliError> {
    let _lock = context.lock()?;
    let mut config = context.config.clone();
    if keep {
        config.leave.close_app = false;
    }

    let desktop = context.desktop();
    let locator = Locator::new(desktop.as_ref(), &SystemClock);
    let report = LeaveWorkflow::new(&config, locator).run();
    if !quiet {
        print_report(&report);
    }
    Ok(report.success)
}

pub fn status(context: &Context) -> Result<bool, CliError> {
    let desktop = context.desktop();
    let detector = Detector::new(Locator::new(desktop.as_ref(), &SystemClock));

    let state = detector.detect();
    let health = match detector.meeting_health() {
        MeetingHealth::Absent => "no meeting window",
        MeetingHealth::Confirmed => "meeting controls visible",
        MeetingHealth::WindowOnly => "meeting window present, controls hidden",
    };
    println!("State:   {}", state);
    println!("Meeting: {}", health);
    Ok(true)
}

fn print_summary(config: &AttendConfig, path: &Path) {
    println!("Config:    {}", path.display());
    println!("Meeting:   {}", config.meeting.id);
    println!("Password:  {}", config.masked_password());
    println!("No audio:  {}", config.meeting.no_audio);
    println!("Maximize:  {}", config.window.maximize);
    println!("View mode: {:?}", config.window.view_mode);
    println!();
}

fn print_report(report: &WorkflowReport) {
    for record in &report.results {
        let status = if record.result.skipped {
            "skip"
        } else if record.result.success {
            "ok"
        } else {
            "FAIL"
        };
        println!(
            "[{:>2}] {:<16} {:<4} {}",
            record.ordinal, record.name, status, record.result.message
        );
    }
    println!("{}", report.summary());
}

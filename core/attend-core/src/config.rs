//! Configuration loading.
//!
//! The configuration document lives at `~/.attend/config.toml` and is read
//! once per invocation. Every field has a default, so a missing file or a
//! missing section is valid. The loaded value is never mutated afterwards.
//!
//! ```toml
//! [meeting]
//! id = "123 456 7890"
//! password = "secret"
//! no_audio = true
//!
//! [window]
//! maximize = true
//! view_mode = "gallery"
//!
//! [timing]
//! dialog_wait = 10
//! password_wait = 3
//! connect_wait = 30
//! step_delay = 0.5
//!
//! [leave]
//! close_app = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AttendError, Result};

const STATE_DIR_NAME: &str = ".attend";
const CONFIG_FILE_NAME: &str = "config.toml";
pub const CONFIG_ENV_VAR: &str = "ATTEND_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeetingConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub no_audio: bool,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            password: String::new(),
            no_audio: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Gallery,
    Speaker,
}

impl ViewMode {
    /// Control labels that switch the in-session view to this mode.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            ViewMode::Gallery => &["Gallery View", "갤러리 보기", "Gallery"],
            ViewMode::Speaker => &["Speaker View", "발표자 보기", "Speaker"],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    #[serde(default = "default_true")]
    pub maximize: bool,
    #[serde(default)]
    pub view_mode: ViewMode,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            maximize: true,
            view_mode: ViewMode::default(),
        }
    }
}

/// Timing knobs, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_dialog_wait")]
    pub dialog_wait: u64,
    #[serde(default = "default_password_wait")]
    pub password_wait: u64,
    #[serde(default = "default_connect_wait")]
    pub connect_wait: u64,
    #[serde(default = "default_launch_wait")]
    pub launch_wait: u64,
    #[serde(default = "default_step_delay")]
    pub step_delay: f64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            dialog_wait: default_dialog_wait(),
            password_wait: default_password_wait(),
            connect_wait: default_connect_wait(),
            launch_wait: default_launch_wait(),
            step_delay: default_step_delay(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl TimingConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_secs_f64(self.step_delay)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval)
    }

    pub fn dialog_policy(&self) -> RetryPolicy {
        RetryPolicy::within(Duration::from_secs(self.dialog_wait), self.poll_interval())
    }

    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy::within(Duration::from_secs(self.connect_wait), self.poll_interval())
    }

    pub fn launch_policy(&self) -> RetryPolicy {
        RetryPolicy::within(Duration::from_secs(self.launch_wait), self.poll_interval())
    }

    pub fn password_wait(&self) -> Duration {
        Duration::from_secs(self.password_wait)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaveConfig {
    #[serde(default = "default_true")]
    pub close_app: bool,
}

impl Default for LeaveConfig {
    fn default() -> Self {
        Self { close_app: true }
    }
}

/// Where the meeting client lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Explicit executable path, tried before the well-known install paths.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default = "default_process_name")]
    pub process_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            executable: None,
            process_name: default_process_name(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AttendConfig {
    #[serde(default)]
    pub meeting: MeetingConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub leave: LeaveConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

impl AttendConfig {
    /// Rejects non-positive timing values.
    pub fn validate(&self) -> Result<()> {
        let waits = [
            ("timing.dialog_wait", self.timing.dialog_wait),
            ("timing.password_wait", self.timing.password_wait),
            ("timing.connect_wait", self.timing.connect_wait),
            ("timing.launch_wait", self.timing.launch_wait),
        ];
        for (field, value) in waits {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }

        let fractional = [
            ("timing.step_delay", self.timing.step_delay),
            ("timing.poll_interval", self.timing.poll_interval),
        ];
        for (field, value) in fractional {
            if value <= 0.0 || Duration::try_from_secs_f64(value).is_err() {
                return Err(invalid(field, "must be a positive number of seconds"));
            }
        }

        Ok(())
    }

    pub fn has_password(&self) -> bool {
        !self.meeting.password.is_empty()
    }

    /// Password rendered for display: one `*` per character, or `(none)`.
    pub fn masked_password(&self) -> String {
        if self.has_password() {
            "*".repeat(self.meeting.password.chars().count())
        } else {
            "(none)".to_string()
        }
    }
}

/// A bounded poll: `attempts` checks spaced `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    /// Enough attempts to cover `budget` at `interval` spacing (at least one).
    pub fn within(budget: Duration, interval: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            (budget.as_secs_f64() / interval.as_secs_f64()).ceil() as u32
        };
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }
}

fn invalid(field: &str, reason: &str) -> AttendError {
    AttendError::ConfigInvalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn default_true() -> bool {
    true
}

fn default_dialog_wait() -> u64 {
    10
}

fn default_password_wait() -> u64 {
    3
}

fn default_connect_wait() -> u64 {
    30
}

fn default_launch_wait() -> u64 {
    30
}

fn default_step_delay() -> f64 {
    0.5
}

fn default_poll_interval() -> f64 {
    1.0
}

fn default_process_name() -> String {
    "Zoom.exe".to_string()
}

/// Returns the state directory (`~/.attend`).
pub fn state_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(STATE_DIR_NAME))
        .ok_or(AttendError::HomeDirNotFound)
}

/// Resolves the configuration path: explicit argument, then `ATTEND_CONFIG`,
/// then `~/.attend/config.toml`.
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(state_dir()?.join(CONFIG_FILE_NAME))
}

/// Loads the configuration, returning defaults if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<AttendConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No configuration file; using defaults");
        return Ok(AttendConfig::default());
    }

    let content = fs_err::read_to_string(path).map_err(|source| AttendError::Io {
        context: format!("reading {}", path.display()),
        source,
    })?;
    let config = toml::from_str::<AttendConfig>(&content).map_err(|err| {
        AttendError::ConfigMalformed {
            path: path.to_path_buf(),
            details: err.to_string(),
        }
    })?;
    config.validate()?;
    Ok(config)
}

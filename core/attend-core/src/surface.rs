//! Surfaces: the top-level windows of the meeting client.
//!
//! Callers never touch a UI toolkit type. A surface is queried through the
//! `Surface` capability trait (does a control exist, click it, read its text)
//! and each backend implements that trait for its own element type.

use std::fmt;
use std::time::Duration;

use crate::error::UiResult;

/// The three well-known surfaces of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Launcher shown while the client is idle.
    Main,
    /// Meeting id / password entry dialog shown during join.
    Dialog,
    /// Active meeting window.
    InSession,
}

impl SurfaceKind {
    /// Window class the client registers for this surface.
    pub fn class_name(self) -> &'static str {
        match self {
            SurfaceKind::Main => "ZPPTMainFrmWndClassEx",
            SurfaceKind::Dialog => "zWaitingMeetingIDWndClass",
            SurfaceKind::InSession => "ConfMultiTabContentWndClass",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SurfaceKind::Main => "main",
            SurfaceKind::Dialog => "dialog",
            SurfaceKind::InSession => "in-session",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRole {
    Button,
    CheckBox,
    Edit,
    MenuItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    Exact,
    Contains,
}

/// Describes a control to look for inside a surface.
///
/// A query without a label matches the first control of the role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlQuery {
    pub role: ControlRole,
    pub label: Option<String>,
    pub matching: LabelMatch,
    /// How long the backend may wait for the control to appear.
    pub probe: Duration,
}

impl ControlQuery {
    pub const DEFAULT_PROBE: Duration = Duration::from_millis(300);

    fn new(role: ControlRole, label: Option<&str>) -> Self {
        Self {
            role,
            label: label.map(str::to_string),
            matching: LabelMatch::Exact,
            probe: Self::DEFAULT_PROBE,
        }
    }

    pub fn button(label: &str) -> Self {
        Self::new(ControlRole::Button, Some(label))
    }

    pub fn checkbox(label: &str) -> Self {
        Self::new(ControlRole::CheckBox, Some(label))
    }

    pub fn menu_item(label: &str) -> Self {
        Self::new(ControlRole::MenuItem, Some(label))
    }

    /// The first text-entry control of the surface.
    pub fn first_entry() -> Self {
        Self::new(ControlRole::Edit, None)
    }

    pub fn containing(mut self) -> Self {
        self.matching = LabelMatch::Contains;
        self
    }

    pub fn with_probe(mut self, probe: Duration) -> Self {
        self.probe = probe;
        self
    }

    /// Whether a control with this role and name satisfies the query.
    pub fn matches(&self, role: ControlRole, name: &str) -> bool {
        if role != self.role {
            return false;
        }
        match (&self.label, self.matching) {
            (None, _) => true,
            (Some(label), LabelMatch::Exact) => name == label,
            (Some(label), LabelMatch::Contains) => name.contains(label.as_str()),
        }
    }
}

impl fmt::Display for ControlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{:?} '{}'", self.role, label),
            None => write!(f, "first {:?}", self.role),
        }
    }
}

/// Screen rectangle in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn offset(&self, dx: i32, dy: i32) -> (i32, i32) {
        (self.left + dx, self.top + dy)
    }
}

/// Capability queries against one live top-level window.
pub trait Surface {
    fn title(&self) -> String;
    fn class_name(&self) -> String;

    /// Id of the process that owns the window, when the backend can tell.
    fn process_id(&self) -> Option<u32>;

    fn exists(&self, query: &ControlQuery) -> bool;
    fn click_control(&self, query: &ControlQuery) -> UiResult<()>;

    /// Names of up to `limit` text elements inside the window.
    fn read_texts(&self, limit: usize) -> Vec<String>;

    /// Types into the first entry control, optionally replacing its content.
    fn type_into_entry(&self, text: &str, select_all: bool) -> UiResult<()>;

    /// Toggle state of a checkbox.
    fn is_checked(&self, query: &ControlQuery) -> UiResult<bool>;

    fn focus(&self) -> UiResult<()>;
    fn maximize(&self) -> UiResult<()>;
    fn is_maximized(&self) -> bool;
    fn bounds(&self) -> UiResult<Rect>;
    fn close(&self) -> UiResult<()>;
}

/// A live surface tagged with the identity it was resolved against.
///
/// Handles are scoped to one step; the client may destroy the window at any
/// time, so they are never cached across steps.
pub struct WindowHandle {
    identity: Option<SurfaceKind>,
    title: String,
    surface: Box<dyn Surface>,
}

impl WindowHandle {
    pub fn new(identity: Option<SurfaceKind>, surface: Box<dyn Surface>) -> Self {
        let title = surface.title();
        Self {
            identity,
            title,
            surface,
        }
    }

    pub fn identity(&self) -> Option<SurfaceKind> {
        self.identity
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn surface(&self) -> &dyn Surface {
        self.surface.as_ref()
    }

    /// Clicks the first query that exists on this surface and returns its
    /// label.
    pub fn click_first(&self, queries: impl IntoIterator<Item = ControlQuery>) -> Option<String> {
        for query in queries {
            if !self.surface.exists(&query) {
                continue;
            }
            match self.surface.click_control(&query) {
                Ok(()) => return Some(query.label.clone().unwrap_or_default()),
                Err(err) => {
                    tracing::debug!(surface = %self.title, control = %query, error = %err, "Click failed");
                }
            }
        }
        None
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowHandle")
            .field("identity", &self.identity)
            .field("title", &self.title)
            .finish()
    }
}

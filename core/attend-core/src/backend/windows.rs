//! UI Automation backend.
//!
//! Surfaces are resolved by window class directly under the desktop root.
//! Each surface reports its owning process so callers can tell the client's
//! windows from everything else on the desktop.
//! Control lookups run a bounded matcher search from the surface element;
//! the matcher's own timeout is the query's probe budget.

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use uiautomation::controls::ControlType;
use uiautomation::inputs::{Keyboard, Mouse};
use uiautomation::patterns::{UITogglePattern, UIWindowPattern};
use uiautomation::types::{Point, ToggleState, TreeScope, WindowVisualState};
use uiautomation::{UIAutomation, UIElement};

use super::{Desktop, LaunchTarget};
use crate::error::{UiError, UiResult};
use crate::process;
use crate::surface::{ControlQuery, ControlRole, LabelMatch, Rect, Surface, SurfaceKind};

const SURFACE_SEARCH_DEPTH: u32 = 2;
const CONTROL_SEARCH_DEPTH: u32 = 32;
const KEY_INTERVAL_MS: u64 = 10;

pub struct UiaDesktop {
    automation: Rc<UIAutomation>,
    process_name: String,
}

impl UiaDesktop {
    pub fn new(process_name: String) -> UiResult<Self> {
        let automation = UIAutomation::new()
            .map_err(|err| UiError::action_failed(format!("UI Automation init: {}", err)))?;
        Ok(Self {
            automation: Rc::new(automation),
            process_name,
        })
    }

    fn root(&self) -> UiResult<UIElement> {
        self.automation
            .get_root_element()
            .map_err(|err| UiError::action_failed(format!("desktop root: {}", err)))
    }

    fn surface(&self, element: UIElement) -> Box<dyn Surface> {
        Box::new(UiaSurface {
            automation: Rc::clone(&self.automation),
            element,
        })
    }
}

impl Desktop for UiaDesktop {
    fn resolve(&self, kind: SurfaceKind) -> Option<Box<dyn Surface>> {
        let root = self.root().ok()?;
        self.automation
            .create_matcher()
            .from(root)
            .depth(SURFACE_SEARCH_DEPTH)
            .classname(kind.class_name())
            .timeout(0)
            .find_first()
            .ok()
            .map(|element| self.surface(element))
    }

    fn top_level(&self) -> Vec<Box<dyn Surface>> {
        let Ok(root) = self.root() else {
            return Vec::new();
        };
        let Ok(condition) = self.automation.create_true_condition() else {
            return Vec::new();
        };
        root.find_all(TreeScope::Children, &condition)
            .map(|elements| elements.into_iter().map(|e| self.surface(e)).collect())
            .unwrap_or_default()
    }

    fn client_pids(&self) -> Vec<u32> {
        process::running_pids(&self.process_name)
    }

    fn move_pointer(&self, x: i32, y: i32) -> UiResult<()> {
        Mouse::default()
            .move_to(Point::new(x, y))
            .map_err(|err| UiError::action_failed(format!("move pointer: {}", err)))
    }

    fn click_at(&self, x: i32, y: i32, clicks: u32, interval: Duration) -> UiResult<()> {
        let mouse = Mouse::default();
        for n in 0..clicks {
            if n > 0 {
                thread::sleep(interval);
            }
            mouse
                .click(Point::new(x, y))
                .map_err(|err| UiError::action_failed(format!("click at ({}, {}): {}", x, y, err)))?;
        }
        Ok(())
    }

    fn press_default_accept(&self) -> UiResult<()> {
        Keyboard::default()
            .send_keys("{enter}")
            .map_err(|err| UiError::action_failed(format!("enter key: {}", err)))
    }

    fn maximize_hotkey(&self) -> UiResult<()> {
        Keyboard::default()
            .send_keys("{win}({up})")
            .map_err(|err| UiError::action_failed(format!("maximize hotkey: {}", err)))
    }

    fn screen_size(&self) -> (i32, i32) {
        self.root()
            .and_then(|root| {
                root.get_bounding_rectangle()
                    .map_err(|err| UiError::action_failed(err.to_string()))
            })
            .map(|rect| (rect.get_width(), rect.get_height()))
            .unwrap_or((0, 0))
    }

    fn launch(&self, target: &LaunchTarget) -> UiResult<()> {
        process::spawn(target)
    }

    fn terminate(&self, process_name: &str) -> UiResult<usize> {
        Ok(process::terminate_by_name(process_name))
    }
}

struct UiaSurface {
    automation: Rc<UIAutomation>,
    element: UIElement,
}

fn control_type(role: ControlRole) -> ControlType {
    match role {
        ControlRole::Button => ControlType::Button,
        ControlRole::CheckBox => ControlType::CheckBox,
        ControlRole::Edit => ControlType::Edit,
        ControlRole::MenuItem => ControlType::MenuItem,
    }
}

/// Escapes characters the key-sequence parser treats as syntax.
fn escape_keys(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '{' | '}' | '(' | ')' => {
                escaped.push('{');
                escaped.push(c);
                escaped.push('}');
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

impl UiaSurface {
    fn find(&self, query: &ControlQuery) -> UiResult<UIElement> {
        let mut matcher = self
            .automation
            .create_matcher()
            .from(self.element.clone())
            .depth(CONTROL_SEARCH_DEPTH)
            .control_type(control_type(query.role))
            .timeout(query.probe.as_millis() as u64);
        if let Some(label) = &query.label {
            matcher = match query.matching {
                LabelMatch::Exact => matcher.name(label.as_str()),
                LabelMatch::Contains => matcher.contains_name(label.as_str()),
            };
        }
        matcher
            .find_first()
            .map_err(|_| UiError::absent(query.to_string()))
    }

    fn window_pattern(&self) -> UiResult<UIWindowPattern> {
        self.element
            .get_pattern::<UIWindowPattern>()
            .map_err(|err| UiError::action_failed(format!("window pattern: {}", err)))
    }
}

impl Surface for UiaSurface {
    fn title(&self) -> String {
        self.element.get_name().unwrap_or_default()
    }

    fn class_name(&self) -> String {
        self.element.get_classname().unwrap_or_default()
    }

    fn process_id(&self) -> Option<u32> {
        self.element.get_process_id().ok().map(|pid| pid as u32)
    }

    fn exists(&self, query: &ControlQuery) -> bool {
        self.find(query).is_ok()
    }

    fn click_control(&self, query: &ControlQuery) -> UiResult<()> {
        let element = self.find(query)?;
        element
            .click()
            .map_err(|err| UiError::action_failed(format!("click {}: {}", query, err)))
    }

    fn read_texts(&self, limit: usize) -> Vec<String> {
        let matcher = self
            .automation
            .create_matcher()
            .from(self.element.clone())
            .depth(CONTROL_SEARCH_DEPTH)
            .control_type(ControlType::Text)
            .timeout(0);
        matcher
            .find_all()
            .map(|elements| {
                elements
                    .iter()
                    .take(limit)
                    .filter_map(|element| element.get_name().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn type_into_entry(&self, text: &str, select_all: bool) -> UiResult<()> {
        let query = ControlQuery::first_entry().with_probe(Duration::from_secs(2));
        let entry = self.find(&query)?;
        entry
            .click()
            .map_err(|err| UiError::action_failed(format!("focus entry: {}", err)))?;
        thread::sleep(Duration::from_millis(100));
        if select_all {
            entry
                .send_keys("{ctrl}(a)", KEY_INTERVAL_MS)
                .map_err(|err| UiError::action_failed(format!("select all: {}", err)))?;
            thread::sleep(Duration::from_millis(50));
        }
        entry
            .send_keys(&escape_keys(text), KEY_INTERVAL_MS)
            .map_err(|err| UiError::action_failed(format!("type text: {}", err)))
    }

    fn is_checked(&self, query: &ControlQuery) -> UiResult<bool> {
        let element = self.find(query)?;
        let toggle = element
            .get_pattern::<UITogglePattern>()
            .map_err(|err| UiError::action_failed(format!("toggle pattern: {}", err)))?;
        toggle
            .get_toggle_state()
            .map(|state| state == ToggleState::On)
            .map_err(|err| UiError::action_failed(format!("toggle state: {}", err)))
    }

    fn focus(&self) -> UiResult<()> {
        self.element
            .set_focus()
            .map_err(|err| UiError::action_failed(format!("focus: {}", err)))
    }

    fn maximize(&self) -> UiResult<()> {
        self.window_pattern()?
            .set_window_visual_state(WindowVisualState::Maximized)
            .map_err(|err| UiError::action_failed(format!("maximize: {}", err)))
    }

    fn is_maximized(&self) -> bool {
        self.window_pattern()
            .and_then(|pattern| {
                pattern
                    .get_window_visual_state()
                    .map_err(|err| UiError::action_failed(err.to_string()))
            })
            .map(|state| state == WindowVisualState::Maximized)
            .unwrap_or(false)
    }

    fn bounds(&self) -> UiResult<Rect> {
        let rect = self
            .element
            .get_bounding_rectangle()
            .map_err(|err| UiError::action_failed(format!("bounds: {}", err)))?;
        Ok(Rect {
            left: rect.get_left(),
            top: rect.get_top(),
            right: rect.get_right(),
            bottom: rect.get_bottom(),
        })
    }

    fn close(&self) -> UiResult<()> {
        self.window_pattern()?
            .close()
            .map_err(|err| UiError::action_failed(format!("close: {}", err)))
    }
}

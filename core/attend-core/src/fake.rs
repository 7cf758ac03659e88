//! Scripted desktop and virtual clock for tests.
//!
//! `FakeDesktop` keeps a small world of windows and records every action
//! the workflows perform. Reactions attached to clicks and launches mutate
//! the world, which is how a test scripts the client's behaviour
//! ("clicking Join opens the dialog two seconds later").

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::backend::{Desktop, LaunchTarget};
use crate::clock::Clock;
use crate::error::{UiError, UiResult};
use crate::surface::{ControlQuery, ControlRole, Rect, Surface, SurfaceKind};

// ═══════════════════════════════════════════════════════════════════════════════
// Clock
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct FakeClock {
    start: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Clock for FakeClock {
    fn sleep(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }

    fn now(&self) -> Instant {
        self.start + self.elapsed.get()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// World
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Click { surface: String, label: String },
    Typed { surface: String, text: String },
    PointerMoved { x: i32, y: i32 },
    ClickedAt { x: i32, y: i32, clicks: u32 },
    DefaultAccept,
    MaximizeHotkey,
    Maximized(String),
    Focused(String),
    Closed(String),
    Launched(String),
    Terminated(String),
}

#[derive(Debug, Clone)]
pub struct FakeControl {
    pub role: ControlRole,
    pub name: String,
    pub checked: bool,
}

/// Process id every client window reports.
pub const CLIENT_PID: u32 = 4242;
const FOREIGN_PID: u32 = 7100;

#[derive(Debug, Clone)]
pub struct FakeWindow {
    id: usize,
    pub pid: u32,
    pub kind: Option<SurfaceKind>,
    pub title: String,
    pub class: String,
    pub controls: Vec<FakeControl>,
    pub texts: Vec<String>,
    pub maximized: bool,
    pub visible_from: Duration,
}

impl FakeWindow {
    pub fn surface(kind: SurfaceKind) -> Self {
        let title = match kind {
            SurfaceKind::Main => "Zoom Workplace",
            SurfaceKind::Dialog => "Join meeting",
            SurfaceKind::InSession => "Zoom Meeting",
        };
        Self {
            id: 0,
            pid: CLIENT_PID,
            kind: Some(kind),
            title: title.to_string(),
            class: kind.class_name().to_string(),
            controls: Vec::new(),
            texts: Vec::new(),
            maximized: false,
            visible_from: Duration::ZERO,
        }
    }

    /// A transient client window with no well-known identity.
    pub fn popup(title: &str) -> Self {
        Self {
            id: 0,
            pid: CLIENT_PID,
            kind: None,
            title: title.to_string(),
            class: "ZPControlPanelClass".to_string(),
            controls: Vec::new(),
            texts: Vec::new(),
            maximized: false,
            visible_from: Duration::ZERO,
        }
    }

    /// A window of some other application.
    pub fn foreign(title: &str, class: &str) -> Self {
        Self {
            pid: FOREIGN_PID,
            class: class.to_string(),
            ..Self::popup(title)
        }
    }

    pub fn with_button(mut self, name: &str) -> Self {
        self.controls.push(FakeControl {
            role: ControlRole::Button,
            name: name.to_string(),
            checked: false,
        });
        self
    }

    pub fn with_menu_item(mut self, name: &str) -> Self {
        self.controls.push(FakeControl {
            role: ControlRole::MenuItem,
            name: name.to_string(),
            checked: false,
        });
        self
    }

    pub fn with_checkbox(mut self, name: &str, checked: bool) -> Self {
        self.controls.push(FakeControl {
            role: ControlRole::CheckBox,
            name: name.to_string(),
            checked,
        });
        self
    }

    pub fn with_entry(mut self) -> Self {
        self.controls.push(FakeControl {
            role: ControlRole::Edit,
            name: String::new(),
            checked: false,
        });
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.texts.push(text.to_string());
        self
    }

    pub fn visible_after(mut self, delay: Duration) -> Self {
        self.visible_from = delay;
        self
    }
}

type Reaction = Rc<dyn Fn(&mut World)>;

#[derive(Clone, PartialEq, Eq)]
enum Trigger {
    Click {
        kind: Option<SurfaceKind>,
        label: String,
    },
    Launch,
}

pub struct World {
    clock: FakeClock,
    windows: Vec<FakeWindow>,
    actions: Vec<Action>,
    next_id: usize,
    focused: Option<usize>,
    reactions: Vec<(Trigger, Reaction)>,
    failing: HashSet<String>,
    pub hotkey_maximizes: bool,
}

impl World {
    pub fn now(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Adds a window. `visible_from` is relative to the current virtual time.
    pub fn add_window(&mut self, mut window: FakeWindow) -> usize {
        self.next_id += 1;
        window.id = self.next_id;
        window.visible_from += self.now();
        self.windows.push(window);
        self.next_id
    }

    pub fn remove_kind(&mut self, kind: SurfaceKind) {
        self.windows.retain(|w| w.kind != Some(kind));
    }

    pub fn remove_titled(&mut self, title: &str) {
        self.windows.retain(|w| w.title != title);
    }

    fn visible(&self, id: usize) -> Option<&FakeWindow> {
        let now = self.now();
        self.windows
            .iter()
            .find(|w| w.id == id && w.visible_from <= now)
    }

    fn visible_mut(&mut self, id: usize) -> Option<&mut FakeWindow> {
        let now = self.now();
        self.windows
            .iter_mut()
            .find(|w| w.id == id && w.visible_from <= now)
    }

    fn reactions_for(&self, trigger: &Trigger) -> Vec<Reaction> {
        self.reactions
            .iter()
            .filter(|(t, _)| t == trigger)
            .map(|(_, r)| Rc::clone(r))
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Desktop
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct FakeDesktop {
    world: Rc<RefCell<World>>,
}

impl FakeDesktop {
    pub fn new(clock: &FakeClock) -> Self {
        Self {
            world: Rc::new(RefCell::new(World {
                clock: clock.clone(),
                windows: Vec::new(),
                actions: Vec::new(),
                next_id: 0,
                focused: None,
                reactions: Vec::new(),
                failing: HashSet::new(),
                hotkey_maximizes: true,
            })),
        }
    }

    pub fn add_window(&self, window: FakeWindow) -> usize {
        self.world.borrow_mut().add_window(window)
    }

    /// Runs `reaction` whenever a control labelled `label` is clicked on a
    /// surface of `kind` (`None` matches popups).
    pub fn on_click(
        &self,
        kind: Option<SurfaceKind>,
        label: &str,
        reaction: impl Fn(&mut World) + 'static,
    ) {
        self.world.borrow_mut().reactions.push((
            Trigger::Click {
                kind,
                label: label.to_string(),
            },
            Rc::new(reaction),
        ));
    }

    pub fn on_launch(&self, reaction: impl Fn(&mut World) + 'static) {
        self.world
            .borrow_mut()
            .reactions
            .push((Trigger::Launch, Rc::new(reaction)));
    }

    /// Clicks on controls named `label` fail with `ActionFailed`.
    pub fn fail_clicks_on(&self, label: &str) {
        self.world.borrow_mut().failing.insert(label.to_string());
    }

    pub fn set_hotkey_maximizes(&self, value: bool) {
        self.world.borrow_mut().hotkey_maximizes = value;
    }

    pub fn actions(&self) -> Vec<Action> {
        self.world.borrow().actions.clone()
    }

    pub fn clear_actions(&self) {
        self.world.borrow_mut().actions.clear();
    }

    pub fn clicked_labels(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Click { label, .. } => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn typed(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Typed { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Windows still open, foreign ones included.
    pub fn window_count(&self) -> usize {
        self.world.borrow().windows.len()
    }

    pub fn has_titled(&self, title: &str) -> bool {
        self.world.borrow().windows.iter().any(|w| w.title == title)
    }

    pub fn has_kind(&self, kind: SurfaceKind) -> bool {
        self.world
            .borrow()
            .windows
            .iter()
            .any(|w| w.kind == Some(kind))
    }

    pub fn is_checked(&self, kind: SurfaceKind, name: &str) -> bool {
        self.world
            .borrow()
            .windows
            .iter()
            .filter(|w| w.kind == Some(kind))
            .flat_map(|w| w.controls.iter())
            .any(|c| c.name == name && c.checked)
    }

    pub fn is_maximized(&self, kind: SurfaceKind) -> bool {
        self.world
            .borrow()
            .windows
            .iter()
            .any(|w| w.kind == Some(kind) && w.maximized)
    }

    fn surface(&self, id: usize) -> Box<dyn Surface> {
        Box::new(FakeSurface {
            world: Rc::clone(&self.world),
            id,
        })
    }
}

impl Desktop for FakeDesktop {
    fn resolve(&self, kind: SurfaceKind) -> Option<Box<dyn Surface>> {
        let id = {
            let world = self.world.borrow();
            let now = world.now();
            world
                .windows
                .iter()
                .find(|w| w.kind == Some(kind) && w.visible_from <= now)
                .map(|w| w.id)
        };
        id.map(|id| self.surface(id))
    }

    fn top_level(&self) -> Vec<Box<dyn Surface>> {
        let ids: Vec<usize> = {
            let world = self.world.borrow();
            let now = world.now();
            world
                .windows
                .iter()
                .filter(|w| w.visible_from <= now)
                .map(|w| w.id)
                .collect()
        };
        ids.into_iter().map(|id| self.surface(id)).collect()
    }

    fn client_pids(&self) -> Vec<u32> {
        let world = self.world.borrow();
        if world.windows.iter().any(|w| w.pid == CLIENT_PID) {
            vec![CLIENT_PID]
        } else {
            Vec::new()
        }
    }

    fn move_pointer(&self, x: i32, y: i32) -> UiResult<()> {
        self.world
            .borrow_mut()
            .actions
            .push(Action::PointerMoved { x, y });
        Ok(())
    }

    fn click_at(&self, x: i32, y: i32, clicks: u32, _interval: Duration) -> UiResult<()> {
        self.world
            .borrow_mut()
            .actions
            .push(Action::ClickedAt { x, y, clicks });
        Ok(())
    }

    fn press_default_accept(&self) -> UiResult<()> {
        self.world.borrow_mut().actions.push(Action::DefaultAccept);
        Ok(())
    }

    fn maximize_hotkey(&self) -> UiResult<()> {
        let mut world = self.world.borrow_mut();
        world.actions.push(Action::MaximizeHotkey);
        if world.hotkey_maximizes {
            if let Some(id) = world.focused {
                if let Some(window) = world.visible_mut(id) {
                    window.maximized = true;
                }
            }
        }
        Ok(())
    }

    fn screen_size(&self) -> (i32, i32) {
        (1920, 1080)
    }

    fn launch(&self, target: &LaunchTarget) -> UiResult<()> {
        let mut world = self.world.borrow_mut();
        world.actions.push(Action::Launched(target.to_string()));
        for reaction in world.reactions_for(&Trigger::Launch) {
            reaction(&mut *world);
        }
        Ok(())
    }

    fn terminate(&self, process_name: &str) -> UiResult<usize> {
        let mut world = self.world.borrow_mut();
        world
            .actions
            .push(Action::Terminated(process_name.to_string()));
        let before = world.windows.len();
        world.windows.retain(|w| w.pid != CLIENT_PID);
        world.focused = None;
        Ok(usize::from(world.windows.len() < before))
    }
}

struct FakeSurface {
    world: Rc<RefCell<World>>,
    id: usize,
}

impl FakeSurface {
    fn gone(&self) -> UiError {
        UiError::absent(format!("window {}", self.id))
    }
}

impl Surface for FakeSurface {
    fn title(&self) -> String {
        self.world
            .borrow()
            .visible(self.id)
            .map(|w| w.title.clone())
            .unwrap_or_default()
    }

    fn class_name(&self) -> String {
        self.world
            .borrow()
            .visible(self.id)
            .map(|w| w.class.clone())
            .unwrap_or_default()
    }

    fn process_id(&self) -> Option<u32> {
        self.world.borrow().visible(self.id).map(|w| w.pid)
    }

    fn exists(&self, query: &ControlQuery) -> bool {
        self.world
            .borrow()
            .visible(self.id)
            .is_some_and(|w| w.controls.iter().any(|c| query.matches(c.role, &c.name)))
    }

    fn click_control(&self, query: &ControlQuery) -> UiResult<()> {
        let mut world = self.world.borrow_mut();
        let failing = world.failing.clone();
        let window = world.visible_mut(self.id).ok_or_else(|| self.gone())?;
        let kind = window.kind;
        let surface = window.title.clone();
        let control = window
            .controls
            .iter_mut()
            .find(|c| query.matches(c.role, &c.name))
            .ok_or_else(|| UiError::absent(query.to_string()))?;
        if failing.contains(&control.name) {
            return Err(UiError::action_failed(format!("click {}", query)));
        }
        if control.role == ControlRole::CheckBox {
            control.checked = !control.checked;
        }
        let label = control.name.clone();

        world.actions.push(Action::Click {
            surface,
            label: label.clone(),
        });
        let trigger = Trigger::Click { kind, label };
        for reaction in world.reactions_for(&trigger) {
            reaction(&mut *world);
        }
        Ok(())
    }

    fn read_texts(&self, limit: usize) -> Vec<String> {
        self.world
            .borrow()
            .visible(self.id)
            .map(|w| w.texts.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    fn type_into_entry(&self, text: &str, _select_all: bool) -> UiResult<()> {
        let mut world = self.world.borrow_mut();
        let window = world.visible(self.id).ok_or_else(|| self.gone())?;
        if !window.controls.iter().any(|c| c.role == ControlRole::Edit) {
            return Err(UiError::absent("entry"));
        }
        let surface = window.title.clone();
        world.actions.push(Action::Typed {
            surface,
            text: text.to_string(),
        });
        Ok(())
    }

    fn is_checked(&self, query: &ControlQuery) -> UiResult<bool> {
        let world = self.world.borrow();
        let window = world.visible(self.id).ok_or_else(|| self.gone())?;
        window
            .controls
            .iter()
            .find(|c| query.matches(c.role, &c.name))
            .map(|c| c.checked)
            .ok_or_else(|| UiError::absent(query.to_string()))
    }

    fn focus(&self) -> UiResult<()> {
        let mut world = self.world.borrow_mut();
        let title = world
            .visible(self.id)
            .map(|w| w.title.clone())
            .ok_or_else(|| self.gone())?;
        world.focused = Some(self.id);
        world.actions.push(Action::Focused(title));
        Ok(())
    }

    fn maximize(&self) -> UiResult<()> {
        let mut world = self.world.borrow_mut();
        let window = world.visible_mut(self.id).ok_or_else(|| self.gone())?;
        window.maximized = true;
        let title = window.title.clone();
        world.actions.push(Action::Maximized(title));
        Ok(())
    }

    fn is_maximized(&self) -> bool {
        self.world
            .borrow()
            .visible(self.id)
            .is_some_and(|w| w.maximized)
    }

    fn bounds(&self) -> UiResult<Rect> {
        self.world
            .borrow()
            .visible(self.id)
            .map(|_| Rect {
                left: 100,
                top: 50,
                right: 1380,
                bottom: 850,
            })
            .ok_or_else(|| self.gone())
    }

    fn close(&self) -> UiResult<()> {
        let mut world = self.world.borrow_mut();
        let title = world
            .visible(self.id)
            .map(|w| w.title.clone())
            .ok_or_else(|| self.gone())?;
        let id = self.id;
        world.windows.retain(|w| w.id != id);
        world.actions.push(Action::Closed(title));
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Scenarios
// ═══════════════════════════════════════════════════════════════════════════════

pub const AUDIO_CHECKBOX: &str = "Don't connect to audio";

/// An in-session window with the usual toolbar.
pub fn meeting_window() -> FakeWindow {
    FakeWindow::surface(SurfaceKind::InSession)
        .with_button("Mute")
        .with_button("Leave")
}

/// A client that is not running yet and behaves like the real one when
/// driven through the join sequence: launch opens the main surface, Join
/// opens the dialog, confirming the dialog asks for the password (when
/// `password` is set) and the meeting window appears `connect_delay` after
/// the last confirmation.
pub fn scripted_client(clock: &FakeClock, password: bool, connect_delay: Duration) -> FakeDesktop {
    let desktop = FakeDesktop::new(clock);

    desktop.on_launch(|world| {
        world.add_window(
            FakeWindow::surface(SurfaceKind::Main)
                .with_button("Join")
                .visible_after(Duration::from_secs(2)),
        );
    });

    desktop.on_click(Some(SurfaceKind::Main), "Join", |world| {
        world.add_window(
            FakeWindow::surface(SurfaceKind::Dialog)
                .with_entry()
                .with_checkbox(AUDIO_CHECKBOX, false)
                .with_button("Join")
                .visible_after(Duration::from_secs(1)),
        );
    });

    let connect = move |world: &mut World| {
        world.remove_kind(SurfaceKind::Dialog);
        world.add_window(meeting_window().visible_after(connect_delay));
    };

    if password {
        desktop.on_click(Some(SurfaceKind::Dialog), "Join", |world| {
            world.remove_kind(SurfaceKind::Dialog);
            world.add_window(
                FakeWindow::surface(SurfaceKind::Dialog)
                    .with_entry()
                    .with_button("Join Meeting"),
            );
        });
        desktop.on_click(Some(SurfaceKind::Dialog), "Join Meeting", connect);
    } else {
        desktop.on_click(Some(SurfaceKind::Dialog), "Join", connect);
    }

    desktop
}

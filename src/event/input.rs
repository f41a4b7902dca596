//! Input event types wrapping crossterm for decoupling.
//!
//! The frame driver decodes backend events into [`Event`] values before
//! handing them to the engine; nothing past this module depends on
//! crossterm. Pointer coordinates are plain [`Point`]s so synthetic events
//! are trivial to construct in tests and tooling.

use std::ops::{BitAnd, BitOr};

use crate::geometry::Point;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Keyboard key, decoupled from crossterm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Modifier key bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(pub u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1);
    pub const CTRL: Modifiers = Modifiers(2);
    pub const ALT: Modifiers = Modifiers(4);

    /// Check whether `self` contains all the bits in `other`.
    pub fn contains(self, other: Modifiers) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether no modifier bits are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;
    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitAnd for Modifiers {
    type Output = Modifiers;
    fn bitand(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 & rhs.0)
    }
}

// ---------------------------------------------------------------------------
// KeyEvent
// ---------------------------------------------------------------------------

/// A keyboard event with key and modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Create a new key event.
    pub fn new(code: Key, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }
}

// ---------------------------------------------------------------------------
// Pointer events
// ---------------------------------------------------------------------------

/// Pointer button. `Primary` drives clicks, focus, and window drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Pointer action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerAction {
    Press(PointerButton),
    Release(PointerButton),
    Moved,
    Scroll(i32),
}

/// A pointer event with action, absolute position, and modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub position: Point,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Create a new pointer event without modifiers.
    pub fn new(action: PointerAction, position: Point) -> Self {
        Self { action, position, modifiers: Modifiers::NONE }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A decoded input event, ready for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    Pointer(PointerEvent),
    Key(KeyEvent),
}

impl Event {
    /// Shorthand for a primary-button press at `position`.
    pub fn press(position: Point) -> Self {
        Event::Pointer(PointerEvent::new(PointerAction::Press(PointerButton::Primary), position))
    }

    /// Shorthand for a primary-button release at `position`.
    pub fn release(position: Point) -> Self {
        Event::Pointer(PointerEvent::new(
            PointerAction::Release(PointerButton::Primary),
            position,
        ))
    }

    /// Shorthand for a pointer-motion event at `position`.
    pub fn motion(position: Point) -> Self {
        Event::Pointer(PointerEvent::new(PointerAction::Moved, position))
    }

    /// Shorthand for an unmodified key press.
    pub fn key(code: Key) -> Self {
        Event::Key(KeyEvent::new(code, Modifiers::NONE))
    }
}

// ---------------------------------------------------------------------------
// From<crossterm> conversions
// ---------------------------------------------------------------------------

/// Convert crossterm key modifiers to our `Modifiers`.
fn convert_modifiers(m: crossterm::event::KeyModifiers) -> Modifiers {
    let mut out = Modifiers::NONE;
    if m.contains(crossterm::event::KeyModifiers::SHIFT) {
        out = out | Modifiers::SHIFT;
    }
    if m.contains(crossterm::event::KeyModifiers::CONTROL) {
        out = out | Modifiers::CTRL;
    }
    if m.contains(crossterm::event::KeyModifiers::ALT) {
        out = out | Modifiers::ALT;
    }
    out
}

impl From<crossterm::event::KeyEvent> for KeyEvent {
    fn from(ct: crossterm::event::KeyEvent) -> Self {
        let code = match ct.code {
            crossterm::event::KeyCode::Char(c) => Key::Char(c),
            crossterm::event::KeyCode::Enter => Key::Enter,
            crossterm::event::KeyCode::Tab | crossterm::event::KeyCode::BackTab => Key::Tab,
            crossterm::event::KeyCode::Backspace => Key::Backspace,
            crossterm::event::KeyCode::Delete => Key::Delete,
            crossterm::event::KeyCode::Left => Key::Left,
            crossterm::event::KeyCode::Right => Key::Right,
            crossterm::event::KeyCode::Up => Key::Up,
            crossterm::event::KeyCode::Down => Key::Down,
            crossterm::event::KeyCode::Home => Key::Home,
            crossterm::event::KeyCode::End => Key::End,
            crossterm::event::KeyCode::PageUp => Key::PageUp,
            crossterm::event::KeyCode::PageDown => Key::PageDown,
            crossterm::event::KeyCode::F(n) => Key::F(n),
            // Everything else folds to Escape.
            _ => Key::Escape,
        };
        KeyEvent { code, modifiers: convert_modifiers(ct.modifiers) }
    }
}

fn convert_button(b: crossterm::event::MouseButton) -> PointerButton {
    match b {
        crossterm::event::MouseButton::Left => PointerButton::Primary,
        crossterm::event::MouseButton::Right => PointerButton::Secondary,
        crossterm::event::MouseButton::Middle => PointerButton::Middle,
    }
}

/// Decode a crossterm event into an engine [`Event`].
///
/// Returns `None` for backend events the scene has no use for (resize,
/// terminal focus, paste) — those belong to the frame driver.
pub fn from_crossterm(ct: crossterm::event::Event) -> Option<Event> {
    match ct {
        crossterm::event::Event::Key(ke) => Some(Event::Key(KeyEvent::from(ke))),
        crossterm::event::Event::Mouse(me) => {
            let position = Point::new(i32::from(me.column), i32::from(me.row));
            let modifiers = convert_modifiers(me.modifiers);
            let action = match me.kind {
                crossterm::event::MouseEventKind::Down(b) => PointerAction::Press(convert_button(b)),
                crossterm::event::MouseEventKind::Up(b) => {
                    PointerAction::Release(convert_button(b))
                }
                // A drag is a motion with a button held; the dispatcher only
                // cares about the position.
                crossterm::event::MouseEventKind::Drag(_)
                | crossterm::event::MouseEventKind::Moved => PointerAction::Moved,
                crossterm::event::MouseEventKind::ScrollUp => PointerAction::Scroll(-1),
                crossterm::event::MouseEventKind::ScrollDown => PointerAction::Scroll(1),
                _ => return None,
            };
            Some(Event::Pointer(PointerEvent { action, position, modifiers }))
        }
        _ => None,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

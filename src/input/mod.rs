//! Pointer and keyboard input.
//!
//! A press decides, once, whether the gesture belongs to the camera or to the
//! active tool; every move and the release follow that decision.

use crate::camera::CameraDrag;
use crate::tools::{ToolKey, ToolKind};
use glam::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        button: PointerButton,
        position: Vec2,
        modifiers: Modifiers,
    },
    Move {
        position: Vec2,
    },
    Up {
        position: Vec2,
    },
    Wheel {
        delta_y: f32,
    },
    /// The host lost pointer capture mid-gesture.
    CaptureLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Tool,
    Camera(CameraDrag),
}

/// Camera combinations win over tool gestures.
pub fn route_press(button: PointerButton, modifiers: Modifiers) -> PointerTarget {
    match button {
        PointerButton::Secondary => PointerTarget::Camera(CameraDrag::Orbit),
        PointerButton::Middle => PointerTarget::Camera(CameraDrag::Pan),
        PointerButton::Primary if modifiers.alt => PointerTarget::Camera(CameraDrag::Orbit),
        PointerButton::Primary if modifiers.shift => PointerTarget::Camera(CameraDrag::Pan),
        PointerButton::Primary => PointerTarget::Tool,
    }
}

/// Which consumer owns the pointer between press and release.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputState {
    captured: Option<PointerTarget>,
}

impl InputState {
    pub fn press(&mut self, button: PointerButton, modifiers: Modifiers) -> Option<PointerTarget> {
        if self.captured.is_some() {
            return None;
        }
        let target = route_press(button, modifiers);
        self.captured = Some(target);
        Some(target)
    }

    pub fn captured(&self) -> Option<PointerTarget> {
        self.captured
    }

    pub fn release(&mut self) -> Option<PointerTarget> {
        self.captured.take()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Delete,
    Backspace,
    Escape,
    Shift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn command(c: char) -> Self {
        Self {
            key: Key::Char(c),
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    Undo,
    Redo,
    Copy,
    Paste,
    Duplicate,
    Save,
    DeleteSelection,
    FrameSelection,
    SetTool(ToolKind),
    Gesture(ToolKey),
}

/// Maps a key press to an editor action. `gesture_active` routes X/Y/Z and
/// Shift to the running gesture instead of the tool shortcuts.
pub fn map_shortcut(event: KeyEvent, gesture_active: bool) -> Option<EditorAction> {
    if event.modifiers.command() {
        let Key::Char(c) = event.key else {
            return None;
        };
        return match c.to_ascii_lowercase() {
            'z' if event.modifiers.shift => Some(EditorAction::Redo),
            'z' => Some(EditorAction::Undo),
            'y' => Some(EditorAction::Redo),
            'c' => Some(EditorAction::Copy),
            'v' => Some(EditorAction::Paste),
            'd' => Some(EditorAction::Duplicate),
            's' => Some(EditorAction::Save),
            _ => None,
        };
    }

    if gesture_active {
        let key = match event.key {
            Key::Shift => Some(ToolKey::Shift),
            Key::Char(c) => match c.to_ascii_lowercase() {
                'x' => Some(ToolKey::X),
                'y' => Some(ToolKey::Y),
                'z' => Some(ToolKey::Z),
                _ => None,
            },
            _ => None,
        };
        if let Some(key) = key {
            return Some(EditorAction::Gesture(key));
        }
    }

    match event.key {
        Key::Delete | Key::Backspace => Some(EditorAction::DeleteSelection),
        Key::Char('f') | Key::Char('F') => Some(EditorAction::FrameSelection),
        Key::Char(c) => ToolKind::from_shortcut(c).map(EditorAction::SetTool),
        Key::Escape | Key::Shift => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_combinations_take_precedence() {
        let alt = Modifiers {
            alt: true,
            ..Modifiers::NONE
        };
        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        assert_eq!(
            route_press(PointerButton::Secondary, Modifiers::NONE),
            PointerTarget::Camera(CameraDrag::Orbit)
        );
        assert_eq!(
            route_press(PointerButton::Primary, alt),
            PointerTarget::Camera(CameraDrag::Orbit)
        );
        assert_eq!(
            route_press(PointerButton::Primary, shift),
            PointerTarget::Camera(CameraDrag::Pan)
        );
        assert_eq!(
            route_press(PointerButton::Middle, Modifiers::NONE),
            PointerTarget::Camera(CameraDrag::Pan)
        );
        assert_eq!(
            route_press(PointerButton::Primary, Modifiers::NONE),
            PointerTarget::Tool
        );
    }

    #[test]
    fn second_press_during_capture_is_ignored() {
        let mut state = InputState::default();
        assert_eq!(
            state.press(PointerButton::Primary, Modifiers::NONE),
            Some(PointerTarget::Tool)
        );
        assert_eq!(state.press(PointerButton::Secondary, Modifiers::NONE), None);
        assert_eq!(state.release(), Some(PointerTarget::Tool));
        assert_eq!(state.captured(), None);
    }

    #[test]
    fn command_shortcuts() {
        let mut redo = KeyEvent::command('z');
        redo.modifiers.shift = true;
        assert_eq!(map_shortcut(KeyEvent::command('z'), false), Some(EditorAction::Undo));
        assert_eq!(map_shortcut(redo, false), Some(EditorAction::Redo));
        assert_eq!(map_shortcut(KeyEvent::command('y'), false), Some(EditorAction::Redo));
        assert_eq!(map_shortcut(KeyEvent::command('s'), false), Some(EditorAction::Save));
        assert_eq!(map_shortcut(KeyEvent::command('q'), false), None);
    }

    #[test]
    fn letters_switch_tools_unless_a_gesture_wants_them() {
        assert_eq!(
            map_shortcut(KeyEvent::plain(Key::Char('w')), false),
            Some(EditorAction::SetTool(ToolKind::Move))
        );
        assert_eq!(
            map_shortcut(KeyEvent::plain(Key::Char('x')), true),
            Some(EditorAction::Gesture(ToolKey::X))
        );
        assert_eq!(map_shortcut(KeyEvent::plain(Key::Char('x')), false), None);
        assert_eq!(
            map_shortcut(KeyEvent::plain(Key::Delete), false),
            Some(EditorAction::DeleteSelection)
        );
        assert_eq!(
            map_shortcut(KeyEvent::plain(Key::Char('F')), false),
            Some(EditorAction::FrameSelection)
        );
    }
}

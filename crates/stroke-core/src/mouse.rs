//! Normalized mouse event model.
//!
//! Terminal mouse reports arrive as escape payloads (SGR, X10, urxvt); the
//! key-handling layer decodes those payloads into this shared representation
//! before any control sees them. Coordinates are 0-based screen cells.

use crate::Point;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MouseModifiers: u8 {
        const SHIFT = 0b001;
        const ALT   = 0b010;
        const CTRL  = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    /// Motion or scroll reports carry no button.
    None,
    /// The terminal sent a button code outside the protocol tables.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventType {
    MouseDown,
    MouseUp,
    MouseMove,
    ScrollUp,
    ScrollDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub position: Point,
    pub event_type: MouseEventType,
    pub button: MouseButton,
    pub modifiers: MouseModifiers,
}

impl MouseEvent {
    pub fn new(
        position: Point,
        event_type: MouseEventType,
        button: MouseButton,
        modifiers: MouseModifiers,
    ) -> Self {
        Self {
            position,
            event_type,
            button,
            modifiers,
        }
    }
}

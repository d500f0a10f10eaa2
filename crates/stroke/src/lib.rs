//! Stroke: infrastructure for interactive full-screen terminal
//! applications.
//!
//! This crate re-exports the workspace under stable module names. The
//! pipeline, per frame: decoded key presses feed the
//! [`key_binding::KeyProcessor`], whose handlers mutate a
//! [`buffer::Buffer`] holding an immutable [`document::Document`]; the
//! [`layout`] tree then writes styled cells into a
//! [`layout::Screen`], and [`output`] turns attribute changes into
//! escape sequences at the terminal's color depth. [`completion`] and
//! [`history`] feed the editing surface from the side.

pub use stroke_buffer as buffer;
pub use stroke_completion as completion;
pub use stroke_history as history;
pub use stroke_keys as key_binding;
pub use stroke_layout as layout;
pub use stroke_lexer as lexers;
pub use stroke_output as output;
pub use stroke_text as document;

// The shared leaf types appear at the root, the way call sites use them.
pub use stroke_core::{
    Condition, Filter, Fragment, Fragments, HandlerOutcome, MouseButton, MouseEvent,
    MouseEventType, MouseModifiers, Point,
};

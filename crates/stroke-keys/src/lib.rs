//! Key handling: identities, binding registry, and the processor state
//! machine.
//!
//! The flow per tick: the terminal decoder feeds `KeyPress` values into the
//! `KeyProcessor`, which matches them against a `KeyBindings` registry
//! (prefix trie with an `Any` wildcard) and dispatches handlers that mutate
//! the current `Buffer`. Mouse report payloads decode through [`mouse`].

pub mod bindings;
pub mod keys;
pub mod mouse;
pub mod processor;
pub mod registry;

pub use bindings::load_basic_bindings;
pub use keys::{Key, KeyOrChar, KeyPress, UnknownKey, parse_key_sequence};
pub use mouse::{parse_sgr_mouse_event, parse_typical_mouse_event, parse_urxvt_mouse_event};
pub use processor::{KeyPressEvent, KeyProcessor, MAX_ARG, ProcessorHooks};
pub use registry::{
    Binding, BindingsResolver, ConditionalKeyBindings, DynamicKeyBindings, Handler, HandlerResult,
    KeyBindings, KeyBindingsBase, MergedKeyBindings, merge_key_bindings,
};

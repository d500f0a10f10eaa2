//! Baseline editing bindings.
//!
//! The registry starts empty; this module provides the binding table any
//! line-editing application wants before it adds its own: self-insert via
//! the wildcard, cursor movement, deletion, undo, history navigation, and
//! accept. Applications layer their overrides on top — registration order
//! means theirs win.

use crate::keys::Key;
use crate::processor::KeyPressEvent;
use crate::registry::{Binding, HandlerResult, KeyBindings};
use stroke_core::HandlerOutcome;

fn handled() -> HandlerResult {
    Ok(HandlerOutcome::Handled)
}

fn count(event: &KeyPressEvent<'_>) -> usize {
    event.arg().max(1) as usize
}

/// Binding table for plain line editing.
pub fn load_basic_bindings() -> KeyBindings {
    let mut kb = KeyBindings::new();

    // Self-insert: any single printable character inserts its own data.
    kb.add_binding(
        Binding::new(
            vec![Key::Any.into()],
            |event: &mut KeyPressEvent<'_>| {
                let data = event.data().to_string();
                if data.is_empty() || data.chars().any(char::is_control) {
                    return Ok(HandlerOutcome::NotImplemented);
                }
                let repeat = event.arg().max(1) as usize;
                for _ in 0..repeat {
                    event.buffer.insert_text(&data);
                }
                handled()
            },
        )
        // Typing must not snapshot per character; undo granularity comes
        // from the explicit save points of command bindings.
        .with_save_before(|_| false),
    );

    kb.add(&["left"], |event| {
        let n = count(event);
        event.buffer.cursor_left(n);
        handled()
    });
    kb.add(&["right"], |event| {
        let n = count(event);
        event.buffer.cursor_right(n);
        handled()
    });
    kb.add(&["up"], |event| {
        let n = count(event);
        event.buffer.cursor_up(n);
        handled()
    });
    kb.add(&["down"], |event| {
        let n = count(event);
        event.buffer.cursor_down(n);
        handled()
    });

    kb.add(&["home"], |event| {
        let pos = event.buffer.document().start_of_line_position();
        event.buffer.set_cursor_position(pos);
        handled()
    });
    kb.add(&["end"], |event| {
        let pos = event.buffer.document().end_of_line_position();
        event.buffer.set_cursor_position(pos);
        handled()
    });

    kb.add(&["backspace"], |event| {
        let n = count(event);
        event.buffer.delete_before_cursor(n);
        handled()
    });
    kb.add(&["delete"], |event| {
        let n = count(event);
        event.buffer.delete(n);
        handled()
    });

    kb.add(&["c-t"], |event| {
        event.buffer.swap_characters_before_cursor();
        handled()
    });

    // Kill to end of line (emacs C-k): deleted text lands on the clipboard.
    kb.add(&["c-k"], |event| {
        let chars = event.buffer.document().current_line_after_cursor().chars().count();
        let deleted = event.buffer.delete(chars.max(1));
        if !deleted.is_empty() {
            event.buffer.clipboard().set_text(deleted);
        }
        handled()
    });

    // Yank the most recent kill back (emacs C-y).
    kb.add(&["c-y"], |event| {
        let data = event.buffer.clipboard().get_data();
        if !data.text.is_empty() {
            let n = count(event);
            event.buffer.paste_clipboard_data(&data, n);
        }
        handled()
    });

    kb.add(&["enter"], |event| {
        event.buffer.accept();
        handled()
    });

    kb.add_binding(
        Binding::new(vec![Key::ControlUnderscore.into()], |event: &mut KeyPressEvent<'_>| {
            event.buffer.undo();
            handled()
        })
        // Undo itself must not push a snapshot first.
        .with_save_before(|_| false),
    );

    kb.add(&["up"], |event| {
        // History recall only on the first line; otherwise cursor motion.
        if event.buffer.document().cursor_position_row() == 0
            && event.buffer.document().line_count() == 1
        {
            event.buffer.history_backward(count(event));
            handled()
        } else {
            Ok(HandlerOutcome::NotImplemented)
        }
    });
    kb.add(&["down"], |event| {
        if event.buffer.document().line_count() == 1 {
            event.buffer.history_forward(count(event));
            handled()
        } else {
            Ok(HandlerOutcome::NotImplemented)
        }
    });

    kb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPress;
    use crate::processor::KeyProcessor;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use stroke_buffer::Buffer;
    use stroke_history::InMemoryHistory;

    fn processor_with(history: Vec<&str>) -> (KeyProcessor, Arc<Mutex<Buffer>>) {
        let history = InMemoryHistory::with_entries(history);
        let buffer = Arc::new(Mutex::new(Buffer::new(Arc::new(history))));
        let processor = KeyProcessor::new(Arc::new(load_basic_bindings()), buffer.clone());
        (processor, buffer)
    }

    fn feed_text(processor: &mut KeyProcessor, text: &str) {
        for c in text.chars() {
            processor.feed(KeyPress::new(c));
        }
        processor.process_keys();
    }

    #[test]
    fn typing_inserts() {
        let (mut p, buffer) = processor_with(vec![]);
        feed_text(&mut p, "hello");
        assert_eq!(buffer.lock().unwrap().text(), "hello");
    }

    #[test]
    fn backspace_and_delete() {
        let (mut p, buffer) = processor_with(vec![]);
        feed_text(&mut p, "abc");
        p.feed(KeyPress::new(Key::BACKSPACE));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().text(), "ab");
        p.feed(KeyPress::new(Key::Left));
        p.feed(KeyPress::new(Key::Delete));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().text(), "a");
    }

    #[test]
    fn home_and_end() {
        let (mut p, buffer) = processor_with(vec![]);
        feed_text(&mut p, "word");
        p.feed(KeyPress::new(Key::Home));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().cursor_position(), 0);
        p.feed(KeyPress::new(Key::End));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().cursor_position(), 4);
    }

    #[test]
    fn transpose() {
        let (mut p, buffer) = processor_with(vec![]);
        feed_text(&mut p, "ab");
        p.feed(KeyPress::new(Key::ControlT));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().text(), "ba");
    }

    #[test]
    fn undo_binding_reverts_command_edits() {
        let (mut p, buffer) = processor_with(vec![]);
        feed_text(&mut p, "abc");
        p.feed(KeyPress::new(Key::BACKSPACE));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().text(), "ab");
        p.feed(KeyPress::new(Key::ControlUnderscore));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().text(), "abc");
    }

    #[test]
    fn enter_accepts_into_history() {
        let (mut p, buffer) = processor_with(vec![]);
        feed_text(&mut p, "ls -l");
        p.feed(KeyPress::new(Key::ENTER));
        p.process_keys();
        let mut b = buffer.lock().unwrap();
        assert_eq!(b.text(), "");
        b.history_backward(1);
        assert_eq!(b.text(), "ls -l");
    }

    #[test]
    fn up_recalls_history_on_single_line() {
        let (mut p, buffer) = processor_with(vec!["older", "newer"]);
        p.feed(KeyPress::new(Key::Up));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().text(), "newer");
        p.feed(KeyPress::new(Key::Up));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().text(), "older");
    }

    #[test]
    fn up_moves_cursor_in_multiline_text() {
        let (mut p, buffer) = processor_with(vec!["entry"]);
        {
            let mut b = buffer.lock().unwrap();
            b.insert_text("one\ntwo");
        }
        p.feed(KeyPress::new(Key::Up));
        p.process_keys();
        let b = buffer.lock().unwrap();
        assert_eq!(b.text(), "one\ntwo"); // no history recall
        assert_eq!(b.document().cursor_position_row(), 0);
    }

    #[test]
    fn repeat_count_applies_to_insert() {
        let (mut p, buffer) = processor_with(vec![]);
        p.append_to_arg_count("3");
        p.feed(KeyPress::new('x'));
        p.process_keys();
        assert_eq!(buffer.lock().unwrap().text(), "xxx");
    }
}

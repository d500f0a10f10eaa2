//! Mutable editing state over the immutable document model.
//!
//! A `Buffer` owns the current `Document`, the undo/redo stacks, a clipboard
//! ring, and a working-lines view over its history. Documents are replaced
//! wholesale on every edit; swapping the current document is a single field
//! store, so readers holding a clone are never exposed to a half-applied
//! edit.
//!
//! Undo policy: every text-mutating operation pushes the prior document onto
//! the undo stack first, unless it is one of the explicit no-save entry
//! points (`set_document_no_save`, cursor-only movement). Pushes deduplicate
//! against the top entry so repeated saves of an unchanged document cost
//! nothing. Any fresh mutation clears the redo stack.

mod clipboard;

pub use clipboard::{Clipboard, ClipboardData};

use std::sync::Arc;
use stroke_history::History;
use stroke_text::{Document, SelectionState, SelectionType};
use tracing::trace;

/// Maximum number of document snapshots retained for undo.
pub const UNDO_STACK_MAX: usize = 200;

pub type AcceptHandler = Arc<dyn Fn(&str) + Send + Sync>;

pub struct Buffer {
    document: Document,
    undo_stack: Vec<(String, usize)>,
    redo_stack: Vec<(String, usize)>,
    clipboard: Clipboard,
    history: Arc<dyn History>,
    /// History strings (oldest first) plus the line being edited, so history
    /// navigation is just an index move.
    working_lines: Vec<String>,
    working_index: usize,
    /// Sticky column for successive vertical cursor movement.
    preferred_column: Option<usize>,
    /// Extra caret positions consumed by the multi-cursor display processor.
    pub multiple_cursor_positions: Vec<usize>,
    accept_handler: Option<AcceptHandler>,
    /// Bumped on every document replacement; content caches key on this.
    version: u64,
}

impl Buffer {
    pub fn new(history: Arc<dyn History>) -> Self {
        let mut working_lines = history.get_strings();
        working_lines.push(String::new());
        let working_index = working_lines.len() - 1;
        Self {
            document: Document::default(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            clipboard: Clipboard::default(),
            history,
            working_lines,
            working_index,
            preferred_column: None,
            multiple_cursor_positions: Vec::new(),
            accept_handler: None,
            version: 0,
        }
    }

    pub fn with_accept_handler(mut self, handler: AcceptHandler) -> Self {
        self.accept_handler = Some(handler);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn text(&self) -> &str {
        self.document.text()
    }

    pub fn cursor_position(&self) -> usize {
        self.document.cursor_position()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn clipboard(&mut self) -> &mut Clipboard {
        &mut self.clipboard
    }

    // ---------------------------------------------------------------------------------------------
    // Document replacement & undo
    // ---------------------------------------------------------------------------------------------

    fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.version = self.version.wrapping_add(1);
    }

    /// Push the current document onto the undo stack (dedupes against the
    /// top entry when the text is unchanged) and clear the redo stack.
    pub fn save_to_undo_stack(&mut self) {
        let text_unchanged = self
            .undo_stack
            .last()
            .is_some_and(|(text, _)| text == self.document.text());
        if !text_unchanged {
            self.undo_stack
                .push((self.document.text().to_string(), self.cursor_position()));
            if self.undo_stack.len() > UNDO_STACK_MAX {
                self.undo_stack.remove(0);
            }
            trace!(target: "buffer.undo", depth = self.undo_stack.len(), "snapshot");
        }
        self.redo_stack.clear();
    }

    /// Replace the document, saving the prior one for undo.
    pub fn set_document(&mut self, document: Document) {
        self.save_to_undo_stack();
        self.replace_document(document);
    }

    /// Replace the document without touching the undo stack.
    pub fn set_document_no_save(&mut self, document: Document) {
        self.replace_document(document);
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        let cursor = self.cursor_position().min(text.len());
        // Clamp can land inside a multibyte character; walk back to a boundary.
        let cursor = (0..=cursor)
            .rev()
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(0);
        self.set_document(Document::new(text, cursor));
    }

    pub fn set_cursor_position(&mut self, position: usize) {
        self.preferred_column = None;
        let doc = self.document.with_cursor(position);
        self.replace_document(doc);
    }

    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some((text, cursor)) => {
                self.redo_stack
                    .push((self.document.text().to_string(), self.cursor_position()));
                trace!(target: "buffer.undo", redo_depth = self.redo_stack.len(), "undo");
                self.replace_document(Document::new(text, cursor));
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some((text, cursor)) => {
                self.undo_stack
                    .push((self.document.text().to_string(), self.cursor_position()));
                trace!(target: "buffer.undo", undo_depth = self.undo_stack.len(), "redo");
                self.replace_document(Document::new(text, cursor));
                true
            }
            None => false,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Text mutation
    // ---------------------------------------------------------------------------------------------

    pub fn insert_text(&mut self, data: &str) {
        self.save_to_undo_stack();
        let doc = &self.document;
        let mut text = String::with_capacity(doc.text().len() + data.len());
        text.push_str(doc.text_before_cursor());
        text.push_str(data);
        text.push_str(doc.text_after_cursor());
        let cursor = doc.cursor_position() + data.len();
        self.replace_document(Document::new(text, cursor));
    }

    /// Delete up to `count` characters before the cursor; returns the
    /// deleted text.
    pub fn delete_before_cursor(&mut self, count: usize) -> String {
        let doc = &self.document;
        let before = doc.text_before_cursor();
        let mut start = doc.cursor_position();
        for c in before.chars().rev().take(count) {
            start -= c.len_utf8();
        }
        if start == doc.cursor_position() {
            return String::new();
        }
        self.save_to_undo_stack();
        let doc = &self.document;
        let deleted = doc.text()[start..doc.cursor_position()].to_string();
        let mut text = String::with_capacity(doc.text().len() - deleted.len());
        text.push_str(&doc.text()[..start]);
        text.push_str(doc.text_after_cursor());
        self.replace_document(Document::new(text, start));
        deleted
    }

    /// Delete up to `count` characters after the cursor; returns the deleted
    /// text.
    pub fn delete(&mut self, count: usize) -> String {
        let doc = &self.document;
        let after = doc.text_after_cursor();
        let mut end = doc.cursor_position();
        for c in after.chars().take(count) {
            end += c.len_utf8();
        }
        if end == doc.cursor_position() {
            return String::new();
        }
        self.save_to_undo_stack();
        let doc = &self.document;
        let cursor = doc.cursor_position();
        let deleted = doc.text()[cursor..end].to_string();
        let mut text = String::with_capacity(doc.text().len() - deleted.len());
        text.push_str(doc.text_before_cursor());
        text.push_str(&doc.text()[end..]);
        self.replace_document(Document::new(text, cursor));
        deleted
    }

    pub fn newline(&mut self) {
        self.insert_text("\n");
    }

    /// Join the current line with the next, collapsing leading whitespace of
    /// the next line into a single separator.
    pub fn join_next_line(&mut self, separator: &str) {
        let doc = &self.document;
        let row = doc.cursor_position_row();
        let Some(range) = doc.line_range(row) else {
            return;
        };
        if range.end >= doc.text().len() {
            return; // last line
        }
        self.save_to_undo_stack();
        let doc = &self.document;
        let newline_at = range.end;
        let after = &doc.text()[newline_at + 1..];
        let trimmed = after.trim_start_matches([' ', '\t']);
        let mut text = String::with_capacity(doc.text().len());
        text.push_str(&doc.text()[..newline_at]);
        text.push_str(separator);
        text.push_str(trimmed);
        let cursor = newline_at;
        self.replace_document(Document::new(text, cursor));
    }

    /// Swap the two characters before the cursor (emacs `transpose-chars`).
    pub fn swap_characters_before_cursor(&mut self) {
        let doc = &self.document;
        let before = doc.text_before_cursor();
        let mut rev = before.chars().rev();
        let (Some(b), Some(a)) = (rev.next(), rev.next()) else {
            return;
        };
        self.save_to_undo_stack();
        let doc = &self.document;
        let cursor = doc.cursor_position();
        let start = cursor - a.len_utf8() - b.len_utf8();
        let mut text = String::with_capacity(doc.text().len());
        text.push_str(&doc.text()[..start]);
        text.push(b);
        text.push(a);
        text.push_str(doc.text_after_cursor());
        self.replace_document(Document::new(text, cursor));
    }

    /// Apply `transform` to the byte range `from..to` (clamped to char
    /// boundaries by the caller).
    pub fn transform_region(
        &mut self,
        from: usize,
        to: usize,
        transform: impl FnOnce(&str) -> String,
    ) {
        assert!(from <= to, "transform_region range reversed");
        self.save_to_undo_stack();
        let doc = &self.document;
        let replaced = transform(&doc.text()[from..to]);
        let mut text = String::with_capacity(doc.text().len());
        text.push_str(&doc.text()[..from]);
        text.push_str(&replaced);
        text.push_str(&doc.text()[to..]);
        let cursor = self.cursor_position().min(text.len());
        let cursor = (0..=cursor)
            .rev()
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(0);
        self.replace_document(Document::new(text, cursor));
    }

    // ---------------------------------------------------------------------------------------------
    // Cursor movement (no-save)
    // ---------------------------------------------------------------------------------------------

    pub fn cursor_left(&mut self, count: usize) {
        self.preferred_column = None;
        let pos = self.document.cursor_left_position(count);
        self.replace_document(self.document.with_cursor(pos));
    }

    pub fn cursor_right(&mut self, count: usize) {
        self.preferred_column = None;
        let pos = self.document.cursor_right_position(count);
        self.replace_document(self.document.with_cursor(pos));
    }

    pub fn cursor_up(&mut self, count: usize) {
        let col = self
            .preferred_column
            .get_or_insert_with(|| self.document.cursor_position_col());
        let col = *col;
        let pos = self.document.cursor_up_position(count, Some(col));
        self.replace_document(self.document.with_cursor(pos));
    }

    pub fn cursor_down(&mut self, count: usize) {
        let col = self
            .preferred_column
            .get_or_insert_with(|| self.document.cursor_position_col());
        let col = *col;
        let pos = self.document.cursor_down_position(count, Some(col));
        self.replace_document(self.document.with_cursor(pos));
    }

    // ---------------------------------------------------------------------------------------------
    // Selection & clipboard
    // ---------------------------------------------------------------------------------------------

    pub fn start_selection(&mut self, selection_type: SelectionType) {
        let mut state = SelectionState::new(self.cursor_position());
        state.selection_type = selection_type;
        let doc = self.document.clone().with_selection(state);
        self.replace_document(doc);
    }

    pub fn exit_selection(&mut self) {
        let doc = Document::new(self.document.text().to_string(), self.cursor_position());
        self.replace_document(doc);
    }

    /// Remove the selected text, store it on the clipboard, and return it.
    pub fn cut_selection(&mut self) -> Option<ClipboardData> {
        let selection_type = self.document.selection()?.selection_type;
        self.save_to_undo_stack();
        let (remaining, cut) = self.document.cut_selection_parts()?;
        self.replace_document(remaining);
        let data = ClipboardData {
            text: cut,
            selection_type,
        };
        self.clipboard.set_data(data.clone());
        Some(data)
    }

    pub fn copy_selection(&mut self) -> Option<ClipboardData> {
        let selection_type = self.document.selection()?.selection_type;
        let range = self.document.selection_range()?;
        let data = ClipboardData {
            text: self.document.text()[range].to_string(),
            selection_type,
        };
        self.clipboard.set_data(data.clone());
        Some(data)
    }

    pub fn paste_clipboard_data(&mut self, data: &ClipboardData, count: usize) {
        match data.selection_type {
            SelectionType::Characters | SelectionType::Block => {
                for _ in 0..count.max(1) {
                    self.insert_text(&data.text);
                }
            }
            SelectionType::Lines => {
                self.save_to_undo_stack();
                let doc = &self.document;
                let row = doc.cursor_position_row();
                let line_end = doc
                    .line_range(row)
                    .map(|r| r.end)
                    .unwrap_or(doc.text().len());
                let mut pasted = String::new();
                for _ in 0..count.max(1) {
                    pasted.push('\n');
                    pasted.push_str(&data.text);
                }
                let mut text = String::with_capacity(doc.text().len() + pasted.len());
                text.push_str(&doc.text()[..line_end]);
                text.push_str(&pasted);
                text.push_str(&doc.text()[line_end..]);
                self.replace_document(Document::new(text, line_end + 1));
            }
        }
    }

    // ---------------------------------------------------------------------------------------------
    // History navigation
    // ---------------------------------------------------------------------------------------------

    fn go_to_working_line(&mut self, index: usize) {
        self.working_lines[self.working_index] = self.document.text().to_string();
        self.working_index = index;
        let text = self.working_lines[index].clone();
        let cursor = text.len();
        self.replace_document(Document::new(text, cursor));
    }

    pub fn history_backward(&mut self, count: usize) {
        let target = self.working_index.saturating_sub(count.max(1));
        if target != self.working_index {
            self.go_to_working_line(target);
        }
    }

    pub fn history_forward(&mut self, count: usize) {
        let target = (self.working_index + count.max(1)).min(self.working_lines.len() - 1);
        if target != self.working_index {
            self.go_to_working_line(target);
        }
    }

    pub fn append_to_history(&mut self) {
        let text = self.document.text();
        if !text.is_empty() {
            self.history.append_string(text);
            let last = self.working_lines.len() - 1;
            self.working_lines.insert(last, text.to_string());
            self.working_index = self.working_lines.len() - 1;
        }
    }

    /// Run the accept handler (if any) on the current text, append the line
    /// to history, and reset to an empty working line.
    pub fn accept(&mut self) {
        if let Some(handler) = self.accept_handler.clone() {
            handler(self.document.text());
        }
        self.append_to_history();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.working_lines[self.working_index] = String::new();
        self.replace_document(Document::default());
    }
}

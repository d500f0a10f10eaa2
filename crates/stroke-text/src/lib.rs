//! Immutable document model: text plus cursor plus optional selection.
//!
//! A `Document` is a value. Every edit produces a new `Document`; the mutable
//! wrapper that owns the current document and its undo chain lives in
//! `stroke-buffer`. Derived views (line table, cursor row/column) are lazily
//! memoized, so cloning a document is cheap and repeated row/column queries
//! cost one scan total.
//!
//! Design invariants:
//! * `cursor_position` is a byte offset, always on a UTF-8 boundary and
//!   within `0..=text.len()`. Constructors panic otherwise (programmer
//!   error, surfaced synchronously).
//! * Lines are split on `\n` only; callers pre-normalize `\r\n`.
//! * Word-class queries default to the alphanumeric/underscore class; the
//!   capitalized WORD variant means whitespace-delimited.

mod word;

pub use word::WordPattern;

use std::ops::Range;
use std::sync::{Arc, OnceLock};

// -------------------------------------------------------------------------------------------------
// Selection
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionType {
    Characters,
    Lines,
    Block,
}

/// Anchor of an in-progress selection. The moving end is the document cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    pub original_cursor_position: usize,
    pub selection_type: SelectionType,
}

impl SelectionState {
    pub fn new(original_cursor_position: usize) -> Self {
        Self {
            original_cursor_position,
            selection_type: SelectionType::Characters,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Document
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct DocumentCache {
    /// Byte offset of the start of every line (first entry is always 0).
    line_starts: OnceLock<Arc<Vec<usize>>>,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    text: String,
    cursor_position: usize,
    selection: Option<SelectionState>,
    cache: DocumentCache,
}

impl Document {
    /// # Panics
    ///
    /// Panics when `cursor_position` is out of range or not a UTF-8 boundary.
    pub fn new(text: impl Into<String>, cursor_position: usize) -> Self {
        let text = text.into();
        assert!(
            text.is_char_boundary(cursor_position),
            "cursor position {cursor_position} is not a char boundary of the document text"
        );
        Self {
            text,
            cursor_position,
            selection: None,
            cache: DocumentCache::default(),
        }
    }

    /// Document with the cursor at the end of the text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        Self::new(text, cursor)
    }

    pub fn with_selection(mut self, selection: SelectionState) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    pub fn selection(&self) -> Option<&SelectionState> {
        self.selection.as_ref()
    }

    /// Same text and selection, different cursor.
    ///
    /// # Panics
    ///
    /// Panics when `cursor_position` is not a valid boundary.
    pub fn with_cursor(&self, cursor_position: usize) -> Self {
        assert!(
            self.text.is_char_boundary(cursor_position),
            "cursor position {cursor_position} is not a char boundary of the document text"
        );
        Self {
            text: self.text.clone(),
            cursor_position,
            selection: self.selection,
            // Line table depends only on the text; share it.
            cache: self.cache.clone(),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Character / text views around the cursor
    // ---------------------------------------------------------------------------------------------

    pub fn text_before_cursor(&self) -> &str {
        &self.text[..self.cursor_position]
    }

    pub fn text_after_cursor(&self) -> &str {
        &self.text[self.cursor_position..]
    }

    /// Character directly after the cursor, if any.
    pub fn current_char(&self) -> Option<char> {
        self.text_after_cursor().chars().next()
    }

    /// Character directly before the cursor, if any.
    pub fn char_before_cursor(&self) -> Option<char> {
        self.text_before_cursor().chars().next_back()
    }

    pub fn is_cursor_at_the_end(&self) -> bool {
        self.cursor_position == self.text.len()
    }

    pub fn is_cursor_at_the_end_of_line(&self) -> bool {
        matches!(self.current_char(), None | Some('\n'))
    }

    // ---------------------------------------------------------------------------------------------
    // Lines
    // ---------------------------------------------------------------------------------------------

    fn line_starts(&self) -> &Arc<Vec<usize>> {
        self.cache.line_starts.get_or_init(|| {
            let mut starts = vec![0usize];
            for (i, b) in self.text.bytes().enumerate() {
                if b == b'\n' {
                    starts.push(i + 1);
                }
            }
            Arc::new(starts)
        })
    }

    pub fn line_count(&self) -> usize {
        self.line_starts().len()
    }

    /// Byte range of line `row` (newline excluded). `None` past the end.
    pub fn line_range(&self, row: usize) -> Option<Range<usize>> {
        let starts = self.line_starts();
        let start = *starts.get(row)?;
        let end = starts
            .get(row + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        Some(start..end)
    }

    pub fn line(&self, row: usize) -> Option<&str> {
        self.line_range(row).map(|r| &self.text[r])
    }

    pub fn lines(&self) -> Vec<&str> {
        (0..self.line_count()).map(|i| self.line(i).unwrap()).collect()
    }

    pub fn current_line(&self) -> &str {
        self.line(self.cursor_position_row()).unwrap_or("")
    }

    /// (row, col) for an arbitrary byte offset. `col` counts characters from
    /// the line start, not display columns.
    pub fn translate_index_to_position(&self, index: usize) -> (usize, usize) {
        let index = index.min(self.text.len());
        let starts = self.line_starts();
        // Last line whose start is <= index.
        let row = match starts.binary_search(&index) {
            Ok(r) => r,
            Err(ins) => ins - 1,
        };
        let col = self.text[starts[row]..index].chars().count();
        (row, col)
    }

    /// Byte offset for (row, col), clamping both to the document. `col` is in
    /// characters.
    pub fn translate_row_col_to_index(&self, row: usize, col: usize) -> usize {
        let row = row.min(self.line_count() - 1);
        let range = self.line_range(row).unwrap();
        let line = &self.text[range.clone()];
        match line.char_indices().nth(col) {
            Some((off, _)) => range.start + off,
            None => range.end,
        }
    }

    pub fn cursor_position_row(&self) -> usize {
        self.translate_index_to_position(self.cursor_position).0
    }

    pub fn cursor_position_col(&self) -> usize {
        self.translate_index_to_position(self.cursor_position).1
    }

    // ---------------------------------------------------------------------------------------------
    // Cursor movement targets (byte offsets; callers build new documents)
    // ---------------------------------------------------------------------------------------------

    /// Offset `count` characters to the left, stopping at the line start.
    pub fn cursor_left_position(&self, count: usize) -> usize {
        let line_start = self.cursor_position - self.current_line_before_cursor().len();
        let mut pos = self.cursor_position;
        for _ in 0..count {
            match self.text[line_start..pos].chars().next_back() {
                Some(c) => pos -= c.len_utf8(),
                None => break,
            }
        }
        pos
    }

    /// Offset `count` characters to the right, stopping at the line end.
    pub fn cursor_right_position(&self, count: usize) -> usize {
        let mut pos = self.cursor_position;
        for _ in 0..count {
            match self.text[pos..].chars().next() {
                Some('\n') | None => break,
                Some(c) => pos += c.len_utf8(),
            }
        }
        pos
    }

    /// Offset after moving `count` rows up, keeping the column when possible.
    pub fn cursor_up_position(&self, count: usize, preferred_column: Option<usize>) -> usize {
        let (row, col) = self.translate_index_to_position(self.cursor_position);
        let col = preferred_column.unwrap_or(col);
        self.translate_row_col_to_index(row.saturating_sub(count), col)
    }

    /// Offset after moving `count` rows down, keeping the column when possible.
    pub fn cursor_down_position(&self, count: usize, preferred_column: Option<usize>) -> usize {
        let (row, col) = self.translate_index_to_position(self.cursor_position);
        let col = preferred_column.unwrap_or(col);
        let target = (row + count).min(self.line_count() - 1);
        self.translate_row_col_to_index(target, col)
    }

    pub fn start_of_line_position(&self) -> usize {
        self.cursor_position - self.current_line_before_cursor().len()
    }

    pub fn end_of_line_position(&self) -> usize {
        self.cursor_position + self.current_line_after_cursor().len()
    }

    pub fn current_line_before_cursor(&self) -> &str {
        let before = self.text_before_cursor();
        match before.rfind('\n') {
            Some(i) => &before[i + 1..],
            None => before,
        }
    }

    pub fn current_line_after_cursor(&self) -> &str {
        let after = self.text_after_cursor();
        match after.find('\n') {
            Some(i) => &after[..i],
            None => after,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------------------------------

    /// Sorted (from, to) byte range of the selection, `to` exclusive of the
    /// final character's end for `Characters` type: the range covers
    /// min..max+len(char at max) like a caret selection would.
    pub fn selection_range(&self) -> Option<Range<usize>> {
        let sel = self.selection?;
        let (mut from, mut to) = (
            sel.original_cursor_position.min(self.cursor_position),
            sel.original_cursor_position.max(self.cursor_position),
        );
        match sel.selection_type {
            SelectionType::Characters | SelectionType::Block => {
                // Include the character under the far end.
                if let Some(c) = self.text[to..].chars().next() {
                    to += c.len_utf8();
                }
            }
            SelectionType::Lines => {
                let (from_row, _) = self.translate_index_to_position(from);
                let (to_row, _) = self.translate_index_to_position(to);
                from = self.line_range(from_row).unwrap().start;
                to = self.line_range(to_row).unwrap().end;
            }
        }
        Some(from..to)
    }

    pub fn cut_selection_parts(&self) -> Option<(Document, String)> {
        let range = self.selection_range()?;
        let cut = self.text[range.clone()].to_string();
        let mut remaining = String::with_capacity(self.text.len() - cut.len());
        remaining.push_str(&self.text[..range.start]);
        remaining.push_str(&self.text[range.end..]);
        Some((Document::new(remaining, range.start), cut))
    }
}

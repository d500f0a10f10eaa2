//! Input processors: per-line fragment transformations applied by
//! `BufferControl` after lexing (selection highlight, search highlight,
//! extra carets).
//!
//! Processors run in registration order; each receives the previous
//! output. They work on exploded per-character fragments when they need
//! byte positions, so style application never splits a grapheme.

use crate::search::SearchState;
use std::sync::{Arc, Mutex};
use stroke_buffer::Buffer;
use stroke_core::{Fragment, Fragments};
use stroke_text::Document;

pub struct TransformationInput<'a> {
    pub document: &'a Document,
    pub lineno: usize,
    pub fragments: Fragments,
    pub width: usize,
}

pub struct Transformation {
    pub fragments: Fragments,
}

pub trait Processor: Send + Sync {
    fn apply_transformation(&self, input: TransformationInput<'_>) -> Transformation;
}

/// Split fragments into one fragment per character, preserving style and
/// mouse handler.
pub(crate) fn explode_fragments(fragments: &[Fragment]) -> Fragments {
    let mut out = Fragments::new();
    for fragment in fragments {
        for c in fragment.text.chars() {
            out.push(Fragment {
                style: fragment.style.clone(),
                text: c.to_string(),
                mouse_handler: fragment.mouse_handler.clone(),
            });
        }
    }
    out
}

/// Append `style` to every exploded fragment whose starting byte offset
/// (relative to the line start) satisfies `predicate`.
fn style_chars_where(
    fragments: Fragments,
    mut predicate: impl FnMut(usize) -> bool,
    style: &str,
) -> Fragments {
    let mut exploded = explode_fragments(&fragments);
    let mut offset = 0;
    for fragment in exploded.iter_mut() {
        if predicate(offset) {
            if !fragment.style.is_empty() {
                fragment.style.push(' ');
            }
            fragment.style.push_str(style);
        }
        offset += fragment.text.len();
    }
    exploded
}

// -------------------------------------------------------------------------------------------------
// Selection highlight
// -------------------------------------------------------------------------------------------------

#[derive(Default)]
pub struct HighlightSelectionProcessor;

impl Processor for HighlightSelectionProcessor {
    fn apply_transformation(&self, input: TransformationInput<'_>) -> Transformation {
        let Some(selection) = input.document.selection_range() else {
            return Transformation {
                fragments: input.fragments,
            };
        };
        let Some(line_range) = input.document.line_range(input.lineno) else {
            return Transformation {
                fragments: input.fragments,
            };
        };
        if selection.end <= line_range.start || selection.start > line_range.end {
            return Transformation {
                fragments: input.fragments,
            };
        }
        let base = line_range.start;
        let fragments = style_chars_where(
            input.fragments,
            |offset| selection.contains(&(base + offset)),
            "class:selected",
        );
        Transformation { fragments }
    }
}

// -------------------------------------------------------------------------------------------------
// Search highlight
// -------------------------------------------------------------------------------------------------

pub struct HighlightSearchProcessor {
    search_state: Arc<Mutex<SearchState>>,
}

impl HighlightSearchProcessor {
    pub fn new(search_state: Arc<Mutex<SearchState>>) -> Self {
        Self { search_state }
    }
}

impl Processor for HighlightSearchProcessor {
    fn apply_transformation(&self, input: TransformationInput<'_>) -> Transformation {
        let (needle, ignore_case) = {
            let state = self.search_state.lock().unwrap();
            (state.text.clone(), state.ignore_case.eval())
        };
        if needle.is_empty() {
            return Transformation {
                fragments: input.fragments,
            };
        }
        let line_text = stroke_core::fragment_list_to_text(&input.fragments);
        let (haystack, needle_cmp) = if ignore_case {
            (line_text.to_lowercase(), needle.to_lowercase())
        } else {
            (line_text.clone(), needle.clone())
        };

        let mut match_ranges: Vec<(usize, usize)> = Vec::new();
        let mut from = 0;
        while let Some(found) = haystack[from..].find(&needle_cmp) {
            let start = from + found;
            match_ranges.push((start, start + needle_cmp.len()));
            from = start + needle_cmp.len().max(1);
        }
        if match_ranges.is_empty() {
            return Transformation {
                fragments: input.fragments,
            };
        }

        let fragments = style_chars_where(
            input.fragments,
            |offset| match_ranges.iter().any(|(s, e)| offset >= *s && offset < *e),
            "class:search",
        );
        Transformation { fragments }
    }
}

// -------------------------------------------------------------------------------------------------
// Extra carets
// -------------------------------------------------------------------------------------------------

/// Styles the buffer's extra cursor positions (block-insert editing) so
/// every caret is visible.
pub struct DisplayMultipleCursors {
    buffer: Arc<Mutex<Buffer>>,
}

impl DisplayMultipleCursors {
    pub fn new(buffer: Arc<Mutex<Buffer>>) -> Self {
        Self { buffer }
    }
}

impl Processor for DisplayMultipleCursors {
    fn apply_transformation(&self, input: TransformationInput<'_>) -> Transformation {
        let positions = self.buffer.lock().unwrap().multiple_cursor_positions.clone();
        if positions.is_empty() {
            return Transformation {
                fragments: input.fragments,
            };
        }
        let Some(line_range) = input.document.line_range(input.lineno) else {
            return Transformation {
                fragments: input.fragments,
            };
        };
        let base = line_range.start;
        let fragments = style_chars_where(
            input.fragments,
            |offset| positions.contains(&(base + offset)),
            "class:multiple-cursors",
        );
        Transformation { fragments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stroke_core::Filter;
    use stroke_text::SelectionState;

    fn plain(text: &str) -> Fragments {
        vec![Fragment::new("", text)]
    }

    fn styles_of(fragments: &[Fragment]) -> Vec<(&str, &str)> {
        fragments
            .iter()
            .map(|f| (f.style.as_str(), f.text.as_str()))
            .collect()
    }

    #[test]
    fn selection_highlights_covered_chars() {
        let doc = Document::new("abcd", 3).with_selection(SelectionState::new(1));
        let input = TransformationInput {
            document: &doc,
            lineno: 0,
            fragments: plain("abcd"),
            width: 80,
        };
        let out = HighlightSelectionProcessor.apply_transformation(input);
        assert_eq!(
            styles_of(&out.fragments),
            vec![
                ("", "a"),
                ("class:selected", "b"),
                ("class:selected", "c"),
                ("class:selected", "d"),
            ]
        );
    }

    #[test]
    fn selection_on_other_line_is_untouched() {
        let doc = Document::new("ab\ncd", 1).with_selection(SelectionState::new(0));
        let input = TransformationInput {
            document: &doc,
            lineno: 1,
            fragments: plain("cd"),
            width: 80,
        };
        let out = HighlightSelectionProcessor.apply_transformation(input);
        assert_eq!(styles_of(&out.fragments), vec![("", "cd")]);
    }

    #[test]
    fn search_highlights_every_occurrence() {
        let state = Arc::new(Mutex::new(SearchState {
            text: "ab".into(),
            ..SearchState::new()
        }));
        let doc = Document::from_text("ab x ab");
        let input = TransformationInput {
            document: &doc,
            lineno: 0,
            fragments: plain("ab x ab"),
            width: 80,
        };
        let out = HighlightSearchProcessor::new(state).apply_transformation(input);
        let highlighted: String = out
            .fragments
            .iter()
            .filter(|f| f.style.contains("class:search"))
            .map(|f| f.text.as_str())
            .collect();
        assert_eq!(highlighted, "abab");
    }

    #[test]
    fn search_can_ignore_case() {
        let state = Arc::new(Mutex::new(
            SearchState {
                text: "AB".into(),
                ..SearchState::new()
            }
            .with_ignore_case(Filter::always()),
        ));
        let doc = Document::from_text("ab");
        let input = TransformationInput {
            document: &doc,
            lineno: 0,
            fragments: plain("ab"),
            width: 80,
        };
        let out = HighlightSearchProcessor::new(state).apply_transformation(input);
        assert!(out.fragments.iter().all(|f| f.style.contains("class:search")));
    }

    #[test]
    fn multiple_cursors_styled() {
        use stroke_history::InMemoryHistory;
        let mut buffer = Buffer::new(Arc::new(InMemoryHistory::new()));
        buffer.insert_text("abc");
        buffer.multiple_cursor_positions = vec![0, 2];
        let doc = buffer.document().clone();
        let buffer = Arc::new(Mutex::new(buffer));
        let input = TransformationInput {
            document: &doc,
            lineno: 0,
            fragments: plain("abc"),
            width: 80,
        };
        let out = DisplayMultipleCursors::new(buffer).apply_transformation(input);
        assert_eq!(
            styles_of(&out.fragments),
            vec![
                ("class:multiple-cursors", "a"),
                ("", "b"),
                ("class:multiple-cursors", "c"),
            ]
        );
    }
}

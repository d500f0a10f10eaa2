//! Styled text fragments.
//!
//! A `Fragment` pairs a style string with a run of text; a line of rendered
//! content is a `Vec<Fragment>`. Style strings are opaque here: a
//! space-separated mix of `class:` tokens and raw style fragments, resolved
//! by whatever theme layer sits above the renderer.
//!
//! Fragments may carry a mouse handler so controls built from static
//! formatted text can make individual runs clickable.

use crate::mouse::MouseEvent;
use crate::{HandlerOutcome, string_width};
use std::fmt;
use std::sync::Arc;

pub type FragmentMouseHandler = Arc<dyn Fn(&MouseEvent) -> HandlerOutcome + Send + Sync>;

#[derive(Clone, Default)]
pub struct Fragment {
    pub style: String,
    pub text: String,
    pub mouse_handler: Option<FragmentMouseHandler>,
}

impl Fragment {
    pub fn new(style: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            text: text.into(),
            mouse_handler: None,
        }
    }

    pub fn with_handler(
        style: impl Into<String>,
        text: impl Into<String>,
        handler: FragmentMouseHandler,
    ) -> Self {
        Self {
            style: style.into(),
            text: text.into(),
            mouse_handler: Some(handler),
        }
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("style", &self.style)
            .field("text", &self.text)
            .field("has_handler", &self.mouse_handler.is_some())
            .finish()
    }
}

// Handler identity is not part of fragment equality; two fragments compare
// equal when style and text agree.
impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.style == other.style && self.text == other.text
    }
}

impl Eq for Fragment {}

pub type Fragments = Vec<Fragment>;

/// Concatenated plain text of a fragment list.
pub fn fragment_list_to_text(fragments: &[Fragment]) -> String {
    fragments.iter().map(|f| f.text.as_str()).collect()
}

/// Total display width of a fragment list in terminal columns.
pub fn fragment_list_width(fragments: &[Fragment]) -> usize {
    fragments.iter().map(|f| string_width(&f.text)).sum()
}

/// Split a fragment list on `\n` characters into per-line fragment lists.
///
/// The newline characters themselves are dropped. A trailing newline yields a
/// trailing empty line, and empty input yields a single empty line, so the
/// result always has `text.matches('\n').count() + 1` entries. Each
/// fragment's final part is kept even when empty: zero-width fragments carry
/// anchors (cursor/menu style tokens) that must survive the split.
pub fn split_lines(fragments: &[Fragment]) -> Vec<Fragments> {
    let mut lines: Vec<Fragments> = Vec::new();
    let mut current: Fragments = Vec::new();

    for fragment in fragments {
        let parts: Vec<&str> = fragment.text.split('\n').collect();
        for part in &parts[..parts.len() - 1] {
            if !part.is_empty() {
                current.push(Fragment {
                    style: fragment.style.clone(),
                    text: part.to_string(),
                    mouse_handler: fragment.mouse_handler.clone(),
                });
            }
            lines.push(std::mem::take(&mut current));
        }
        current.push(Fragment {
            style: fragment.style.clone(),
            text: parts.last().copied().unwrap_or("").to_string(),
            mouse_handler: fragment.mouse_handler.clone(),
        });
    }
    lines.push(current);
    lines
}

//! Completion engine: sources, combinators, and a streaming protocol.
//!
//! A completer answers "what could be inserted at this cursor" either
//! synchronously (`get_completions`) or as a stream fed from a worker
//! thread (`get_completions_stream`, used by `ThreadedCompleter` so slow
//! sources never stall the event loop). Combinators wrap completers the
//! way filters wrap conditions: merge, deduplicate, gate, resolve late.
//!
//! Design invariants:
//! * `Completion::start_position` is never positive: applying a completion
//!   replaces characters at or before the cursor, never after.
//! * Streams honor cancellation at every yield boundary; a cancelled
//!   consumer sees `Err(Cancelled)` exactly once.
//! * Combinators never invoke wrapped completers they logically bypass
//!   (a false condition, an unfocused document).

mod combinators;
mod fuzzy;
mod nested;
mod path;
mod word;

pub use combinators::{
    ConditionalCompleter, DeduplicateCompleter, DynamicCompleter, ThreadedCompleter,
    merge_completers,
};
pub use fuzzy::{FuzzyCompleter, FuzzyWordCompleter};
pub use nested::{NestedCompleter, NestedSpec};
pub use path::{ExecutableCompleter, PathCompleter};
pub use word::WordCompleter;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use stroke_core::Fragments;
use stroke_text::Document;

// -------------------------------------------------------------------------------------------------
// Completion
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Text inserted when the completion is applied.
    pub text: String,
    /// Character offset (≤ 0) relative to the cursor where insertion
    /// starts; the characters in between are replaced.
    pub start_position: isize,
    pub display: Option<Fragments>,
    pub display_meta: Option<Fragments>,
    pub style: String,
    pub selected_style: String,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_position: 0,
            display: None,
            display_meta: None,
            style: String::new(),
            selected_style: String::new(),
        }
    }

    /// # Panics
    ///
    /// Panics when `start_position` is positive.
    pub fn with_start_position(mut self, start_position: isize) -> Self {
        assert!(
            start_position <= 0,
            "completion start_position must be <= 0, got {start_position}"
        );
        self.start_position = start_position;
        self
    }

    pub fn with_display(mut self, display: Fragments) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_display_meta(mut self, display_meta: Fragments) -> Self {
        self.display_meta = Some(display_meta);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Text shown in a completion menu (falls back to the inserted text).
    pub fn display_text(&self) -> String {
        match &self.display {
            Some(fragments) => stroke_core::fragment_list_to_text(fragments),
            None => self.text.clone(),
        }
    }

    /// The (text, cursor) the document would hold after applying this
    /// completion.
    pub fn applied_to(&self, document: &Document) -> (String, usize) {
        let replace_chars = (-self.start_position) as usize;
        let before = document.text_before_cursor();
        let mut start = document.cursor_position();
        for c in before.chars().rev().take(replace_chars) {
            start -= c.len_utf8();
        }
        let mut text = String::with_capacity(document.text().len() + self.text.len());
        text.push_str(&document.text()[..start]);
        text.push_str(&self.text);
        let cursor = text.len();
        text.push_str(document.text_after_cursor());
        (text, cursor)
    }
}

// -------------------------------------------------------------------------------------------------
// Events, cancellation, streaming
// -------------------------------------------------------------------------------------------------

/// Why completions are being requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompleteEvent {
    /// The user asked explicitly (tab).
    pub completion_requested: bool,
    /// Triggered by typing.
    pub text_inserted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("completion enumeration cancelled")]
pub struct Cancelled;

/// Shared cancellation flag checked at every stream yield.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

enum StreamSource {
    Ready(VecDeque<Completion>),
    Channel(crossbeam_channel::Receiver<Completion>),
}

/// Iterator over streamed completions. After cancellation the consumer
/// observes `Err(Cancelled)` once, then the stream ends.
pub struct CompletionStream {
    source: StreamSource,
    cancel: CancellationToken,
    cancelled_delivered: bool,
}

impl CompletionStream {
    pub fn from_vec(completions: Vec<Completion>, cancel: CancellationToken) -> Self {
        Self {
            source: StreamSource::Ready(completions.into()),
            cancel,
            cancelled_delivered: false,
        }
    }

    pub fn from_channel(
        rx: crossbeam_channel::Receiver<Completion>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source: StreamSource::Channel(rx),
            cancel,
            cancelled_delivered: false,
        }
    }
}

impl Iterator for CompletionStream {
    type Item = Result<Completion, Cancelled>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cancel.is_cancelled() {
            if self.cancelled_delivered {
                return None;
            }
            self.cancelled_delivered = true;
            return Some(Err(Cancelled));
        }
        match &mut self.source {
            StreamSource::Ready(queue) => queue.pop_front().map(Ok),
            StreamSource::Channel(rx) => rx.recv().ok().map(Ok),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Completer trait
// -------------------------------------------------------------------------------------------------

pub trait Completer: Send + Sync {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion>;

    /// Streaming variant; the default yields the synchronous results.
    fn get_completions_stream(
        &self,
        document: &Document,
        event: &CompleteEvent,
        cancel: &CancellationToken,
    ) -> CompletionStream {
        CompletionStream::from_vec(self.get_completions(document, event), cancel.clone())
    }
}

/// Completer that never has suggestions.
#[derive(Debug, Default)]
pub struct DummyCompleter;

impl Completer for DummyCompleter {
    fn get_completions(&self, _document: &Document, _event: &CompleteEvent) -> Vec<Completion> {
        Vec::new()
    }
}

// -------------------------------------------------------------------------------------------------
// Common suffix
// -------------------------------------------------------------------------------------------------

/// Longest suffix that every completion appends identically. Returns `""`
/// as soon as any completion would alter the text before the cursor
/// differently from the others.
pub fn get_common_complete_suffix(document: &Document, completions: &[Completion]) -> String {
    // A completion that rewrites the replaced region to something other
    // than what is already there forbids a common suffix.
    for completion in completions {
        let replace_chars = (-completion.start_position) as usize;
        let replaced: String = completion.text.chars().take(replace_chars).collect();
        if !document.text_before_cursor().ends_with(&replaced) {
            return String::new();
        }
    }

    let suffixes: Vec<String> = completions
        .iter()
        .map(|c| {
            let replace_chars = (-c.start_position) as usize;
            c.text.chars().skip(replace_chars).collect()
        })
        .collect();

    let Some(first) = suffixes.first() else {
        return String::new();
    };
    let mut common: &str = first;
    for suffix in &suffixes[1..] {
        let mut shared = 0;
        for (a, b) in common.chars().zip(suffix.chars()) {
            if a != b {
                break;
            }
            shared += a.len_utf8();
        }
        common = &common[..shared];
    }
    common.to_string()
}

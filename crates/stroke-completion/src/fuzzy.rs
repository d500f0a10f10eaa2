//! Fuzzy filtering over another completer.
//!
//! The typed word is treated as a character subsequence: `"oar"` matches
//! `leopard` and `dinosaur`. The inner completer runs against a document
//! with the word removed, its results are filtered by the subsequence
//! match, ranked by (match start, match length, original order), and given
//! a display that highlights the matched characters.

use crate::{CompleteEvent, Completer, Completion};
use regex::Regex;
use std::sync::Arc;
use stroke_core::{Filter, Fragment, Fragments};
use stroke_text::{Document, WordPattern};
use tracing::trace;

use crate::WordCompleter;

struct FuzzyMatch {
    /// Character offset where the (shortest) match begins.
    start: usize,
    /// Character length of that match.
    length: usize,
    completion: Completion,
}

/// Shortest subsequence match of `needle` in `text`, case-insensitive.
/// Returns (start, length) in characters. An empty needle matches at 0
/// with length 0.
fn shortest_subsequence_match(text: &str, needle: &str) -> Option<(usize, usize)> {
    let text: Vec<char> = text.chars().flat_map(|c| c.to_lowercase()).collect();
    let needle: Vec<char> = needle.chars().flat_map(|c| c.to_lowercase()).collect();
    if needle.is_empty() {
        return Some((0, 0));
    }

    let mut best: Option<(usize, usize)> = None;
    for start in 0..text.len() {
        if text[start] != needle[0] {
            continue;
        }
        // Greedy scan: the nearest next occurrence of each needle char
        // yields the shortest match beginning at `start`.
        let mut pos = start;
        let mut ok = true;
        for c in &needle[1..] {
            match text[pos + 1..].iter().position(|t| t == c) {
                Some(offset) => pos = pos + 1 + offset,
                None => {
                    ok = false;
                    break;
                }
            }
        }
        if ok {
            let length = pos - start + 1;
            // Strict `<` keeps the earliest of equally short matches.
            if best.is_none_or(|(_, l)| length < l) {
                best = Some((start, length));
            }
        }
    }
    best
}

pub struct FuzzyCompleter {
    inner: Arc<dyn Completer>,
    enable_fuzzy: Filter,
    /// Custom word-extraction pattern; must be anchored with `^`.
    pattern: Option<String>,
    word: bool,
}

impl FuzzyCompleter {
    /// # Panics
    ///
    /// Panics when `pattern` does not start with `^`.
    pub fn new(inner: Arc<dyn Completer>) -> Self {
        Self {
            inner,
            enable_fuzzy: Filter::always(),
            pattern: None,
            word: false,
        }
    }

    pub fn with_enable_fuzzy(mut self, enable_fuzzy: Filter) -> Self {
        self.enable_fuzzy = enable_fuzzy;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        assert!(
            pattern.starts_with('^'),
            "fuzzy completer pattern must be anchored with '^'"
        );
        self.pattern = Some(pattern);
        self
    }

    /// Use whitespace-delimited tokens as the fuzzy query.
    pub fn with_word(mut self, word: bool) -> Self {
        self.word = word;
        self
    }

    fn word_pattern(&self) -> WordPattern {
        match (&self.pattern, self.word) {
            (Some(pattern), _) => {
                // The anchor applies to the original end-anchored search;
                // extraction works on "match ending at cursor" directly.
                WordPattern::Custom(
                    Regex::new(pattern.trim_start_matches('^'))
                        .unwrap_or_else(|e| panic!("invalid fuzzy pattern: {e}")),
                )
            }
            (None, true) => WordPattern::BigWord,
            (None, false) => WordPattern::Word,
        }
    }

    fn fuzzy_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        let word_before_cursor = document
            .get_word_before_cursor(&self.word_pattern())
            .to_string();

        // Run the inner completer as if the fuzzy query were not typed.
        let stripped_cursor = document.cursor_position() - word_before_cursor.len();
        let stripped = Document::new(
            document.text()[..stripped_cursor].to_string(),
            stripped_cursor,
        );
        let inner = self.inner.get_completions(&stripped, event);

        let mut matches: Vec<FuzzyMatch> = Vec::new();
        for completion in inner {
            if let Some((start, length)) =
                shortest_subsequence_match(&completion.text, &word_before_cursor)
            {
                matches.push(FuzzyMatch {
                    start,
                    length,
                    completion,
                });
            }
        }
        trace!(target: "completion.fuzzy", query_len = word_before_cursor.chars().count(), survivors = matches.len(), "filtered");

        // Stable sort keeps the inner completer's order among ties.
        matches.sort_by_key(|m| (m.start, m.length));

        let query_chars = word_before_cursor.chars().count() as isize;
        matches
            .into_iter()
            .map(|m| {
                let display = highlight_match(&m, &word_before_cursor);
                let start_position = m.completion.start_position - query_chars;
                let mut completion = m.completion;
                completion.start_position = start_position;
                completion.display = Some(display);
                completion
            })
            .collect()
    }
}

/// Fragments for the completion text with the fuzzy-matched region (and the
/// individually matched characters within it) highlighted.
fn highlight_match(m: &FuzzyMatch, word: &str) -> Fragments {
    let chars: Vec<char> = m.completion.text.chars().collect();
    if m.length == 0 {
        return vec![Fragment::new("", m.completion.text.clone())];
    }
    let mut fragments = Fragments::new();
    let before: String = chars[..m.start].iter().collect();
    if !before.is_empty() {
        fragments.push(Fragment::new("class:fuzzymatch.outside", before));
    }
    let mut pending: Vec<char> = word.chars().collect();
    for c in &chars[m.start..m.start + m.length] {
        let mut class = "class:fuzzymatch.inside".to_string();
        if pending
            .first()
            .is_some_and(|p| p.to_lowercase().eq(c.to_lowercase()))
        {
            class.push_str(".character");
            pending.remove(0);
        }
        fragments.push(Fragment::new(class, c.to_string()));
    }
    let after: String = chars[m.start + m.length..].iter().collect();
    if !after.is_empty() {
        fragments.push(Fragment::new("class:fuzzymatch.outside", after));
    }
    fragments
}

impl Completer for FuzzyCompleter {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        if self.enable_fuzzy.eval() {
            self.fuzzy_completions(document, event)
        } else {
            self.inner.get_completions(document, event)
        }
    }
}

/// Word list behind a fuzzy filter, for the common case.
pub struct FuzzyWordCompleter {
    fuzzy: FuzzyCompleter,
}

impl FuzzyWordCompleter {
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fuzzy: FuzzyCompleter::new(Arc::new(WordCompleter::new(words))),
        }
    }
}

impl Completer for FuzzyWordCompleter {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        self.fuzzy.get_completions(document, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn animals() -> Arc<dyn Completer> {
        Arc::new(WordCompleter::new([
            "leopard", "gorilla", "dinosaur", "cat", "bee",
        ]))
    }

    fn texts(completions: &[Completion]) -> Vec<&str> {
        completions.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn subsequence_survivors_in_rank_order() {
        let completer = FuzzyCompleter::new(animals());
        let doc = Document::new("oar", 3);
        let got = completer.get_completions(&doc, &CompleteEvent::default());
        // leopard: match "opar" starting at 2; dinosaur: "osaur" at 3.
        assert_eq!(texts(&got), vec!["leopard", "dinosaur"]);
    }

    #[test]
    fn start_position_covers_the_query() {
        let completer = FuzzyCompleter::new(animals());
        let doc = Document::new("oar", 3);
        let got = completer.get_completions(&doc, &CompleteEvent::default());
        assert!(got.iter().all(|c| c.start_position == -3));
    }

    #[test]
    fn empty_query_passes_everything_through() {
        let completer = FuzzyCompleter::new(animals());
        let doc = Document::new("", 0);
        let got = completer.get_completions(&doc, &CompleteEvent::default());
        assert_eq!(got.len(), 5);
        assert_eq!(texts(&got)[0], "leopard");
    }

    #[test]
    fn disabled_fuzzy_is_passthrough() {
        let completer =
            FuzzyCompleter::new(animals()).with_enable_fuzzy(Filter::never());
        let doc = Document::new("oar", 3);
        // Plain prefix match on "oar" finds nothing.
        assert!(
            completer
                .get_completions(&doc, &CompleteEvent::default())
                .is_empty()
        );
    }

    #[test]
    fn match_is_case_insensitive() {
        let completer = FuzzyCompleter::new(Arc::new(WordCompleter::new(["LeoPard"])));
        let doc = Document::new("oar", 3);
        assert_eq!(
            texts(&completer.get_completions(&doc, &CompleteEvent::default())),
            vec!["LeoPard"]
        );
    }

    #[test]
    fn display_highlights_matched_characters() {
        let completer = FuzzyCompleter::new(animals());
        let doc = Document::new("oar", 3);
        let got = completer.get_completions(&doc, &CompleteEvent::default());
        let display = got[0].display.as_ref().unwrap();
        let highlighted: String = display
            .iter()
            .filter(|f| f.style.ends_with(".character"))
            .map(|f| f.text.as_str())
            .collect();
        assert_eq!(highlighted, "oar");
    }

    #[test]
    #[should_panic(expected = "anchored")]
    fn unanchored_pattern_panics() {
        FuzzyCompleter::new(animals()).with_pattern("[a-z]+");
    }

    #[test]
    fn shortest_match_prefers_compact_windows() {
        assert_eq!(shortest_subsequence_match("abcb", "ab"), Some((0, 2)));
        // The window starting at 3 ("ab", length 2) beats the one starting
        // at 0 (length 5).
        assert_eq!(shortest_subsequence_match("axxab", "ab"), Some((3, 2)));
        assert_eq!(shortest_subsequence_match("cat", "oar"), None);
    }

    #[test]
    fn fuzzy_word_completer_end_to_end() {
        let completer = FuzzyWordCompleter::new(["dinosaur", "bee"]);
        let doc = Document::new("dsr", 3);
        assert_eq!(
            texts(&completer.get_completions(&doc, &CompleteEvent::default())),
            vec!["dinosaur"]
        );
    }
}

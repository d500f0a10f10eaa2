//! Word-class queries over a document.
//!
//! Two word classes exist side by side: the regex-word sense (runs of
//! `[A-Za-z0-9_]`) and the capitalized WORD sense (runs of non-whitespace).
//! Completion additionally uses a "sentence" mode that treats everything
//! since the last newline as the unit.

use crate::Document;
use regex::Regex;
use std::sync::OnceLock;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_]+").unwrap())
}

fn big_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\s]+").unwrap())
}

/// Which unit a word query operates on.
#[derive(Debug, Clone)]
pub enum WordPattern {
    /// Alphanumeric/underscore runs (the default).
    Word,
    /// Whitespace-delimited runs (vi WORD).
    BigWord,
    /// Everything from the last newline (or document start) to the cursor.
    Sentence,
    /// Caller-supplied pattern.
    Custom(Regex),
}

impl Default for WordPattern {
    fn default() -> Self {
        WordPattern::Word
    }
}

impl WordPattern {
    fn regex(&self) -> &Regex {
        match self {
            WordPattern::Word => word_re(),
            WordPattern::BigWord => big_word_re(),
            WordPattern::Custom(re) => re,
            WordPattern::Sentence => {
                unreachable!("sentence mode does not use a regex")
            }
        }
    }
}

impl Document {
    /// The word ending exactly at the cursor, or `""` when the character
    /// before the cursor is not part of one.
    pub fn get_word_before_cursor(&self, pattern: &WordPattern) -> &str {
        if let WordPattern::Sentence = pattern {
            return self.current_line_before_cursor();
        }
        let before = self.text_before_cursor();
        for m in pattern.regex().find_iter(before) {
            if m.end() == before.len() {
                return &before[m.start()..];
            }
        }
        ""
    }

    /// Byte offset where the word ending at the cursor starts. Equals the
    /// cursor position itself when there is no such word.
    pub fn find_start_of_word_before_cursor(&self, pattern: &WordPattern) -> usize {
        self.cursor_position() - self.get_word_before_cursor(pattern).len()
    }

    /// Start of the `count`-th next word strictly after the cursor position
    /// (the word under the cursor does not count). Absolute byte offset.
    pub fn find_next_word_beginning(&self, count: usize, pattern: &WordPattern) -> Option<usize> {
        let after = self.text_after_cursor();
        let mut remaining = count.max(1);
        for (i, m) in pattern.regex().find_iter(after).enumerate() {
            if i == 0 && m.start() == 0 {
                // Currently inside this word; it is not a "next" beginning.
                continue;
            }
            remaining -= 1;
            if remaining == 0 {
                return Some(self.cursor_position() + m.start());
            }
        }
        None
    }

    /// End of the `count`-th word ending after the cursor. The end of the
    /// word the cursor sits in counts, unless the cursor is already on its
    /// final character boundary.
    pub fn find_next_word_ending(&self, count: usize, pattern: &WordPattern) -> Option<usize> {
        // Skip one character so a cursor resting on a word's last character
        // advances to the following word, vi-style.
        let skip = match self.text_after_cursor().chars().next() {
            Some(c) => c.len_utf8(),
            None => return None,
        };
        let base = self.cursor_position() + skip;
        let text = &self.text()[base..];
        let mut remaining = count.max(1);
        for m in pattern.regex().find_iter(text) {
            remaining -= 1;
            if remaining == 0 {
                return Some(base + m.end());
            }
        }
        None
    }

    /// Start of the `count`-th word beginning before the cursor.
    pub fn find_previous_word_beginning(
        &self,
        count: usize,
        pattern: &WordPattern,
    ) -> Option<usize> {
        let before = self.text_before_cursor();
        let starts: Vec<usize> = pattern
            .regex()
            .find_iter(before)
            .map(|m| m.start())
            .collect();
        let count = count.max(1);
        starts.len().checked_sub(count).map(|i| starts[i])
    }

    /// End of the `count`-th word ending strictly before the cursor.
    pub fn find_previous_word_ending(&self, count: usize, pattern: &WordPattern) -> Option<usize> {
        let before = self.text_before_cursor();
        let ends: Vec<usize> = pattern
            .regex()
            .find_iter(before)
            .map(|m| m.end())
            .filter(|&end| end < before.len())
            .collect();
        let count = count.max(1);
        ends.len().checked_sub(count).map(|i| ends[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use pretty_assertions::assert_eq;

    const W: &WordPattern = &WordPattern::Word;
    const BW: &WordPattern = &WordPattern::BigWord;

    #[test]
    fn word_before_cursor() {
        let d = Document::new("echo hel", 8);
        assert_eq!(d.get_word_before_cursor(W), "hel");
        assert_eq!(d.find_start_of_word_before_cursor(W), 5);
    }

    #[test]
    fn word_before_cursor_stops_at_punctuation() {
        let d = Document::new("a.b", 3);
        assert_eq!(d.get_word_before_cursor(W), "b");
        assert_eq!(d.get_word_before_cursor(BW), "a.b");
    }

    #[test]
    fn no_word_before_cursor_after_space() {
        let d = Document::new("word ", 5);
        assert_eq!(d.get_word_before_cursor(W), "");
    }

    #[test]
    fn sentence_takes_whole_line() {
        let d = Document::new("first\nsecond part", 14);
        assert_eq!(
            d.get_word_before_cursor(&WordPattern::Sentence),
            "second p"
        );
    }

    #[test]
    fn next_word_beginning_skips_current() {
        let d = Document::new("one two three", 1); // inside "one"
        assert_eq!(d.find_next_word_beginning(1, W), Some(4));
        assert_eq!(d.find_next_word_beginning(2, W), Some(8));
        assert_eq!(d.find_next_word_beginning(3, W), None);
    }

    #[test]
    fn next_word_ending() {
        let d = Document::new("one two", 0);
        assert_eq!(d.find_next_word_ending(1, W), Some(3));
        assert_eq!(d.find_next_word_ending(2, W), Some(7));
        // Cursor on last character of the document: nothing further.
        let d = Document::new("one", 2);
        assert_eq!(d.find_next_word_ending(1, W), None);
    }

    #[test]
    fn previous_word_beginning() {
        let d = Document::new("one two three", 8); // at "three"
        assert_eq!(d.find_previous_word_beginning(1, W), Some(4));
        assert_eq!(d.find_previous_word_beginning(2, W), Some(0));
        assert_eq!(d.find_previous_word_beginning(3, W), None);
    }

    #[test]
    fn previous_word_ending_excludes_word_at_cursor() {
        let d = Document::new("one two", 7); // cursor at end of "two"
        // "two" ends at the cursor itself, so only "one" qualifies.
        assert_eq!(d.find_previous_word_ending(1, W), Some(3));
        assert_eq!(d.find_previous_word_ending(2, W), None);
    }

    #[test]
    fn custom_pattern() {
        let p = WordPattern::Custom(Regex::new(r"[0-9]+").unwrap());
        let d = Document::new("abc 123", 7);
        assert_eq!(d.get_word_before_cursor(&p), "123");
    }
}

//! Word-list completion.

use crate::{CompleteEvent, Completer, Completion};
use std::collections::HashMap;
use std::sync::Arc;
use stroke_core::Fragment;
use stroke_text::{Document, WordPattern};

type WordsResolver = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

enum WordSource {
    Fixed(Vec<String>),
    Resolver(WordsResolver),
}

/// Completes from a word list (fixed or resolved per call), filtering by
/// the word before the cursor.
pub struct WordCompleter {
    source: WordSource,
    ignore_case: bool,
    /// Match anywhere in the candidate instead of only its prefix.
    match_middle: bool,
    pattern: WordPattern,
    display_dict: HashMap<String, String>,
    meta_dict: HashMap<String, String>,
}

impl WordCompleter {
    pub fn new(words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            source: WordSource::Fixed(words.into_iter().map(Into::into).collect()),
            ignore_case: false,
            match_middle: false,
            pattern: WordPattern::Word,
            display_dict: HashMap::new(),
            meta_dict: HashMap::new(),
        }
    }

    pub fn from_resolver(resolver: impl Fn() -> Vec<String> + Send + Sync + 'static) -> Self {
        Self {
            source: WordSource::Resolver(Arc::new(resolver)),
            ignore_case: false,
            match_middle: false,
            pattern: WordPattern::Word,
            display_dict: HashMap::new(),
            meta_dict: HashMap::new(),
        }
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn match_middle(mut self, match_middle: bool) -> Self {
        self.match_middle = match_middle;
        self
    }

    /// Word-extraction unit: `WordPattern::BigWord` for whitespace-delimited
    /// tokens, `WordPattern::Sentence` for whole-line matching. The enum
    /// makes the WORD/sentence combination unrepresentable.
    pub fn pattern(mut self, pattern: WordPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn display_dict(mut self, display_dict: HashMap<String, String>) -> Self {
        self.display_dict = display_dict;
        self
    }

    pub fn meta_dict(mut self, meta_dict: HashMap<String, String>) -> Self {
        self.meta_dict = meta_dict;
        self
    }

    fn words(&self) -> Vec<String> {
        match &self.source {
            WordSource::Fixed(words) => words.clone(),
            WordSource::Resolver(resolver) => resolver(),
        }
    }
}

impl Completer for WordCompleter {
    fn get_completions(&self, document: &Document, _event: &CompleteEvent) -> Vec<Completion> {
        let word = document.get_word_before_cursor(&self.pattern);
        let needle = if self.ignore_case {
            word.to_lowercase()
        } else {
            word.to_string()
        };
        let start_position = -(word.chars().count() as isize);

        let mut out = Vec::new();
        for candidate in self.words() {
            let haystack = if self.ignore_case {
                candidate.to_lowercase()
            } else {
                candidate.clone()
            };
            let hit = if self.match_middle {
                haystack.contains(&needle)
            } else {
                haystack.starts_with(&needle)
            };
            if !hit {
                continue;
            }
            let mut completion =
                Completion::new(candidate.clone()).with_start_position(start_position);
            if let Some(display) = self.display_dict.get(&candidate) {
                completion = completion.with_display(vec![Fragment::new("", display.clone())]);
            }
            if let Some(meta) = self.meta_dict.get(&candidate) {
                completion = completion.with_display_meta(vec![Fragment::new("", meta.clone())]);
            }
            out.push(completion);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(completions: &[Completion]) -> Vec<&str> {
        completions.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn prefix_filtering() {
        let completer = WordCompleter::new(["apple", "apricot", "banana"]);
        let doc = Document::new("ap", 2);
        let got = completer.get_completions(&doc, &CompleteEvent::default());
        assert_eq!(texts(&got), vec!["apple", "apricot"]);
        assert!(got.iter().all(|c| c.start_position == -2));
    }

    #[test]
    fn empty_word_matches_everything() {
        let completer = WordCompleter::new(["a", "b"]);
        let doc = Document::new("", 0);
        assert_eq!(
            completer
                .get_completions(&doc, &CompleteEvent::default())
                .len(),
            2
        );
    }

    #[test]
    fn case_folding() {
        let completer = WordCompleter::new(["Apple"]).ignore_case(true);
        let doc = Document::new("ap", 2);
        assert_eq!(
            texts(&completer.get_completions(&doc, &CompleteEvent::default())),
            vec!["Apple"]
        );
    }

    #[test]
    fn match_middle_is_substring_search() {
        let completer = WordCompleter::new(["leopard", "cat"]).match_middle(true);
        let doc = Document::new("opa", 3);
        assert_eq!(
            texts(&completer.get_completions(&doc, &CompleteEvent::default())),
            vec!["leopard"]
        );
    }

    #[test]
    fn sentence_pattern_uses_whole_line() {
        let completer =
            WordCompleter::new(["git commit", "git checkout"]).pattern(WordPattern::Sentence);
        let doc = Document::new("git c", 5);
        let got = completer.get_completions(&doc, &CompleteEvent::default());
        assert_eq!(texts(&got), vec!["git commit", "git checkout"]);
        assert!(got.iter().all(|c| c.start_position == -5));
    }

    #[test]
    fn meta_dict_attaches_meta() {
        let mut meta = HashMap::new();
        meta.insert("ls".to_string(), "list files".to_string());
        let completer = WordCompleter::new(["ls"]).meta_dict(meta);
        let doc = Document::new("l", 1);
        let got = completer.get_completions(&doc, &CompleteEvent::default());
        assert_eq!(
            got[0].display_meta.as_ref().unwrap()[0].text,
            "list files"
        );
    }

    #[test]
    fn resolver_reconsulted_every_call() {
        use std::sync::Mutex;
        let words = Arc::new(Mutex::new(vec!["one".to_string()]));
        let source = words.clone();
        let completer = WordCompleter::from_resolver(move || source.lock().unwrap().clone());
        let doc = Document::new("", 0);
        assert_eq!(
            completer
                .get_completions(&doc, &CompleteEvent::default())
                .len(),
            1
        );
        words.lock().unwrap().push("two".to_string());
        assert_eq!(
            completer
                .get_completions(&doc, &CompleteEvent::default())
                .len(),
            2
        );
    }
}

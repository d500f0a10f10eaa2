//! Hierarchical command completion: first token selects a sub-completer.

use crate::{CompleteEvent, Completer, Completion, WordCompleter};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use stroke_text::{Document, WordPattern};

/// Declarative spec for building a [`NestedCompleter`] tree.
pub enum NestedSpec {
    /// Leaf command with no arguments.
    None,
    /// Leaf with a flat set of argument words.
    Words(Vec<String>),
    /// Sub-commands, recursively.
    Map(BTreeMap<String, NestedSpec>),
    /// Hand-written sub-completer.
    Completer(Arc<dyn Completer>),
}

/// Completes the first whitespace-delimited token from its key set, then
/// delegates the rest of the line to the matching sub-completer.
pub struct NestedCompleter {
    options: HashMap<String, Option<Arc<dyn Completer>>>,
    ignore_case: bool,
}

impl NestedCompleter {
    pub fn new(options: HashMap<String, Option<Arc<dyn Completer>>>, ignore_case: bool) -> Self {
        Self {
            options,
            ignore_case,
        }
    }

    /// Build recursively from a spec tree.
    pub fn from_spec(spec: BTreeMap<String, NestedSpec>, ignore_case: bool) -> Self {
        let mut options: HashMap<String, Option<Arc<dyn Completer>>> = HashMap::new();
        for (key, value) in spec {
            let sub: Option<Arc<dyn Completer>> = match value {
                NestedSpec::None => None,
                NestedSpec::Words(words) => {
                    let mut sub_spec = BTreeMap::new();
                    for word in words {
                        sub_spec.insert(word, NestedSpec::None);
                    }
                    Some(Arc::new(Self::from_spec(sub_spec, ignore_case)))
                }
                NestedSpec::Map(map) => Some(Arc::new(Self::from_spec(map, ignore_case))),
                NestedSpec::Completer(completer) => Some(completer),
            };
            options.insert(key, sub);
        }
        Self::new(options, ignore_case)
    }
}

impl Completer for NestedCompleter {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        let text = document.text_before_cursor().trim_start();

        // Past the first token: delegate to the sub-completer with a
        // document holding only the remainder (the cursor sits at its end).
        if let Some(first_term) = text.split_whitespace().next()
            && text.len() > first_term.len()
        {
            let Some(Some(completer)) = self.options.get(first_term) else {
                return Vec::new();
            };
            let remaining = text[first_term.len()..].trim_start();
            let sub_document = Document::new(remaining.to_string(), remaining.len());
            return completer.get_completions(&sub_document, event);
        }

        // Still inside the first token: complete from the key set.
        let keys: Vec<String> = self.options.keys().cloned().collect();
        WordCompleter::new(keys)
            .ignore_case(self.ignore_case)
            .pattern(WordPattern::BigWord)
            .get_completions(document, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec() -> BTreeMap<String, NestedSpec> {
        let mut show = BTreeMap::new();
        show.insert("version".to_string(), NestedSpec::None);
        show.insert("clock".to_string(), NestedSpec::None);
        let mut root = BTreeMap::new();
        root.insert("show".to_string(), NestedSpec::Map(show));
        root.insert("exit".to_string(), NestedSpec::None);
        root
    }

    fn texts(completions: &[Completion]) -> Vec<String> {
        let mut texts: Vec<String> = completions.iter().map(|c| c.text.clone()).collect();
        texts.sort();
        texts
    }

    #[test]
    fn first_token_completes_from_keys() {
        let completer = NestedCompleter::from_spec(spec(), true);
        let doc = Document::new("s", 1);
        assert_eq!(
            texts(&completer.get_completions(&doc, &CompleteEvent::default())),
            vec!["show".to_string()]
        );
    }

    #[test]
    fn second_token_delegates() {
        let completer = NestedCompleter::from_spec(spec(), true);
        let doc = Document::new("show v", 6);
        assert_eq!(
            texts(&completer.get_completions(&doc, &CompleteEvent::default())),
            vec!["version".to_string()]
        );
    }

    #[test]
    fn leading_whitespace_is_stripped() {
        let completer = NestedCompleter::from_spec(spec(), true);
        let doc = Document::new("   show cl", 10);
        assert_eq!(
            texts(&completer.get_completions(&doc, &CompleteEvent::default())),
            vec!["clock".to_string()]
        );
    }

    #[test]
    fn unknown_first_token_yields_nothing() {
        let completer = NestedCompleter::from_spec(spec(), true);
        let doc = Document::new("nope x", 6);
        assert!(
            completer
                .get_completions(&doc, &CompleteEvent::default())
                .is_empty()
        );
    }

    #[test]
    fn leaf_without_arguments_yields_nothing_after_token() {
        let completer = NestedCompleter::from_spec(spec(), true);
        let doc = Document::new("exit n", 6);
        assert!(
            completer
                .get_completions(&doc, &CompleteEvent::default())
                .is_empty()
        );
    }

    #[test]
    fn words_spec_builds_flat_sub_completer() {
        let mut root = BTreeMap::new();
        root.insert(
            "lang".to_string(),
            NestedSpec::Words(vec!["rust".into(), "ruby".into()]),
        );
        let completer = NestedCompleter::from_spec(root, false);
        let doc = Document::new("lang ru", 7);
        assert_eq!(
            texts(&completer.get_completions(&doc, &CompleteEvent::default())),
            vec!["ruby".to_string(), "rust".to_string()]
        );
    }
}

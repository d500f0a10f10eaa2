//! Completer combinators: merge, dedupe, gate, resolve late, thread off.

use crate::{
    CancellationToken, CompleteEvent, Completer, Completion, CompletionStream, DummyCompleter,
};
use std::collections::HashSet;
use std::sync::Arc;
use stroke_core::Filter;
use stroke_text::Document;
use tracing::{debug, trace};

/// Worker → consumer channel depth for threaded streaming.
const STREAM_CHANNEL_CAP: usize = 64;

// -------------------------------------------------------------------------------------------------
// Merge
// -------------------------------------------------------------------------------------------------

struct MergedCompleter {
    completers: Vec<Arc<dyn Completer>>,
}

impl Completer for MergedCompleter {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        let mut out = Vec::new();
        for completer in &self.completers {
            out.extend(completer.get_completions(document, event));
        }
        out
    }
}

/// Yield from each completer in order. With `deduplicate`, completions that
/// would produce an already-seen document are dropped.
pub fn merge_completers(
    completers: Vec<Arc<dyn Completer>>,
    deduplicate: bool,
) -> Arc<dyn Completer> {
    let merged = Arc::new(MergedCompleter { completers });
    if deduplicate {
        Arc::new(DeduplicateCompleter::new(merged))
    } else {
        merged
    }
}

// -------------------------------------------------------------------------------------------------
// Deduplicate
// -------------------------------------------------------------------------------------------------

/// Drops completions whose application result (text, cursor) repeats an
/// earlier one, and completions that would change nothing at all.
pub struct DeduplicateCompleter {
    inner: Arc<dyn Completer>,
}

impl DeduplicateCompleter {
    pub fn new(inner: Arc<dyn Completer>) -> Self {
        Self { inner }
    }
}

impl Completer for DeduplicateCompleter {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        let mut seen: HashSet<(String, usize)> = HashSet::new();
        let mut out = Vec::new();
        for completion in self.inner.get_completions(document, event) {
            let applied = completion.applied_to(document);
            if applied.0 == document.text() && applied.1 == document.cursor_position() {
                continue; // no-op completion
            }
            if seen.insert(applied) {
                out.push(completion);
            }
        }
        out
    }
}

// -------------------------------------------------------------------------------------------------
// Conditional
// -------------------------------------------------------------------------------------------------

/// Gate: when the filter is false, yields nothing and never consults the
/// wrapped completer.
pub struct ConditionalCompleter {
    inner: Arc<dyn Completer>,
    filter: Filter,
}

impl ConditionalCompleter {
    pub fn new(inner: Arc<dyn Completer>, filter: Filter) -> Self {
        Self { inner, filter }
    }
}

impl Completer for ConditionalCompleter {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        if self.filter.eval() {
            self.inner.get_completions(document, event)
        } else {
            Vec::new()
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Dynamic
// -------------------------------------------------------------------------------------------------

pub type CompleterResolver = Arc<dyn Fn() -> Option<Arc<dyn Completer>> + Send + Sync>;

/// Resolves the real completer on every call; `None` completes nothing.
pub struct DynamicCompleter {
    resolver: CompleterResolver,
}

impl DynamicCompleter {
    pub fn new(resolver: impl Fn() -> Option<Arc<dyn Completer>> + Send + Sync + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    fn resolve(&self) -> Arc<dyn Completer> {
        (self.resolver)().unwrap_or_else(|| Arc::new(DummyCompleter))
    }
}

impl Completer for DynamicCompleter {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        self.resolve().get_completions(document, event)
    }

    fn get_completions_stream(
        &self,
        document: &Document,
        event: &CompleteEvent,
        cancel: &CancellationToken,
    ) -> CompletionStream {
        self.resolve().get_completions_stream(document, event, cancel)
    }
}

// -------------------------------------------------------------------------------------------------
// Threaded
// -------------------------------------------------------------------------------------------------

/// Runs the wrapped completer on a worker thread and streams its results
/// through a bounded channel. Cancellation is honored at every send: the
/// worker stops producing and exits at the next yield boundary.
pub struct ThreadedCompleter {
    inner: Arc<dyn Completer>,
}

impl ThreadedCompleter {
    pub fn new(inner: Arc<dyn Completer>) -> Self {
        Self { inner }
    }
}

impl Completer for ThreadedCompleter {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        self.inner.get_completions(document, event)
    }

    fn get_completions_stream(
        &self,
        document: &Document,
        event: &CompleteEvent,
        cancel: &CancellationToken,
    ) -> CompletionStream {
        let (tx, rx) = crossbeam_channel::bounded::<Completion>(STREAM_CHANNEL_CAP);
        let inner = self.inner.clone();
        let document = document.clone();
        let event = *event;
        let worker_cancel = cancel.clone();
        std::thread::Builder::new()
            .name("stroke-completion".into())
            .spawn(move || {
                let completions = inner.get_completions(&document, &event);
                debug!(target: "completion.threaded", count = completions.len(), "worker produced");
                for completion in completions {
                    if worker_cancel.is_cancelled() {
                        trace!(target: "completion.threaded", "cancelled");
                        return;
                    }
                    if tx.send(completion).is_err() {
                        return; // consumer dropped the stream
                    }
                }
            })
            .expect("spawn completion worker");
        CompletionStream::from_channel(rx, cancel.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WordCompleter;
    use pretty_assertions::assert_eq;

    fn words(words: &[&str]) -> Arc<dyn Completer> {
        Arc::new(WordCompleter::new(words.to_vec()))
    }

    fn texts(completions: &[Completion]) -> Vec<&str> {
        completions.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn merge_preserves_order() {
        let merged = merge_completers(vec![words(&["b", "a"]), words(&["c"])], false);
        let doc = Document::new("", 0);
        assert_eq!(
            texts(&merged.get_completions(&doc, &CompleteEvent::default())),
            vec!["b", "a", "c"]
        );
    }

    #[test]
    fn merge_of_one_behaves_like_inner() {
        let inner = words(&["x", "y"]);
        let merged = merge_completers(vec![inner.clone()], false);
        let doc = Document::new("", 0);
        let event = CompleteEvent::default();
        assert_eq!(
            texts(&merged.get_completions(&doc, &event)),
            texts(&inner.get_completions(&doc, &event))
        );
    }

    #[test]
    fn deduplicate_by_resulting_document() {
        let merged = merge_completers(vec![words(&["same", "other"]), words(&["same"])], true);
        let doc = Document::new("", 0);
        assert_eq!(
            texts(&merged.get_completions(&doc, &CompleteEvent::default())),
            vec!["same", "other"]
        );
    }

    #[test]
    fn deduplicate_drops_noop_completions() {
        // Completing "same" when "same" is already typed changes nothing.
        struct Noop;
        impl Completer for Noop {
            fn get_completions(&self, _: &Document, _: &CompleteEvent) -> Vec<Completion> {
                vec![Completion::new("same").with_start_position(-4)]
            }
        }
        let completer = DeduplicateCompleter::new(Arc::new(Noop));
        let doc = Document::new("same", 4);
        assert!(
            completer
                .get_completions(&doc, &CompleteEvent::default())
                .is_empty()
        );
    }

    #[test]
    fn deduplicate_is_idempotent() {
        let inner = words(&["aa", "ab", "aa"]);
        let once = DeduplicateCompleter::new(inner.clone());
        let twice = DeduplicateCompleter::new(Arc::new(DeduplicateCompleter::new(inner)));
        let doc = Document::new("a", 1);
        let event = CompleteEvent::default();
        assert_eq!(
            texts(&once.get_completions(&doc, &event)),
            texts(&twice.get_completions(&doc, &event))
        );
    }

    #[test]
    fn conditional_false_never_consults_inner() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        struct Counting(Arc<AtomicUsize>);
        impl Completer for Counting {
            fn get_completions(&self, _: &Document, _: &CompleteEvent) -> Vec<Completion> {
                self.0.fetch_add(1, Ordering::SeqCst);
                vec![Completion::new("x")]
            }
        }
        let calls = Arc::new(AtomicUsize::new(0));
        let completer =
            ConditionalCompleter::new(Arc::new(Counting(calls.clone())), Filter::never());
        let doc = Document::new("", 0);
        assert!(
            completer
                .get_completions(&doc, &CompleteEvent::default())
                .is_empty()
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dynamic_none_is_dummy() {
        let completer = DynamicCompleter::new(|| None);
        let doc = Document::new("", 0);
        assert!(
            completer
                .get_completions(&doc, &CompleteEvent::default())
                .is_empty()
        );
    }

    #[test]
    fn threaded_streams_all_results() {
        let completer = ThreadedCompleter::new(words(&["alpha", "beta"]));
        let doc = Document::new("", 0);
        let cancel = CancellationToken::new();
        let got: Vec<Completion> = completer
            .get_completions_stream(&doc, &CompleteEvent::default(), &cancel)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(texts(&got), vec!["alpha", "beta"]);
    }

    #[test]
    fn threaded_cancellation_surfaces_error() {
        let completer = ThreadedCompleter::new(words(&["alpha", "beta"]));
        let doc = Document::new("", 0);
        let cancel = CancellationToken::new();
        let mut stream =
            completer.get_completions_stream(&doc, &CompleteEvent::default(), &cancel);
        cancel.cancel();
        // The next pull after cancellation observes the error.
        let mut saw_cancelled = false;
        for item in stream.by_ref() {
            if item.is_err() {
                saw_cancelled = true;
                break;
            }
        }
        assert!(saw_cancelled);
    }
}

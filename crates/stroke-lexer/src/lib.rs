//! Line-lazy document tokenization.
//!
//! A lexer turns a `Document` into a line-number → styled-fragments
//! function. The interesting implementation is [`SyntaxLexer`], which wraps
//! an external token stream and restarts it from syntax sync points so
//! requesting line 5000 of a large document does not tokenize lines
//! 0..4999 first, while sequential access reuses an already-running stream.
//!
//! Design invariants:
//! * Out-of-range line numbers return `[]`, never panic.
//! * `invalidation_hash` changes when the produced fragments could; upstream
//!   content caches compare it across frames.
//! * Token-stream anomalies (missing text, odd indices) degrade to plain
//!   passthrough, never an error.

mod sync;
mod syntax;

pub use sync::{RegexSync, SyncFromStart, SyntaxSync};
pub use syntax::{SyntaxLexer, Token, TokenProvider};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stroke_core::{Fragment, Fragments};
use stroke_text::Document;

/// Per-line fragment access for one frozen document.
pub type LineGetter = Arc<dyn Fn(usize) -> Fragments + Send + Sync>;

pub trait Lexer: Send + Sync {
    fn lex_document(&self, document: &Document) -> LineGetter;

    /// Compared across frames by content caches; a change discards them.
    fn invalidation_hash(&self) -> u64;
}

/// Process-unique id used as a default invalidation hash.
pub(crate) fn next_lexer_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

// -------------------------------------------------------------------------------------------------
// SimpleLexer
// -------------------------------------------------------------------------------------------------

/// Applies one style to every line, verbatim.
pub struct SimpleLexer {
    style: String,
    id: u64,
}

impl SimpleLexer {
    pub fn new(style: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            id: next_lexer_id(),
        }
    }
}

impl Default for SimpleLexer {
    fn default() -> Self {
        Self::new("")
    }
}

impl Lexer for SimpleLexer {
    fn lex_document(&self, document: &Document) -> LineGetter {
        let lines: Arc<Vec<String>> =
            Arc::new(document.lines().into_iter().map(str::to_string).collect());
        let style = self.style.clone();
        Arc::new(move |line_no| match lines.get(line_no) {
            Some(line) => vec![Fragment::new(style.clone(), line.clone())],
            None => Vec::new(),
        })
    }

    fn invalidation_hash(&self) -> u64 {
        self.id
    }
}

// -------------------------------------------------------------------------------------------------
// DynamicLexer
// -------------------------------------------------------------------------------------------------

pub type LexerResolver = Arc<dyn Fn() -> Option<Arc<dyn Lexer>> + Send + Sync>;

/// Delegates to whatever lexer the resolver currently returns; `None` falls
/// back to an unstyled passthrough.
pub struct DynamicLexer {
    resolver: LexerResolver,
    fallback: Arc<SimpleLexer>,
}

impl DynamicLexer {
    pub fn new(resolver: impl Fn() -> Option<Arc<dyn Lexer>> + Send + Sync + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
            fallback: Arc::new(SimpleLexer::default()),
        }
    }

    fn delegate(&self) -> Arc<dyn Lexer> {
        match (self.resolver)() {
            Some(lexer) => lexer,
            None => self.fallback.clone(),
        }
    }
}

impl Lexer for DynamicLexer {
    fn lex_document(&self, document: &Document) -> LineGetter {
        self.delegate().lex_document(document)
    }

    fn invalidation_hash(&self) -> u64 {
        self.delegate().invalidation_hash()
    }
}

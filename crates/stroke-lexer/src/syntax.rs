//! Token-stream lexer with sync-point restarts and stream reuse.

use crate::sync::{SyncFromStart, SyntaxSync};
use crate::{Lexer, LineGetter, next_lexer_id};
use ahash::AHashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use stroke_core::{Filter, Fragment, Fragments};
use stroke_text::Document;
use tracing::trace;

// -------------------------------------------------------------------------------------------------
// External token stream
// -------------------------------------------------------------------------------------------------

/// One token from the external stream. `index` is the provider-reported
/// source offset; it is carried through untouched and never trusted for
/// positioning, so a misbehaving provider cannot crash the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub index: i64,
    pub path: Vec<String>,
    pub text: Option<String>,
}

impl Token {
    pub fn new(index: i64, path: Vec<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            path,
            text: Some(text.into()),
        }
    }
}

/// External tokenizer. The input is handed over as `Arc<str>` so providers
/// can move it into a lazily-evaluated stream.
pub trait TokenProvider: Send + Sync {
    fn tokens(&self, text: Arc<str>) -> Box<dyn Iterator<Item = Token> + Send>;
}

// -------------------------------------------------------------------------------------------------
// Token path → style string memo
// -------------------------------------------------------------------------------------------------

#[derive(Default)]
struct TokenStyleCache {
    cache: AHashMap<Vec<String>, String>,
}

impl TokenStyleCache {
    fn style_for(&mut self, path: &[String]) -> String {
        if let Some(hit) = self.cache.get(path) {
            return hit.clone();
        }
        let mut style = String::from("class:pygments");
        for piece in path {
            style.push('.');
            style.push_str(&piece.to_lowercase());
        }
        self.cache.insert(path.to_vec(), style.clone());
        style
    }
}

// -------------------------------------------------------------------------------------------------
// Token stream → per-line fragments
// -------------------------------------------------------------------------------------------------

/// Adapts a token stream into `(line_no, fragments)` items, one per source
/// line starting at `row`.
struct LineStream {
    tokens: Box<dyn Iterator<Item = Token> + Send>,
    styles: Arc<Mutex<TokenStyleCache>>,
    row: usize,
    current: Fragments,
    ready: VecDeque<(usize, Fragments)>,
    done: bool,
}

impl LineStream {
    fn new(
        tokens: Box<dyn Iterator<Item = Token> + Send>,
        styles: Arc<Mutex<TokenStyleCache>>,
        row: usize,
        unstyled_prefix: &str,
    ) -> Self {
        let mut current = Fragments::new();
        if !unstyled_prefix.is_empty() {
            current.push(Fragment::new("", unstyled_prefix));
        }
        Self {
            tokens,
            styles,
            row,
            current,
            ready: VecDeque::new(),
            done: false,
        }
    }
}

impl Iterator for LineStream {
    type Item = (usize, Fragments);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(line);
            }
            if self.done {
                return None;
            }
            match self.tokens.next() {
                Some(token) => {
                    let style = self.styles.lock().unwrap().style_for(&token.path);
                    let text = token.text.unwrap_or_default();
                    let mut parts = text.split('\n');
                    if let Some(first) = parts.next()
                        && !first.is_empty()
                    {
                        self.current.push(Fragment::new(style.clone(), first));
                    }
                    for part in parts {
                        self.ready
                            .push_back((self.row, std::mem::take(&mut self.current)));
                        self.row += 1;
                        if !part.is_empty() {
                            self.current.push(Fragment::new(style.clone(), part));
                        }
                    }
                }
                None => {
                    self.done = true;
                    self.ready
                        .push_back((self.row, std::mem::take(&mut self.current)));
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------
// SyntaxLexer
// -------------------------------------------------------------------------------------------------

struct Generator {
    stream: LineStream,
    /// The next line this stream will yield.
    line: usize,
}

struct LexState {
    cache: AHashMap<usize, Fragments>,
    generators: Vec<Generator>,
}

/// Wraps an external token provider into a line-lazy lexer.
pub struct SyntaxLexer {
    provider: Arc<dyn TokenProvider>,
    sync_from_start: Filter,
    syntax_sync: Arc<dyn SyntaxSync>,
    styles: Arc<Mutex<TokenStyleCache>>,
    id: u64,
}

impl SyntaxLexer {
    /// A running stream within this many lines above a request is advanced
    /// instead of starting a fresh one.
    const REUSE_GENERATOR_MAX_DISTANCE: usize = 100;
    /// Restart at least this many lines above the request, so scrolling
    /// upward does not restart per line.
    const MIN_LINES_BACKWARDS: usize = 50;

    pub fn new(provider: Arc<dyn TokenProvider>, syntax_sync: Arc<dyn SyntaxSync>) -> Self {
        Self {
            provider,
            sync_from_start: Filter::never(),
            syntax_sync,
            styles: Arc::new(Mutex::new(TokenStyleCache::default())),
            id: next_lexer_id(),
        }
    }

    /// Tokenize from the document start on every restart (correct for
    /// grammars without usable sync points).
    pub fn from_start(provider: Arc<dyn TokenProvider>) -> Self {
        let mut lexer = Self::new(provider, Arc::new(SyncFromStart));
        lexer.sync_from_start = Filter::always();
        lexer
    }

    pub fn with_sync_from_start(mut self, filter: Filter) -> Self {
        self.sync_from_start = filter;
        self
    }
}

impl Lexer for SyntaxLexer {
    fn lex_document(&self, document: &Document) -> LineGetter {
        let document = document.clone();
        let line_count = document.line_count();
        let provider = self.provider.clone();
        let styles = self.styles.clone();
        let state = Arc::new(Mutex::new(LexState {
            cache: AHashMap::new(),
            generators: Vec::new(),
        }));
        let sync_from_start = self.sync_from_start.clone();
        let syntax_sync = self.syntax_sync.clone();

        Arc::new(move |line_no| {
            if line_no >= line_count {
                return Vec::new();
            }
            let mut state = state.lock().unwrap();
            if let Some(hit) = state.cache.get(&line_no) {
                return hit.clone();
            }

            let LexState { cache, generators } = &mut *state;

            // Prefer an already-running stream shortly above the request.
            let reusable = generators
                .iter()
                .enumerate()
                .filter(|(_, g)| {
                    g.line <= line_no
                        && line_no - g.line < SyntaxLexer::REUSE_GENERATOR_MAX_DISTANCE
                })
                .max_by_key(|(_, g)| g.line)
                .map(|(i, _)| i);

            let index = match reusable {
                Some(index) => index,
                None => {
                    let (row, column) = if sync_from_start.eval() {
                        (0, 0)
                    } else {
                        let target = line_no.saturating_sub(SyntaxLexer::MIN_LINES_BACKWARDS);
                        if target == 0 {
                            (0, 0)
                        } else {
                            syntax_sync.get_sync_start_position(&document, target)
                        }
                    };
                    trace!(target: "lexer.sync", line = line_no, row, column, "restart");
                    let joined = document.lines()[row..].join("\n");
                    let (prefix, rest) = joined.split_at(column.min(joined.len()));
                    let tokens = provider.tokens(Arc::from(rest));
                    generators.push(Generator {
                        stream: LineStream::new(tokens, styles.clone(), row, prefix),
                        line: row,
                    });
                    generators.len() - 1
                }
            };
            let generator = &mut generators[index];

            // Advance the stream to the requested line, caching every line
            // it produces along the way.
            while let Some((row, fragments)) = generator.stream.next() {
                generator.line = row + 1;
                cache.insert(row, fragments);
                if row >= line_no {
                    break;
                }
            }

            cache.get(&line_no).cloned().unwrap_or_default()
        })
    }

    fn invalidation_hash(&self) -> u64 {
        self.id
    }
}

//! UI controls: producers of line-by-line styled content.
//!
//! A control answers size queries, renders a `UIContent` snapshot for a
//! given width/height, and optionally reacts to mouse events delivered in
//! content coordinates (the owning window translates from screen cells).

use crate::processors::{Processor, TransformationInput};
use crate::search::SearchState;
use ahash::AHashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use stroke_buffer::Buffer;
use stroke_core::{
    Filter, Fragment, Fragments, HandlerOutcome, MouseButton, MouseEvent, MouseEventType, Point,
    fragment_list_width, split_lines, string_width,
};
use stroke_keys::KeyBindingsBase;
use stroke_lexer::{Lexer, SimpleLexer};
use stroke_text::SelectionType;
use tracing::trace;

/// Style token that anchors the cursor to a fragment of formatted text.
pub const SET_CURSOR_POSITION: &str = "[SetCursorPosition]";
/// Style token that anchors a completion menu to a fragment.
pub const SET_MENU_POSITION: &str = "[SetMenuPosition]";

/// Two clicks within this span (at the same cell) form a double click.
const DOUBLE_CLICK_SPAN: Duration = Duration::from_millis(500);

/// Height reported for a line that cannot wrap into a zero-width window.
const UNWRAPPABLE_HEIGHT: usize = 100_000_000;

pub type GetLinePrefix = Arc<dyn Fn(usize, usize) -> Fragments + Send + Sync>;

// -------------------------------------------------------------------------------------------------
// UIContent
// -------------------------------------------------------------------------------------------------

/// Immutable per-frame snapshot of a control's output.
#[derive(Clone)]
pub struct UIContent {
    get_line: Arc<dyn Fn(usize) -> Fragments + Send + Sync>,
    pub line_count: usize,
    pub cursor_position: Option<Point>,
    pub menu_position: Option<Point>,
    pub show_cursor: bool,
    height_cache: Arc<Mutex<AHashMap<(usize, usize, Option<usize>), usize>>>,
}

impl UIContent {
    pub fn new(
        get_line: Arc<dyn Fn(usize) -> Fragments + Send + Sync>,
        line_count: usize,
    ) -> Self {
        Self {
            get_line,
            line_count,
            cursor_position: None,
            menu_position: None,
            show_cursor: true,
            height_cache: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    pub fn empty() -> Self {
        Self::new(Arc::new(|_| Vec::new()), 0)
    }

    pub fn with_cursor_position(mut self, cursor: Point) -> Self {
        self.cursor_position = Some(cursor);
        self
    }

    pub fn with_menu_position(mut self, menu: Point) -> Self {
        self.menu_position = Some(menu);
        self
    }

    pub fn with_show_cursor(mut self, show_cursor: bool) -> Self {
        self.show_cursor = show_cursor;
        self
    }

    pub fn get_line(&self, line_no: usize) -> Fragments {
        if line_no >= self.line_count {
            return Vec::new();
        }
        (self.get_line)(line_no)
    }

    /// Screen rows needed to render `line_no` at `width`, wrapping included.
    ///
    /// `slice_stop` truncates the line to that many characters first (used
    /// for cursor-row computations). Prefix-aware heights walk the line
    /// character by character, subtracting the per-wrap-row prefix width.
    pub fn get_height_for_line(
        &self,
        line_no: usize,
        width: usize,
        get_line_prefix: Option<&GetLinePrefix>,
        slice_stop: Option<usize>,
    ) -> usize {
        if width == 0 {
            return UNWRAPPABLE_HEIGHT;
        }
        let cache_key = (line_no, width, slice_stop);
        if get_line_prefix.is_none()
            && let Some(hit) = self.height_cache.lock().unwrap().get(&cache_key)
        {
            return *hit;
        }

        let fragments = self.get_line(line_no);
        let text = stroke_core::fragment_list_to_text(&fragments);
        let text: String = match slice_stop {
            Some(stop) => text.chars().take(stop).collect(),
            None => text,
        };

        let height = match get_line_prefix {
            None => {
                let total = string_width(&text);
                total.div_ceil(width).max(1)
            }
            Some(prefix) => {
                let mut row = 0usize;
                let mut line_width = 0usize;
                let mut available =
                    width.saturating_sub(fragment_list_width(&prefix(line_no, 0)));
                if available == 0 {
                    return UNWRAPPABLE_HEIGHT;
                }
                for c in text.chars() {
                    let w = stroke_core::char_width(c);
                    if line_width + w > available {
                        row += 1;
                        line_width = 0;
                        available =
                            width.saturating_sub(fragment_list_width(&prefix(line_no, row)));
                        if available == 0 {
                            return UNWRAPPABLE_HEIGHT;
                        }
                    }
                    line_width += w;
                }
                row + 1
            }
        };

        if get_line_prefix.is_none() {
            self.height_cache.lock().unwrap().insert(cache_key, height);
        }
        height
    }
}

// -------------------------------------------------------------------------------------------------
// UIControl trait
// -------------------------------------------------------------------------------------------------

pub trait UIControl: Send + Sync {
    fn reset(&self) {}

    fn preferred_width(&self, max_available_width: usize) -> Option<usize>;

    fn preferred_height(
        &self,
        width: usize,
        max_available_height: usize,
        wrap_lines: bool,
        get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize>;

    fn is_focusable(&self) -> bool {
        false
    }

    fn create_content(&self, width: usize, height: usize) -> UIContent;

    /// Mouse events in content coordinates: `y` is the source line, `x`
    /// the column. `NotImplemented` bubbles the event to the window.
    fn mouse_handler(&self, _event: &MouseEvent) -> HandlerOutcome {
        HandlerOutcome::NotImplemented
    }

    fn move_cursor_down(&self) {}
    fn move_cursor_up(&self) {}

    fn get_key_bindings(&self) -> Option<Arc<dyn KeyBindingsBase>> {
        None
    }

    /// Compared across frames; a change invalidates cached content.
    fn invalidation_hash(&self) -> u64 {
        0
    }
}

// -------------------------------------------------------------------------------------------------
// DummyControl
// -------------------------------------------------------------------------------------------------

/// Zero-size control that writes nothing.
#[derive(Default)]
pub struct DummyControl;

impl UIControl for DummyControl {
    fn preferred_width(&self, _max_available_width: usize) -> Option<usize> {
        Some(0)
    }

    fn preferred_height(
        &self,
        _width: usize,
        _max_available_height: usize,
        _wrap_lines: bool,
        _get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        Some(0)
    }

    fn create_content(&self, _width: usize, _height: usize) -> UIContent {
        UIContent::empty().with_show_cursor(false)
    }
}

// -------------------------------------------------------------------------------------------------
// FormattedTextControl
// -------------------------------------------------------------------------------------------------

/// Static (or callable) styled text. Fragments may embed cursor/menu
/// anchors via the `[SetCursorPosition]` / `[SetMenuPosition]` style
/// tokens and may carry mouse handlers for clickable runs.
pub struct FormattedTextControl {
    text: Arc<dyn Fn() -> Fragments + Send + Sync>,
    focusable: Filter,
    key_bindings: Option<Arc<dyn KeyBindingsBase>>,
    show_cursor: bool,
}

impl FormattedTextControl {
    pub fn new(fragments: Fragments) -> Self {
        Self::from_fn(move || fragments.clone())
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![Fragment::new("", text)])
    }

    pub fn from_fn(f: impl Fn() -> Fragments + Send + Sync + 'static) -> Self {
        Self {
            text: Arc::new(f),
            focusable: Filter::never(),
            key_bindings: None,
            show_cursor: true,
        }
    }

    pub fn with_focusable(mut self, focusable: Filter) -> Self {
        self.focusable = focusable;
        self
    }

    pub fn with_key_bindings(mut self, key_bindings: Arc<dyn KeyBindingsBase>) -> Self {
        self.key_bindings = Some(key_bindings);
        self
    }

    pub fn with_show_cursor(mut self, show_cursor: bool) -> Self {
        self.show_cursor = show_cursor;
        self
    }

    fn lines(&self) -> Vec<Fragments> {
        split_lines(&(self.text)())
    }
}

impl UIControl for FormattedTextControl {
    fn preferred_width(&self, _max_available_width: usize) -> Option<usize> {
        self.lines().iter().map(|l| fragment_list_width(l)).max()
    }

    fn preferred_height(
        &self,
        width: usize,
        max_available_height: usize,
        wrap_lines: bool,
        get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        let content = self.create_content(width, max_available_height);
        if wrap_lines {
            let total: usize = (0..content.line_count)
                .map(|i| content.get_height_for_line(i, width, get_line_prefix, None))
                .sum();
            Some(total.min(max_available_height))
        } else {
            Some(content.line_count)
        }
    }

    fn is_focusable(&self) -> bool {
        self.focusable.eval()
    }

    fn create_content(&self, _width: usize, _height: usize) -> UIContent {
        let lines = self.lines();

        // Locate embedded cursor/menu anchors.
        let mut cursor = None;
        let mut menu = None;
        for (y, line) in lines.iter().enumerate() {
            let mut x = 0;
            for fragment in line {
                if fragment.style.contains(SET_CURSOR_POSITION) {
                    cursor.get_or_insert(Point { x, y });
                }
                if fragment.style.contains(SET_MENU_POSITION) {
                    menu.get_or_insert(Point { x, y });
                }
                x += string_width(&fragment.text);
            }
        }

        let line_count = lines.len();
        let lines = Arc::new(lines);
        let mut content = UIContent::new(
            Arc::new(move |i| lines.get(i).cloned().unwrap_or_default()),
            line_count,
        )
        .with_show_cursor(self.show_cursor);
        if let Some(cursor) = cursor {
            content = content.with_cursor_position(cursor);
        }
        if let Some(menu) = menu {
            content = content.with_menu_position(menu);
        }
        content
    }

    fn mouse_handler(&self, event: &MouseEvent) -> HandlerOutcome {
        let lines = self.lines();
        let Some(line) = lines.get(event.position.y) else {
            return HandlerOutcome::NotImplemented;
        };
        // Find the fragment under the clicked column.
        let mut x = 0;
        for fragment in line {
            let width = string_width(&fragment.text);
            if event.position.x < x + width {
                return match &fragment.mouse_handler {
                    Some(handler) => handler(event),
                    None => HandlerOutcome::NotImplemented,
                };
            }
            x += width;
        }
        HandlerOutcome::NotImplemented
    }

    fn get_key_bindings(&self) -> Option<Arc<dyn KeyBindingsBase>> {
        self.key_bindings.clone()
    }
}

// -------------------------------------------------------------------------------------------------
// BufferControl
// -------------------------------------------------------------------------------------------------

#[derive(Default)]
struct ClickState {
    last_click: Option<(Instant, Point)>,
    count: usize,
}

struct ContentCacheEntry {
    buffer_version: u64,
    lexer_hash: u64,
    width: usize,
    content: UIContent,
}

/// Renders a `Buffer`'s document through a lexer and a chain of input
/// processors. Content is cached per (buffer version, lexer, width).
pub struct BufferControl {
    buffer: Arc<Mutex<Buffer>>,
    lexer: Arc<dyn Lexer>,
    input_processors: Vec<Arc<dyn Processor>>,
    focusable: Filter,
    key_bindings: Option<Arc<dyn KeyBindingsBase>>,
    cache: Mutex<Option<ContentCacheEntry>>,
    click_state: Mutex<ClickState>,
}

impl BufferControl {
    pub fn new(buffer: Arc<Mutex<Buffer>>) -> Self {
        Self {
            buffer,
            lexer: Arc::new(SimpleLexer::default()),
            input_processors: Vec::new(),
            focusable: Filter::always(),
            key_bindings: None,
            cache: Mutex::new(None),
            click_state: Mutex::new(ClickState::default()),
        }
    }

    pub fn with_lexer(mut self, lexer: Arc<dyn Lexer>) -> Self {
        self.lexer = lexer;
        self
    }

    pub fn with_input_processors(mut self, processors: Vec<Arc<dyn Processor>>) -> Self {
        self.input_processors = processors;
        self
    }

    pub fn with_focusable(mut self, focusable: Filter) -> Self {
        self.focusable = focusable;
        self
    }

    pub fn with_key_bindings(mut self, key_bindings: Arc<dyn KeyBindingsBase>) -> Self {
        self.key_bindings = Some(key_bindings);
        self
    }

    pub fn buffer(&self) -> Arc<Mutex<Buffer>> {
        self.buffer.clone()
    }

    /// Select the word under the cursor (double click).
    fn select_word_at_cursor(buffer: &mut Buffer) {
        let document = buffer.document().clone();
        let row = document.cursor_position_row();
        let Some(line_range) = document.line_range(row) else {
            return;
        };
        let cursor = document.cursor_position();
        let line = &document.text()[line_range.clone()];
        // The word run covering (or touching) the cursor.
        for m in word_regex().find_iter(line) {
            let (start, end) = (line_range.start + m.start(), line_range.start + m.end());
            if cursor >= start && cursor <= end {
                buffer.set_cursor_position(start);
                buffer.start_selection(SelectionType::Characters);
                let back = end
                    - document.text()[..end]
                        .chars()
                        .next_back()
                        .map(char::len_utf8)
                        .unwrap_or(0);
                // `set_cursor_position` keeps the selection anchor intact.
                buffer.set_cursor_position(back);
                return;
            }
        }
    }

    fn select_line_at_cursor(buffer: &mut Buffer) {
        let document = buffer.document().clone();
        let row = document.cursor_position_row();
        let Some(line_range) = document.line_range(row) else {
            return;
        };
        buffer.set_cursor_position(line_range.start);
        buffer.start_selection(SelectionType::Lines);
        buffer.set_cursor_position(
            document
                .text()
                .get(line_range.clone())
                .and_then(|line| line.chars().next_back())
                .map(|c| line_range.end - c.len_utf8())
                .unwrap_or(line_range.start),
        );
    }
}

fn word_regex() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"[A-Za-z0-9_]+").unwrap())
}

impl UIControl for BufferControl {
    fn preferred_width(&self, _max_available_width: usize) -> Option<usize> {
        // The window decides; editing content should not dictate layout.
        None
    }

    fn preferred_height(
        &self,
        width: usize,
        max_available_height: usize,
        wrap_lines: bool,
        get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        let content = self.create_content(width, max_available_height);
        if wrap_lines {
            let total: usize = (0..content.line_count)
                .map(|i| content.get_height_for_line(i, width, get_line_prefix, None))
                .sum();
            Some(total.min(max_available_height))
        } else {
            Some(content.line_count)
        }
    }

    fn is_focusable(&self) -> bool {
        self.focusable.eval()
    }

    fn create_content(&self, width: usize, _height: usize) -> UIContent {
        let (document, buffer_version) = {
            let buffer = self.buffer.lock().unwrap();
            (buffer.document().clone(), buffer.version())
        };
        let lexer_hash = self.lexer.invalidation_hash();

        {
            let cache = self.cache.lock().unwrap();
            if let Some(entry) = cache.as_ref()
                && entry.buffer_version == buffer_version
                && entry.lexer_hash == lexer_hash
                && entry.width == width
            {
                return entry.content.clone();
            }
        }
        trace!(target: "layout.buffer_control", version = buffer_version, width, "content_rebuild");

        let get_lexed = self.lexer.lex_document(&document);
        let processors = self.input_processors.clone();
        let doc_for_lines = Arc::new(document.clone());
        let get_line: Arc<dyn Fn(usize) -> Fragments + Send + Sync> =
            Arc::new(move |line_no| {
                let mut fragments = get_lexed(line_no);
                for processor in &processors {
                    fragments = processor
                        .apply_transformation(TransformationInput {
                            document: doc_for_lines.as_ref(),
                            lineno: line_no,
                            fragments,
                            width,
                        })
                        .fragments;
                }
                fragments
            });

        let cursor = Point {
            x: document.cursor_position_col(),
            y: document.cursor_position_row(),
        };
        let content = UIContent::new(get_line, document.line_count())
            .with_cursor_position(cursor);

        *self.cache.lock().unwrap() = Some(ContentCacheEntry {
            buffer_version,
            lexer_hash,
            width,
            content: content.clone(),
        });
        content
    }

    fn mouse_handler(&self, event: &MouseEvent) -> HandlerOutcome {
        let mut buffer = self.buffer.lock().unwrap();
        let index = buffer
            .document()
            .translate_row_col_to_index(event.position.y, event.position.x);

        match (event.event_type, event.button) {
            (MouseEventType::MouseDown, MouseButton::Left) => {
                let count = {
                    let mut state = self.click_state.lock().unwrap();
                    let now = Instant::now();
                    let repeat = state.last_click.is_some_and(|(at, pos)| {
                        now.duration_since(at) < DOUBLE_CLICK_SPAN && pos == event.position
                    });
                    state.count = if repeat { state.count + 1 } else { 1 };
                    state.last_click = Some((now, event.position));
                    state.count
                };
                match count {
                    1 => {
                        buffer.exit_selection();
                        buffer.set_cursor_position(index);
                    }
                    2 => {
                        buffer.set_cursor_position(index);
                        Self::select_word_at_cursor(&mut buffer);
                    }
                    _ => {
                        buffer.set_cursor_position(index);
                        Self::select_line_at_cursor(&mut buffer);
                    }
                }
                HandlerOutcome::Handled
            }
            (MouseEventType::MouseMove, MouseButton::Left) => {
                // Drag: extend (or start) the selection.
                if buffer.document().selection().is_none() {
                    buffer.start_selection(SelectionType::Characters);
                }
                buffer.set_cursor_position(index);
                HandlerOutcome::Handled
            }
            (MouseEventType::MouseUp, _) => HandlerOutcome::Handled,
            _ => HandlerOutcome::NotImplemented,
        }
    }

    fn move_cursor_down(&self) {
        self.buffer.lock().unwrap().cursor_down(1);
    }

    fn move_cursor_up(&self) {
        self.buffer.lock().unwrap().cursor_up(1);
    }

    fn get_key_bindings(&self) -> Option<Arc<dyn KeyBindingsBase>> {
        self.key_bindings.clone()
    }

    fn invalidation_hash(&self) -> u64 {
        self.buffer.lock().unwrap().version() ^ self.lexer.invalidation_hash().rotate_left(32)
    }
}

// -------------------------------------------------------------------------------------------------
// SearchBufferControl
// -------------------------------------------------------------------------------------------------

/// Buffer control for a search field: owns the `SearchState` that other
/// controls highlight against.
pub struct SearchBufferControl {
    control: BufferControl,
    search_state: Arc<Mutex<SearchState>>,
}

impl SearchBufferControl {
    pub fn new(buffer: Arc<Mutex<Buffer>>, ignore_case: Filter) -> Self {
        let search_state = Arc::new(Mutex::new(
            SearchState::new().with_ignore_case(ignore_case),
        ));
        Self {
            control: BufferControl::new(buffer),
            search_state,
        }
    }

    pub fn search_state(&self) -> Arc<Mutex<SearchState>> {
        self.search_state.clone()
    }

    /// Mirror the buffer text into the search state (called after edits).
    pub fn sync_search_text(&self) {
        let text = self
            .control
            .buffer
            .lock()
            .unwrap()
            .text()
            .to_string();
        self.search_state.lock().unwrap().text = text;
    }
}

impl UIControl for SearchBufferControl {
    fn preferred_width(&self, max_available_width: usize) -> Option<usize> {
        self.control.preferred_width(max_available_width)
    }

    fn preferred_height(
        &self,
        width: usize,
        max_available_height: usize,
        wrap_lines: bool,
        get_line_prefix: Option<&GetLinePrefix>,
    ) -> Option<usize> {
        self.control
            .preferred_height(width, max_available_height, wrap_lines, get_line_prefix)
    }

    fn is_focusable(&self) -> bool {
        self.control.is_focusable()
    }

    fn create_content(&self, width: usize, height: usize) -> UIContent {
        self.control.create_content(width, height)
    }

    fn mouse_handler(&self, event: &MouseEvent) -> HandlerOutcome {
        self.control.mouse_handler(event)
    }

    fn invalidation_hash(&self) -> u64 {
        self.control.invalidation_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stroke_core::MouseModifiers;
    use stroke_history::InMemoryHistory;

    fn buffer_with(text: &str) -> Arc<Mutex<Buffer>> {
        let mut buffer = Buffer::new(Arc::new(InMemoryHistory::new()));
        buffer.insert_text(text);
        Arc::new(Mutex::new(buffer))
    }

    fn click(x: usize, y: usize) -> MouseEvent {
        MouseEvent {
            position: Point { x, y },
            event_type: MouseEventType::MouseDown,
            button: MouseButton::Left,
            modifiers: MouseModifiers::empty(),
        }
    }

    #[test]
    fn dummy_is_empty() {
        let content = DummyControl.create_content(10, 10);
        assert_eq!(content.line_count, 0);
        assert!(!content.show_cursor);
    }

    #[test]
    fn formatted_text_reports_max_line_width() {
        let control = FormattedTextControl::from_text("ab\nlonger line\nx");
        assert_eq!(control.preferred_width(100), Some(11));
        assert_eq!(control.preferred_height(100, 100, false, None), Some(3));
    }

    #[test]
    fn formatted_text_cursor_marker() {
        let control = FormattedTextControl::new(vec![
            Fragment::new("", "ab\ncd"),
            Fragment::new(SET_CURSOR_POSITION, ""),
            Fragment::new("", "ef"),
        ]);
        let content = control.create_content(80, 25);
        assert_eq!(content.cursor_position, Some(Point { x: 2, y: 1 }));
    }

    #[test]
    fn formatted_text_fragment_click() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let control = FormattedTextControl::new(vec![
            Fragment::new("", "no "),
            Fragment::with_handler(
                "class:link",
                "yes",
                Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    HandlerOutcome::Handled
                }),
            ),
        ]);
        assert_eq!(control.mouse_handler(&click(4, 0)), HandlerOutcome::Handled);
        assert_eq!(
            control.mouse_handler(&click(1, 0)),
            HandlerOutcome::NotImplemented
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_height_for_line_wraps() {
        let content = UIContent::new(
            Arc::new(|_| vec![Fragment::new("", "abcdefghij")]),
            1,
        );
        assert_eq!(content.get_height_for_line(0, 4, None, None), 3);
        assert_eq!(content.get_height_for_line(0, 10, None, None), 1);
        assert_eq!(content.get_height_for_line(0, 100, None, None), 1);
    }

    #[test]
    fn get_height_counts_wide_cells() {
        let content = UIContent::new(
            Arc::new(|_| vec![Fragment::new("", "日本語で")]),
            1,
        );
        // 8 columns of text in a 4-column window.
        assert_eq!(content.get_height_for_line(0, 4, None, None), 2);
    }

    #[test]
    fn get_height_with_prefix() {
        let prefix: GetLinePrefix = Arc::new(|_, wrap| {
            if wrap == 0 {
                vec![Fragment::new("", "> ")]
            } else {
                vec![Fragment::new("", "… ")]
            }
        });
        let content = UIContent::new(
            Arc::new(|_| vec![Fragment::new("", "abcdefgh")]),
            1,
        );
        // 10-wide window, 2 columns of prefix per row: 8 columns of text
        // fit exactly on one row.
        assert_eq!(content.get_height_for_line(0, 10, Some(&prefix), None), 1);
        // 6-wide window: 4 text columns per row.
        assert_eq!(content.get_height_for_line(0, 6, Some(&prefix), None), 2);
    }

    #[test]
    fn buffer_control_caches_until_edit() {
        let buffer = buffer_with("hello");
        let control = BufferControl::new(buffer.clone());
        let a = control.create_content(80, 25);
        let b = control.create_content(80, 25);
        assert!(Arc::ptr_eq(&a.height_cache, &b.height_cache)); // same snapshot
        buffer.lock().unwrap().insert_text("!");
        let c = control.create_content(80, 25);
        assert!(!Arc::ptr_eq(&a.height_cache, &c.height_cache));
    }

    #[test]
    fn buffer_control_reports_cursor() {
        let buffer = buffer_with("ab\ncd");
        buffer.lock().unwrap().set_cursor_position(4);
        let control = BufferControl::new(buffer);
        let content = control.create_content(80, 25);
        assert_eq!(content.cursor_position, Some(Point { x: 1, y: 1 }));
    }

    #[test]
    fn single_click_positions_cursor() {
        let buffer = buffer_with("hello\nworld");
        let control = BufferControl::new(buffer.clone());
        assert_eq!(control.mouse_handler(&click(2, 1)), HandlerOutcome::Handled);
        assert_eq!(buffer.lock().unwrap().cursor_position(), 8);
    }

    #[test]
    fn double_click_selects_word() {
        let buffer = buffer_with("hello world");
        let control = BufferControl::new(buffer.clone());
        control.mouse_handler(&click(7, 0));
        control.mouse_handler(&click(7, 0));
        let buffer = buffer.lock().unwrap();
        let range = buffer.document().selection_range().expect("word selected");
        assert_eq!(&buffer.text()[range], "world");
    }

    #[test]
    fn triple_click_selects_line() {
        let buffer = buffer_with("one\ntwo three\nfour");
        let control = BufferControl::new(buffer.clone());
        for _ in 0..3 {
            control.mouse_handler(&click(5, 1));
        }
        let buffer = buffer.lock().unwrap();
        let range = buffer.document().selection_range().expect("line selected");
        assert_eq!(&buffer.text()[range], "two three");
    }

    #[test]
    fn drag_extends_selection() {
        let buffer = buffer_with("hello world");
        let control = BufferControl::new(buffer.clone());
        control.mouse_handler(&click(0, 0));
        let drag = MouseEvent {
            position: Point { x: 4, y: 0 },
            event_type: MouseEventType::MouseMove,
            button: MouseButton::Left,
            modifiers: MouseModifiers::empty(),
        };
        assert_eq!(control.mouse_handler(&drag), HandlerOutcome::Handled);
        let buffer = buffer.lock().unwrap();
        let range = buffer.document().selection_range().expect("drag selected");
        assert_eq!(&buffer.text()[range], "hello");
    }

    #[test]
    fn scroll_events_bubble_up() {
        let buffer = buffer_with("text");
        let control = BufferControl::new(buffer);
        let scroll = MouseEvent {
            position: Point { x: 0, y: 0 },
            event_type: MouseEventType::ScrollDown,
            button: MouseButton::None,
            modifiers: MouseModifiers::empty(),
        };
        assert_eq!(
            control.mouse_handler(&scroll),
            HandlerOutcome::NotImplemented
        );
    }
}

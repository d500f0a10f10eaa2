//! Full VT100 writer.
//!
//! Emits the escape table verbatim and keeps just enough state to avoid
//! redundant output: cursor visibility, whether the cursor shape was ever
//! changed, and the single-character forms for 1-cell cursor movement.

use crate::attrs::{Attrs, CursorShape};
use crate::color_depth::ColorDepth;
use crate::escape::EscapeCodeCache;
use crate::{Output, OutputError, Size, StdoutTarget};
use std::io::Write;
use std::sync::Mutex;
use tracing::warn;

/// Terminal types whose title escape is known-broken and skipped entirely.
const TITLE_BLOCKLIST: &[&str] = &["linux", "eterm-color"];

type SizeProbe = Box<dyn Fn() -> Option<(u16, u16)> + Send + Sync>;

struct WriterState {
    sink: Box<dyn Write + Send>,
    buffer: Vec<String>,
    /// `None` until the first hide/show tells us what the terminal shows.
    cursor_visible: Option<bool>,
    cursor_shape_changed: bool,
}

pub struct Vt100Output {
    state: Mutex<WriterState>,
    term: Option<String>,
    fileno: Option<i32>,
    escape_cache: EscapeCodeCache,
    size_probe: SizeProbe,
    default_color_depth: Option<ColorDepth>,
}

impl Vt100Output {
    pub fn new(target: StdoutTarget) -> Self {
        Self {
            state: Mutex::new(WriterState {
                sink: target.sink,
                buffer: Vec::new(),
                cursor_visible: None,
                cursor_shape_changed: false,
            }),
            term: target.term,
            fileno: target.fileno,
            escape_cache: EscapeCodeCache::new(),
            size_probe: Box::new(|| crossterm::terminal::size().ok()),
            default_color_depth: None,
        }
    }

    /// Replace the terminal size probe (tests run without a terminal).
    pub fn with_size_probe(
        mut self,
        probe: impl Fn() -> Option<(u16, u16)> + Send + Sync + 'static,
    ) -> Self {
        self.size_probe = Box::new(probe);
        self
    }

    /// Fix the reported color depth instead of probing the environment.
    pub fn with_default_color_depth(mut self, depth: ColorDepth) -> Self {
        self.default_color_depth = Some(depth);
        self
    }

    fn push(&self, data: impl Into<String>) {
        self.state.lock().unwrap().buffer.push(data.into());
    }

    /// Parameterized cursor move: nothing for 0, the single-character form
    /// for 1, `ESC[{n}X` beyond.
    fn cursor_move(&self, amount: u16, single: &str, many: char) {
        match amount {
            0 => {}
            1 => self.push(single),
            n => self.push(format!("\x1b[{n}{many}")),
        }
    }
}

impl Output for Vt100Output {
    fn fileno(&self) -> Result<i32, OutputError> {
        self.fileno.ok_or(OutputError::Unsupported)
    }

    fn write(&self, data: &str) {
        self.push(data.replace('\x1b', "?"));
    }

    fn write_raw(&self, data: &str) {
        self.push(data);
    }

    fn flush(&self) {
        let mut state = self.state.lock().unwrap();
        if state.buffer.is_empty() {
            return;
        }
        let data = state.buffer.join("");
        state.buffer.clear();
        let result = state
            .sink
            .write_all(data.as_bytes())
            .and_then(|_| state.sink.flush());
        if let Err(err) = result {
            warn!(target: "output.vt100", error = %err, bytes = data.len(), "flush failed");
        }
    }

    fn erase_screen(&self) {
        self.push("\x1b[2J");
    }

    fn erase_end_of_line(&self) {
        self.push("\x1b[K");
    }

    fn erase_down(&self) {
        self.push("\x1b[J");
    }

    fn enter_alternate_screen(&self) {
        self.push("\x1b[?1049h\x1b[H");
    }

    fn quit_alternate_screen(&self) {
        self.push("\x1b[?1049l");
    }

    fn cursor_goto(&self, row: u16, column: u16) {
        self.push(format!("\x1b[{row};{column}H"));
    }

    fn cursor_up(&self, amount: u16) {
        self.cursor_move(amount, "\x1b[A", 'A');
    }

    fn cursor_down(&self, amount: u16) {
        self.cursor_move(amount, "\x1b[B", 'B');
    }

    fn cursor_forward(&self, amount: u16) {
        self.cursor_move(amount, "\x1b[C", 'C');
    }

    fn cursor_backward(&self, amount: u16) {
        self.cursor_move(amount, "\x08", 'D');
    }

    fn hide_cursor(&self) {
        let mut state = self.state.lock().unwrap();
        if state.cursor_visible != Some(false) {
            state.cursor_visible = Some(false);
            state.buffer.push("\x1b[?25l".to_string());
        }
    }

    fn show_cursor(&self) {
        let mut state = self.state.lock().unwrap();
        if state.cursor_visible != Some(true) {
            state.cursor_visible = Some(true);
            // Stop blinking, then show.
            state.buffer.push("\x1b[?12l\x1b[?25h".to_string());
        }
    }

    fn set_cursor_shape(&self, shape: CursorShape) {
        let Some(code) = shape.escape_code() else {
            return; // NeverChange
        };
        let mut state = self.state.lock().unwrap();
        state.cursor_shape_changed = true;
        state.buffer.push(code.to_string());
    }

    fn reset_cursor_shape(&self) {
        let mut state = self.state.lock().unwrap();
        if state.cursor_shape_changed {
            state.cursor_shape_changed = false;
            state.buffer.push("\x1b[0 q".to_string());
        }
    }

    fn reset_attributes(&self) {
        self.push("\x1b[0m");
    }

    fn set_attributes(&self, attrs: &Attrs, depth: ColorDepth) {
        self.push(self.escape_cache.escape_code(attrs, depth));
    }

    fn enable_autowrap(&self) {
        self.push("\x1b[?7h");
    }

    fn disable_autowrap(&self) {
        self.push("\x1b[?7l");
    }

    fn enable_mouse_support(&self) {
        // Basic reporting, any-event tracking, urxvt and SGR extensions.
        self.push("\x1b[?1000h\x1b[?1003h\x1b[?1015h\x1b[?1006h");
    }

    fn disable_mouse_support(&self) {
        self.push("\x1b[?1000l\x1b[?1003l\x1b[?1015l\x1b[?1006l");
    }

    fn enable_bracketed_paste(&self) {
        self.push("\x1b[?2004h");
    }

    fn disable_bracketed_paste(&self) {
        self.push("\x1b[?2004l");
    }

    fn set_title(&self, title: &str) {
        if let Some(term) = self.term.as_deref()
            && TITLE_BLOCKLIST.contains(&term)
        {
            return;
        }
        let sanitized: String = title.chars().filter(|c| *c != '\x1b' && *c != '\x07').collect();
        self.push(format!("\x1b]2;{sanitized}\x07"));
    }

    fn clear_title(&self) {
        self.set_title("");
    }

    fn bell(&self) {
        self.push("\x07");
        self.flush();
    }

    fn ask_for_cpr(&self) {
        self.push("\x1b[6n");
        self.flush();
    }

    fn get_size(&self) -> Size {
        match (self.size_probe)() {
            Some((columns, rows)) => Size { rows, columns },
            None => Size { rows: 24, columns: 80 },
        }
    }

    fn get_default_color_depth(&self) -> ColorDepth {
        match self.default_color_depth {
            Some(depth) => depth,
            None => ColorDepth::detect(self.term.as_deref()),
        }
    }
}

//! Plain-text writer for non-TTY stdout.
//!
//! Text goes through unchanged; cursor movement degrades to whitespace
//! (`cursor_forward` emits spaces, `cursor_down` newlines); everything that
//! would require a terminal is a no-op.

use crate::attrs::{Attrs, CursorShape};
use crate::color_depth::ColorDepth;
use crate::{Output, OutputError, Size};
use std::io::Write;
use std::sync::Mutex;
use tracing::warn;

struct PlainState {
    sink: Box<dyn Write + Send>,
    buffer: Vec<String>,
}

pub struct PlainTextOutput {
    state: Mutex<PlainState>,
    fileno: Option<i32>,
}

impl PlainTextOutput {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            state: Mutex::new(PlainState {
                sink,
                buffer: Vec::new(),
            }),
            fileno: None,
        }
    }

    pub fn with_fileno(mut self, fileno: i32) -> Self {
        self.fileno = Some(fileno);
        self
    }

    fn push(&self, data: impl Into<String>) {
        self.state.lock().unwrap().buffer.push(data.into());
    }
}

impl Output for PlainTextOutput {
    fn fileno(&self) -> Result<i32, OutputError> {
        self.fileno.ok_or(OutputError::Unsupported)
    }

    fn write(&self, data: &str) {
        self.push(data);
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
            warn!(target: "output.plain", error = %err, bytes = data.len(), "flush failed");
        }
    }

    fn erase_screen(&self) {}
    fn erase_end_of_line(&self) {}
    fn erase_down(&self) {}
    fn enter_alternate_screen(&self) {}
    fn quit_alternate_screen(&self) {}

    fn cursor_goto(&self, _row: u16, _column: u16) {}

    fn cursor_up(&self, _amount: u16) {}

    fn cursor_down(&self, amount: u16) {
        self.push("\n".repeat(amount as usize));
    }

    fn cursor_forward(&self, amount: u16) {
        self.push(" ".repeat(amount as usize));
    }

    fn cursor_backward(&self, _amount: u16) {}

    fn hide_cursor(&self) {}
    fn show_cursor(&self) {}
    fn set_cursor_shape(&self, _shape: CursorShape) {}
    fn reset_cursor_shape(&self) {}

    fn reset_attributes(&self) {}
    fn set_attributes(&self, _attrs: &Attrs, _depth: ColorDepth) {}

    fn enable_autowrap(&self) {}
    fn disable_autowrap(&self) {}
    fn enable_mouse_support(&self) {}
    fn disable_mouse_support(&self) {}
    fn enable_bracketed_paste(&self) {}
    fn disable_bracketed_paste(&self) {}

    fn set_title(&self, _title: &str) {}
    fn clear_title(&self) {}

    fn bell(&self) {}
    fn ask_for_cpr(&self) {}

    fn get_size(&self) -> Size {
        Size { rows: 40, columns: 80 }
    }

    fn get_default_color_depth(&self) -> ColorDepth {
        ColorDepth::Depth1Bit
    }
}

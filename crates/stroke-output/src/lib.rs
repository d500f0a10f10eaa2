//! Terminal output: escape emission, color mapping, buffered writers.
//!
//! Three writer variants implement the same `Output` trait: the full VT100
//! writer, a plain-text fallback for non-TTY stdout, and a no-op dummy.
//! All writes append to an in-memory buffer; only `flush()` performs I/O,
//! and flushing an empty buffer performs no syscall at all.
//!
//! Escape sequences are emitted from the byte-exact table this crate owns;
//! `crossterm` is used only to probe terminal size and TTY-ness.

pub mod attrs;
pub mod color_depth;
pub mod colors;
pub mod escape;

mod dummy;
mod plain;
mod vt100;

pub use attrs::{Attrs, CursorShape};
pub use color_depth::ColorDepth;
pub use colors::{SixteenColorCache, TwoFiftySixColorCache};
pub use dummy::DummyOutput;
pub use escape::EscapeCodeCache;
pub use plain::PlainTextOutput;
pub use vt100::Vt100Output;

use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("operation not supported by this output")]
    Unsupported,
}

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub rows: u16,
    pub columns: u16,
}

/// Abstract terminal writer.
///
/// Methods that emit escape sequences only append to the internal buffer;
/// state-tracking methods (cursor visibility, shape) suppress redundant
/// emissions. Implementations are safe for concurrent `write` / `write_raw`
/// / `flush` calls.
pub trait Output: Send + Sync {
    /// Underlying file descriptor, when one exists.
    fn fileno(&self) -> Result<i32, OutputError>;

    /// Write user text; every ESC byte is replaced with `?` so untrusted
    /// content cannot inject control sequences.
    fn write(&self, data: &str);

    /// Write verbatim (escape sequences included).
    fn write_raw(&self, data: &str);

    /// Flush the buffer to the real sink. I/O errors are logged and
    /// swallowed; an empty buffer performs no syscall.
    fn flush(&self);

    fn erase_screen(&self);
    fn erase_end_of_line(&self);
    fn erase_down(&self);

    fn enter_alternate_screen(&self);
    fn quit_alternate_screen(&self);

    /// Move the cursor; `row` and `column` are 1-based.
    fn cursor_goto(&self, row: u16, column: u16);
    fn cursor_up(&self, amount: u16);
    fn cursor_down(&self, amount: u16);
    fn cursor_forward(&self, amount: u16);
    fn cursor_backward(&self, amount: u16);

    fn hide_cursor(&self);
    fn show_cursor(&self);
    fn set_cursor_shape(&self, shape: CursorShape);
    fn reset_cursor_shape(&self);

    fn reset_attributes(&self);
    fn set_attributes(&self, attrs: &Attrs, depth: ColorDepth);

    fn enable_autowrap(&self);
    fn disable_autowrap(&self);
    fn enable_mouse_support(&self);
    fn disable_mouse_support(&self);
    fn enable_bracketed_paste(&self);
    fn disable_bracketed_paste(&self);

    fn set_title(&self, title: &str);
    fn clear_title(&self);

    fn bell(&self);

    /// Request a cursor position report (`ESC[6n`).
    fn ask_for_cpr(&self);

    fn get_size(&self) -> Size;
    fn get_default_color_depth(&self) -> ColorDepth;
}

// -------------------------------------------------------------------------------------------------
// Factory
// -------------------------------------------------------------------------------------------------

/// A concrete stdout destination handed to [`create_output`].
pub struct StdoutTarget {
    pub sink: Box<dyn Write + Send>,
    pub is_tty: bool,
    pub term: Option<String>,
    pub fileno: Option<i32>,
}

impl StdoutTarget {
    /// The process's real stdout.
    pub fn stdout() -> Self {
        use crossterm::tty::IsTty;
        let out = std::io::stdout();
        let is_tty = out.is_tty();
        Self {
            sink: Box::new(out),
            is_tty,
            term: std::env::var("TERM").ok(),
            fileno: Some(1),
        }
    }

    /// The process's real stderr.
    pub fn stderr() -> Self {
        use crossterm::tty::IsTty;
        let err = std::io::stderr();
        let is_tty = err.is_tty();
        Self {
            sink: Box::new(err),
            is_tty,
            term: std::env::var("TERM").ok(),
            fileno: Some(2),
        }
    }

    /// An arbitrary writer (tests, pipes).
    pub fn from_writer(sink: Box<dyn Write + Send>, is_tty: bool) -> Self {
        Self {
            sink,
            is_tty,
            term: std::env::var("TERM").ok(),
            fileno: None,
        }
    }
}

/// Pick the writer variant for a stdout destination:
/// no stdout → dummy; not a TTY → plain text (unless `always_prefer_tty`
/// and stderr is one); otherwise the full VT100 writer.
pub fn create_output(stdout: Option<StdoutTarget>, always_prefer_tty: bool) -> Box<dyn Output> {
    let Some(target) = stdout else {
        return Box::new(DummyOutput::new());
    };
    let target = if !target.is_tty && always_prefer_tty {
        let err = StdoutTarget::stderr();
        if err.is_tty { err } else { target }
    } else {
        target
    };
    if target.is_tty {
        Box::new(Vt100Output::new(target))
    } else {
        Box::new(PlainTextOutput::new(target.sink))
    }
}

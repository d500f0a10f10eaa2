//! No-op writer used when there is no stdout at all.

use crate::attrs::{Attrs, CursorShape};
use crate::color_depth::ColorDepth;
use crate::{Output, OutputError, Size};

#[derive(Debug, Default)]
pub struct DummyOutput;

impl DummyOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Output for DummyOutput {
    fn fileno(&self) -> Result<i32, OutputError> {
        Err(OutputError::Unsupported)
    }

    fn write(&self, _data: &str) {}
    fn write_raw(&self, _data: &str) {}
    fn flush(&self) {}

    fn erase_screen(&self) {}
    fn erase_end_of_line(&self) {}
    fn erase_down(&self) {}
    fn enter_alternate_screen(&self) {}
    fn quit_alternate_screen(&self) {}

    fn cursor_goto(&self, _row: u16, _column: u16) {}
    fn cursor_up(&self, _amount: u16) {}
    fn cursor_down(&self, _amount: u16) {}
    fn cursor_forward(&self, _amount: u16) {}
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

//! Scroll commands operating on a window's render info.
//!
//! These adjust the window's vertical scroll (and, through the content
//! control, the cursor) the way page-up/page-down handlers need: the
//! cursor stays inside the window, so the next render does not scroll
//! right back.

use crate::window::Window;

/// One line down, moving the cursor down when it would leave the window.
pub fn scroll_one_line_down(window: &Window) {
    let Some(info) = window.render_info() else {
        return;
    };
    if info.vertical_scroll + info.window_height < info.content_height() {
        window.set_vertical_scroll(info.vertical_scroll + 1);
        if info.cursor_position().y == 0 {
            window.content().move_cursor_down();
        }
    }
}

/// One line up, moving the cursor up when it would leave the window.
pub fn scroll_one_line_up(window: &Window) {
    let Some(info) = window.render_info() else {
        return;
    };
    if info.vertical_scroll > 0 {
        window.set_vertical_scroll(info.vertical_scroll - 1);
        if info.cursor_position().y + 1 >= info.window_height {
            window.content().move_cursor_up();
        }
    }
}

/// A full page down: scroll by the window height and put the cursor on the
/// first visible line.
pub fn scroll_page_down(window: &Window) {
    let Some(info) = window.render_info() else {
        return;
    };
    let max_scroll = info.content_height().saturating_sub(1);
    let target = (info.vertical_scroll + info.window_height).min(max_scroll);
    window.set_vertical_scroll(target);
    let cursor_line = info.ui_content.cursor_position.map(|p| p.y).unwrap_or(0);
    for _ in cursor_line..target.min(info.content_height().saturating_sub(1)) {
        window.content().move_cursor_down();
    }
}

/// A full page up, mirroring [`scroll_page_down`].
pub fn scroll_page_up(window: &Window) {
    let Some(info) = window.render_info() else {
        return;
    };
    let target = info.vertical_scroll.saturating_sub(info.window_height);
    window.set_vertical_scroll(target);
    let cursor_line = info.ui_content.cursor_position.map(|p| p.y).unwrap_or(0);
    // Put the cursor on the last line of the new page.
    let last_visible = target + info.window_height.saturating_sub(1);
    for _ in last_visible..cursor_line {
        window.content().move_cursor_up();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::BufferControl;
    use crate::screen::{MouseHandlers, Screen, WritePosition};
    use crate::containers::Container;
    use std::sync::{Arc, Mutex};
    use stroke_buffer::Buffer;
    use stroke_history::InMemoryHistory;

    fn rendered_window(lines: usize, height: usize) -> (Window, Arc<Mutex<Buffer>>) {
        let text: String = (0..lines).map(|i| format!("line{i}\n")).collect();
        let mut buffer = Buffer::new(Arc::new(InMemoryHistory::new()));
        buffer.insert_text(&text);
        buffer.set_cursor_position(0);
        let buffer = Arc::new(Mutex::new(buffer));
        let window = Window::new(Arc::new(BufferControl::new(buffer.clone())));
        let mut screen = Screen::new();
        let mut handlers = MouseHandlers::new();
        window.write_to_screen(
            &mut screen,
            &mut handlers,
            &WritePosition::new(0, 0, 20, height),
            "",
            true,
            None,
        );
        (window, buffer)
    }

    #[test]
    fn line_scroll_moves_viewport() {
        let (window, _buffer) = rendered_window(40, 5);
        assert_eq!(window.vertical_scroll(), 0);
        scroll_one_line_down(&window);
        assert_eq!(window.vertical_scroll(), 1);
        scroll_one_line_up(&window);
        assert_eq!(window.vertical_scroll(), 0);
        scroll_one_line_up(&window); // already at the top
        assert_eq!(window.vertical_scroll(), 0);
    }

    #[test]
    fn page_down_jumps_a_window_height() {
        let (window, _buffer) = rendered_window(40, 5);
        scroll_page_down(&window);
        assert_eq!(window.vertical_scroll(), 5);
    }

    #[test]
    fn page_down_clamps_at_content_end() {
        let (window, _buffer) = rendered_window(4, 10);
        scroll_page_down(&window);
        assert!(window.vertical_scroll() <= 4);
    }
}

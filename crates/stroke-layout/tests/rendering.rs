//! End-to-end layout tests: container trees writing into a real screen.

use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use stroke_buffer::Buffer;
use stroke_core::{Filter, Point};
use stroke_history::InMemoryHistory;
use stroke_layout::{
    BufferControl, ConditionalContainer, Container, Dimension, DynamicContainer, Float,
    FloatContainer, FormattedTextControl, HSplit, MouseHandlers, NumberedMargin, Screen,
    ScrollOffsets, VSplit, Window, WritePosition,
};

fn text_window(text: &str) -> Arc<Window> {
    Arc::new(Window::new(Arc::new(FormattedTextControl::from_text(text))))
}

fn render(container: &dyn Container, width: usize, height: usize) -> Screen {
    let mut screen = Screen::new();
    let mut handlers = MouseHandlers::new();
    container.write_to_screen(
        &mut screen,
        &mut handlers,
        &WritePosition::new(0, 0, width, height),
        "",
        true,
        None,
    );
    screen.draw_all_floats(&mut handlers);
    screen
}

fn buffer_window(text: &str, cursor: usize) -> (Arc<Window>, Arc<Mutex<Buffer>>) {
    let mut buffer = Buffer::new(Arc::new(InMemoryHistory::new()));
    buffer.insert_text(text);
    buffer.set_cursor_position(cursor);
    let buffer = Arc::new(Mutex::new(buffer));
    let window = Arc::new(Window::new(Arc::new(BufferControl::new(buffer.clone()))));
    (window, buffer)
}

#[test]
fn window_renders_text_lines() {
    let window = text_window("hello\nworld");
    let screen = render(window.as_ref(), 10, 3);
    assert_eq!(screen.row_text(0).trim_end(), "hello");
    assert_eq!(screen.row_text(1).trim_end(), "world");
}

#[test]
fn hsplit_stacks_children() {
    let split = HSplit::new(vec![text_window("top"), text_window("bottom")]);
    let screen = render(&split, 10, 2);
    assert_eq!(screen.row_text(0).trim_end(), "top");
    assert_eq!(screen.row_text(1).trim_end(), "bottom");
}

#[test]
fn vsplit_places_children_side_by_side() {
    let left = Arc::new(
        Window::new(Arc::new(FormattedTextControl::from_text("aa")))
            .with_width(Dimension::exact(4)),
    );
    let right = text_window("bb");
    let split = VSplit::new(vec![left, right]);
    let screen = render(&split, 8, 1);
    assert_eq!(screen.row_text(0).trim_end(), "aa  bb");
}

#[test]
fn hsplit_respects_exact_heights_and_weights() {
    let a = Arc::new(
        Window::new(Arc::new(FormattedTextControl::from_text("a")))
            .with_height(Dimension::exact(1)),
    );
    let b = Arc::new(
        Window::new(Arc::new(FormattedTextControl::from_text("b")))
            .with_height(Dimension::new(1, 1, 100, 1)),
    );
    let split = HSplit::new(vec![a, b]);
    let screen = render(&split, 5, 4);
    assert_eq!(screen.row_text(0).trim_end(), "a");
    assert_eq!(screen.row_text(1).trim_end(), "b");
}

#[test]
fn too_small_split_renders_fallback() {
    let a = Arc::new(
        Window::new(Arc::new(FormattedTextControl::from_text("a")))
            .with_height(Dimension::exact(5)),
    );
    let b = Arc::new(
        Window::new(Arc::new(FormattedTextControl::from_text("b")))
            .with_height(Dimension::exact(5)),
    );
    let fallback = text_window("tiny");
    let split = HSplit::new(vec![a, b]).with_window_too_small(fallback);
    let screen = render(&split, 8, 3);
    assert_eq!(screen.row_text(0).trim_end(), "tiny");
}

#[test]
fn conditional_container_collapses_to_zero() {
    let hidden = ConditionalContainer::new(text_window("secret"), Filter::never());
    assert_eq!(hidden.preferred_width(80), Dimension::exact(0));
    assert_eq!(hidden.preferred_height(80, 24), Dimension::exact(0));
    let screen = render(&hidden, 10, 2);
    assert_eq!(screen.row_text(0).trim_end(), "");
}

#[test]
fn conditional_container_alternative_content() {
    let either = ConditionalContainer::new(text_window("main"), Filter::never())
        .with_alternative(text_window("else"));
    let screen = render(&either, 10, 1);
    assert_eq!(screen.row_text(0).trim_end(), "else");
}

#[test]
fn dynamic_container_resolves_per_call() {
    use std::sync::atomic::{AtomicBool, Ordering};
    let flag = Arc::new(AtomicBool::new(false));
    let toggle = flag.clone();
    let a = text_window("first");
    let b = text_window("second");
    let dynamic = DynamicContainer::new(move || {
        Some(if toggle.load(Ordering::SeqCst) {
            b.clone() as Arc<dyn Container>
        } else {
            a.clone() as Arc<dyn Container>
        })
    });
    let screen = render(&dynamic, 10, 1);
    assert_eq!(screen.row_text(0).trim_end(), "first");
    flag.store(true, Ordering::SeqCst);
    let screen = render(&dynamic, 10, 1);
    assert_eq!(screen.row_text(0).trim_end(), "second");
}

#[test]
fn dynamic_container_none_is_empty() {
    let dynamic = DynamicContainer::new(|| None);
    assert_eq!(dynamic.preferred_width(80).preferred, 0);
    let screen = render(&dynamic, 5, 1);
    assert_eq!(screen.row_text(0).trim_end(), "");
}

#[test]
fn float_centers_by_default() {
    let float = Float::new(text_window("float")).sized(Some(5), Some(1));
    let container = FloatContainer::new(text_window("background text here"), vec![float]);
    let screen = render(&container, 21, 3);
    // Centered horizontally: (21 - 5) / 2 = 8, vertically row 1.
    assert_eq!(&screen.row_text(1)[8..13], "float");
}

#[test]
fn float_left_and_right_derive_width() {
    let float = Float::new(Arc::new(
        Window::new(Arc::new(FormattedTextControl::from_text("xxxxxxxxxx"))),
    ))
    .at(Some(0), Some(2), None, Some(3))
    .sized(None, Some(1));
    let container = FloatContainer::new(text_window(""), vec![float]);
    let screen = render(&container, 10, 2);
    // width = 10 - 3 - 2 = 5 at x = 3.
    assert_eq!(screen.row_text(0).trim_end(), "   xxxxx");
}

#[test]
fn higher_z_index_draws_on_top() {
    let low = Float::new(text_window("lowlow"))
        .at(Some(0), None, None, Some(0))
        .sized(Some(6), Some(1))
        .with_z_index(1);
    let high = Float::new(text_window("HI"))
        .at(Some(0), None, None, Some(0))
        .sized(Some(2), Some(1))
        .with_z_index(2);
    let container = FloatContainer::new(text_window("      "), vec![high.clone(), low]);
    let screen = render(&container, 6, 1);
    assert_eq!(screen.row_text(0), "HIwlow");
}

#[test]
fn window_scrolls_cursor_into_view() {
    let text: String = (0..50).map(|i| format!("line{i}\n")).collect();
    let (window, buffer) = buffer_window(&text, 0);
    {
        let mut b = buffer.lock().unwrap();
        let pos = b.document().translate_row_col_to_index(40, 0);
        b.set_cursor_position(pos);
    }
    let screen = render(window.as_ref(), 10, 5);
    let info = window.render_info().expect("render info");
    let first = info.first_visible_line();
    let last = info.last_visible_line();
    assert!((first..=last).contains(&40), "cursor line outside {first}..={last}");
    // The screen shows the scrolled region, not line 0.
    assert!(screen.row_text(0).starts_with("line"));
    assert_ne!(screen.row_text(0).trim_end(), "line0");
}

#[test]
fn scroll_offsets_keep_margin_above_cursor() {
    let text: String = (0..50).map(|i| format!("l{i}\n")).collect();
    let (window, buffer) = buffer_window(&text, 0);
    let window = Arc::new(
        Window::new(window.content()).with_scroll_offsets(ScrollOffsets::new(2, 2, 0, 0)),
    );
    {
        let mut b = buffer.lock().unwrap();
        let pos = b.document().translate_row_col_to_index(25, 0);
        b.set_cursor_position(pos);
    }
    render(window.as_ref(), 10, 10);
    let info = window.render_info().unwrap();
    let cursor_row = 25 - info.vertical_scroll;
    assert!(cursor_row >= 2, "cursor closer than top offset: {cursor_row}");
    assert!(cursor_row < 10 - 2, "cursor closer than bottom offset: {cursor_row}");
}

#[test]
fn wrapped_window_shows_long_line_fully() {
    let (window, _buffer) = buffer_window("abcdefghijklmnop", 0);
    let window = Arc::new(Window::new(window.content()).with_wrap_lines(Filter::always()));
    let screen = render(window.as_ref(), 4, 5);
    assert_eq!(screen.row_text(0), "abcd");
    assert_eq!(screen.row_text(1), "efgh");
    assert_eq!(screen.row_text(2), "ijkl");
    assert_eq!(screen.row_text(3), "mnop");
}

#[test]
fn cursor_registered_on_screen() {
    let (window, buffer) = buffer_window("ab\ncd", 0);
    buffer.lock().unwrap().set_cursor_position(4); // row 1, col 1
    let screen = render(window.as_ref(), 10, 3);
    assert_eq!(screen.cursor_position(window.id()), Point { x: 1, y: 1 });
}

#[test]
fn numbered_margin_renders_line_numbers() {
    let (window, _buffer) = buffer_window("one\ntwo\nthree", 0);
    let window = Arc::new(
        Window::new(window.content())
            .with_left_margins(vec![Arc::new(NumberedMargin::new())]),
    );
    let screen = render(window.as_ref(), 12, 3);
    assert_eq!(screen.row_text(0).trim_end(), "1 one");
    assert_eq!(screen.row_text(1).trim_end(), "2 two");
    assert_eq!(screen.row_text(2).trim_end(), "3 three");
}

#[test]
fn cursor_line_overlay_styles_row() {
    let (window, _buffer) = buffer_window("ab\ncd", 0);
    let window = Arc::new(Window::new(window.content()).with_cursorline(Filter::always()));
    let screen = render(window.as_ref(), 4, 2);
    assert!(screen.data_char(0, 1).style.contains("class:cursor-line"));
    assert!(!screen.data_char(1, 1).style.contains("class:cursor-line"));
}

#[test]
fn fill_char_paints_background() {
    let window = Window::new(Arc::new(stroke_layout::DummyControl)).with_fill_char('.');
    let screen = render(&window, 3, 2);
    assert_eq!(screen.row_text(0), "...");
    assert_eq!(screen.row_text(1), "...");
}

#[test]
fn wide_characters_occupy_two_cells() {
    let window = text_window("日本");
    let screen = render(window.as_ref(), 6, 1);
    assert_eq!(screen.data_char(0, 0).grapheme, "日");
    assert!(screen.data_char(0, 1).is_continuation());
    assert_eq!(screen.data_char(0, 2).grapheme, "本");
}

#[test]
fn padding_fills_between_children() {
    let split = HSplit::new(vec![text_window("a"), text_window("b")])
        .with_padding(Dimension::exact(1))
        .with_padding_char('-');
    let screen = render(&split, 3, 3);
    assert_eq!(screen.row_text(0).trim_end(), "a");
    assert_eq!(screen.row_text(1), "---");
    assert_eq!(screen.row_text(2).trim_end(), "b");
}

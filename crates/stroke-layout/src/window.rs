//! Window: places a control's content on the screen.
//!
//! A window owns the scroll state for its control, renders margins on both
//! sides, applies cursor-line / cursor-column / color-column overlays, and
//! leaves behind a per-frame `WindowRenderInfo` snapshot for margins,
//! scrollbars, and mouse translation.
//!
//! Design invariants:
//! * Scroll state keeps the cursor inside the configured offsets whenever
//!   the window is tall enough; degenerate windows clamp instead of
//!   oscillating.
//! * `WindowRenderInfo` is reborn every frame and never outlives it as a
//!   source of truth; readers treat it as a value.
//! * Mutable state (scroll positions, render info) sits behind one mutex;
//!   single getters are atomic, compound reads are the caller's problem.

use crate::containers::Container;
use crate::controls::{GetLinePrefix, UIContent, UIControl};
use crate::dimension::{Dimension, MAX_DIMENSION};
use crate::margins::Margin;
use crate::screen::{Char, MouseHandlers, Screen, WritePosition};
use ahash::AHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stroke_core::{
    Filter, HandlerOutcome, MouseEvent, MouseEventType, Point, fragment_list_width, split_lines,
};
use stroke_keys::KeyBindingsBase;
use tracing::trace;

/// Height handed to `create_content` when only metadata (line count) is
/// needed for a width query.
const PROBE_HEIGHT: usize = 1_000_000;

fn next_window_id() -> usize {
    static NEXT: AtomicUsize = AtomicUsize::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

pub(crate) fn merge_styles(parent: &str, own: &str) -> String {
    match (parent.is_empty(), own.is_empty()) {
        (true, _) => own.to_string(),
        (_, true) => parent.to_string(),
        _ => format!("{parent} {own}"),
    }
}

// -------------------------------------------------------------------------------------------------
// Configuration types
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollOffsets {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl ScrollOffsets {
    pub fn new(top: usize, bottom: usize, left: usize, right: usize) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColorColumn {
    pub position: usize,
    pub style: String,
}

impl ColorColumn {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            style: "class:color-column".to_string(),
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowAlign {
    #[default]
    Left,
    Center,
    Right,
}

// -------------------------------------------------------------------------------------------------
// Render info
// -------------------------------------------------------------------------------------------------

/// Immutable per-frame snapshot of a window's scroll and mapping state.
#[derive(Clone)]
pub struct WindowRenderInfo {
    pub window_id: usize,
    pub ui_content: UIContent,
    pub vertical_scroll: usize,
    pub horizontal_scroll: usize,
    /// Body size, margins excluded.
    pub window_width: usize,
    pub window_height: usize,
    pub configured_scroll_offsets: ScrollOffsets,
    /// Visible screen row (window-relative) → (source line, first source
    /// column shown on that row).
    pub visible_line_to_row_col: AHashMap<usize, (usize, usize)>,
    /// (source line, source column) → absolute screen (y, x).
    pub rowcol_to_yx: AHashMap<(usize, usize), (usize, usize)>,
    pub x_offset: usize,
    pub y_offset: usize,
    pub wrap_lines: bool,
    /// Source line number per visible row, wrap rows repeating theirs.
    pub displayed_lines: Vec<usize>,
}

impl WindowRenderInfo {
    pub fn content_height(&self) -> usize {
        self.ui_content.line_count
    }

    pub fn first_visible_line(&self) -> usize {
        self.displayed_lines.first().copied().unwrap_or(0)
    }

    pub fn last_visible_line(&self) -> usize {
        self.displayed_lines.last().copied().unwrap_or(0)
    }

    pub fn center_visible_line(&self) -> usize {
        self.displayed_lines
            .get(self.displayed_lines.len() / 2)
            .copied()
            .unwrap_or(0)
    }

    pub fn top_visible(&self) -> bool {
        self.vertical_scroll == 0
    }

    pub fn bottom_visible(&self) -> bool {
        self.content_height() == 0
            || self.last_visible_line() >= self.content_height() - 1
    }

    pub fn full_height_visible(&self) -> bool {
        self.top_visible() && self.bottom_visible()
    }

    pub fn vertical_scroll_percentage(&self) -> usize {
        100 * self.vertical_scroll / self.content_height().max(1)
    }

    /// Cursor position in window-relative coordinates.
    pub fn cursor_position(&self) -> Point {
        let Some(cursor) = self.ui_content.cursor_position else {
            return Point { x: 0, y: 0 };
        };
        match self.rowcol_to_yx.get(&(cursor.y, cursor.x)) {
            Some(&(y, x)) => Point {
                x: x.saturating_sub(self.x_offset),
                y: y.saturating_sub(self.y_offset),
            },
            None => Point { x: 0, y: 0 },
        }
    }

    pub fn get_height_for_line(&self, lineno: usize) -> usize {
        self.ui_content
            .get_height_for_line(lineno, self.window_width, None, None)
    }
}

#[derive(Default)]
struct WindowState {
    vertical_scroll: usize,
    horizontal_scroll: usize,
    /// Sub-line scroll used when one wrapped source line exceeds the
    /// window height.
    vertical_scroll_2: usize,
    render_info: Option<WindowRenderInfo>,
}

// -------------------------------------------------------------------------------------------------
// Window
// -------------------------------------------------------------------------------------------------

pub struct Window {
    id: usize,
    content: Arc<dyn UIControl>,
    width: Option<Dimension>,
    height: Option<Dimension>,
    dont_extend_width: Filter,
    dont_extend_height: Filter,
    ignore_content_width: Filter,
    ignore_content_height: Filter,
    left_margins: Vec<Arc<dyn Margin>>,
    right_margins: Vec<Arc<dyn Margin>>,
    scroll_offsets: ScrollOffsets,
    allow_scroll_beyond_bottom: Filter,
    wrap_lines: Filter,
    cursorline: Filter,
    cursorcolumn: Filter,
    colorcolumns: Vec<ColorColumn>,
    align: WindowAlign,
    style: String,
    fill_char: Option<char>,
    get_line_prefix: Option<GetLinePrefix>,
    state: Arc<Mutex<WindowState>>,
}

impl Window {
    pub fn new(content: Arc<dyn UIControl>) -> Self {
        Self {
            id: next_window_id(),
            content,
            width: None,
            height: None,
            dont_extend_width: Filter::never(),
            dont_extend_height: Filter::never(),
            ignore_content_width: Filter::never(),
            ignore_content_height: Filter::never(),
            left_margins: Vec::new(),
            right_margins: Vec::new(),
            scroll_offsets: ScrollOffsets::default(),
            allow_scroll_beyond_bottom: Filter::never(),
            wrap_lines: Filter::never(),
            cursorline: Filter::never(),
            cursorcolumn: Filter::never(),
            colorcolumns: Vec::new(),
            align: WindowAlign::Left,
            style: String::new(),
            fill_char: None,
            get_line_prefix: None,
            state: Arc::new(Mutex::new(WindowState::default())),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn with_width(mut self, width: Dimension) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: Dimension) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_dont_extend_width(mut self, filter: Filter) -> Self {
        self.dont_extend_width = filter;
        self
    }

    pub fn with_dont_extend_height(mut self, filter: Filter) -> Self {
        self.dont_extend_height = filter;
        self
    }

    pub fn with_left_margins(mut self, margins: Vec<Arc<dyn Margin>>) -> Self {
        self.left_margins = margins;
        self
    }

    pub fn with_right_margins(mut self, margins: Vec<Arc<dyn Margin>>) -> Self {
        self.right_margins = margins;
        self
    }

    pub fn with_scroll_offsets(mut self, offsets: ScrollOffsets) -> Self {
        self.scroll_offsets = offsets;
        self
    }

    pub fn with_allow_scroll_beyond_bottom(mut self, filter: Filter) -> Self {
        self.allow_scroll_beyond_bottom = filter;
        self
    }

    pub fn with_wrap_lines(mut self, filter: Filter) -> Self {
        self.wrap_lines = filter;
        self
    }

    pub fn with_cursorline(mut self, filter: Filter) -> Self {
        self.cursorline = filter;
        self
    }

    pub fn with_cursorcolumn(mut self, filter: Filter) -> Self {
        self.cursorcolumn = filter;
        self
    }

    pub fn with_colorcolumns(mut self, columns: Vec<ColorColumn>) -> Self {
        self.colorcolumns = columns;
        self
    }

    pub fn with_align(mut self, align: WindowAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_fill_char(mut self, fill_char: char) -> Self {
        self.fill_char = Some(fill_char);
        self
    }

    pub fn with_get_line_prefix(mut self, get_line_prefix: GetLinePrefix) -> Self {
        self.get_line_prefix = Some(get_line_prefix);
        self
    }

    pub fn content(&self) -> Arc<dyn UIControl> {
        self.content.clone()
    }

    pub fn render_info(&self) -> Option<WindowRenderInfo> {
        self.state.lock().unwrap().render_info.clone()
    }

    pub fn vertical_scroll(&self) -> usize {
        self.state.lock().unwrap().vertical_scroll
    }

    pub fn set_vertical_scroll(&self, scroll: usize) {
        self.state.lock().unwrap().vertical_scroll = scroll;
    }

    pub fn horizontal_scroll(&self) -> usize {
        self.state.lock().unwrap().horizontal_scroll
    }

    fn total_margin_width(&self, get_ui_content: &mut dyn FnMut() -> UIContent) -> (usize, usize) {
        let left = self
            .left_margins
            .iter()
            .map(|m| m.get_width(get_ui_content))
            .sum();
        let right = self
            .right_margins
            .iter()
            .map(|m| m.get_width(get_ui_content))
            .sum();
        (left, right)
    }
}

// -------------------------------------------------------------------------------------------------
// Scroll computation
// -------------------------------------------------------------------------------------------------

/// One-axis scroll update keeping `cursor_pos` inside the window with the
/// configured offsets (offsets clamp to half the window, and to the
/// distance from either content end).
fn do_scroll(
    current_scroll: usize,
    offset_start: usize,
    offset_end: usize,
    cursor_pos: usize,
    window_size: usize,
    content_size: usize,
    allow_scroll_beyond_end: bool,
) -> usize {
    let offset_start = offset_start.min(window_size / 2).min(cursor_pos);
    let offset_end = offset_end
        .min(window_size / 2)
        .min(content_size.saturating_sub(1).saturating_sub(cursor_pos));

    let mut scroll = current_scroll as i64;
    if !allow_scroll_beyond_end && scroll > content_size as i64 - window_size as i64 {
        scroll = (content_size as i64 - window_size as i64).max(0);
    }
    // Scroll up when the cursor sits above the visible region.
    if scroll > cursor_pos as i64 - offset_start as i64 {
        scroll = (cursor_pos as i64 - offset_start as i64).max(0);
    }
    // Scroll down when the cursor sits below it.
    if scroll < cursor_pos as i64 + 1 - window_size as i64 + offset_end as i64 {
        scroll = cursor_pos as i64 + 1 - window_size as i64 + offset_end as i64;
    }
    scroll.max(0) as usize
}

fn scroll_without_wrapping(
    state: &mut WindowState,
    ui_content: &UIContent,
    width: usize,
    height: usize,
    offsets: &ScrollOffsets,
    allow_scroll_beyond_bottom: bool,
) {
    state.vertical_scroll_2 = 0;
    if ui_content.line_count == 0 {
        state.vertical_scroll = 0;
        state.horizontal_scroll = 0;
        return;
    }
    let cursor = ui_content.cursor_position.unwrap_or(Point { x: 0, y: 0 });

    state.vertical_scroll = do_scroll(
        state.vertical_scroll,
        offsets.top,
        offsets.bottom,
        cursor.y,
        height,
        ui_content.line_count,
        allow_scroll_beyond_bottom,
    );

    // Horizontal: content size is the widest line near the viewport.
    let first = state.vertical_scroll;
    let last = (first + height).min(ui_content.line_count);
    let content_width = (first..last)
        .map(|i| fragment_list_width(&ui_content.get_line(i)))
        .max()
        .unwrap_or(0);
    let cursor_line = ui_content.get_line(cursor.y);
    let cursor_x: usize = stroke_core::fragment_list_to_text(&cursor_line)
        .chars()
        .take(cursor.x)
        .map(stroke_core::char_width)
        .sum();
    state.horizontal_scroll = do_scroll(
        state.horizontal_scroll,
        offsets.left,
        offsets.right,
        cursor_x,
        width,
        content_width.max(cursor_x + 1),
        false,
    );
}

fn scroll_when_wrapping(
    state: &mut WindowState,
    ui_content: &UIContent,
    width: usize,
    height: usize,
    offsets: &ScrollOffsets,
    get_line_prefix: Option<&GetLinePrefix>,
    allow_scroll_beyond_bottom: bool,
) {
    state.horizontal_scroll = 0;
    let line_count = ui_content.line_count;
    if line_count == 0 {
        state.vertical_scroll = 0;
        state.vertical_scroll_2 = 0;
        return;
    }
    let cursor = ui_content.cursor_position.unwrap_or(Point { x: 0, y: 0 });
    if width == 0 {
        state.vertical_scroll = cursor.y;
        state.vertical_scroll_2 = 0;
        return;
    }

    let line_height =
        |lineno: usize| ui_content.get_height_for_line(lineno, width, get_line_prefix, None);

    // Lowest scroll that keeps the cursor line above the bottom offset.
    let min_vertical_scroll = {
        let mut used = 0;
        let mut prev = cursor.y;
        let mut result = 0;
        for lineno in (0..=cursor.y).rev() {
            used += line_height(lineno);
            if used > height.saturating_sub(offsets.bottom) {
                result = prev;
                break;
            }
            prev = lineno;
        }
        result
    };
    // Highest scroll that keeps the cursor line below the top offset.
    let max_vertical_scroll = {
        let mut used = 0;
        let mut prev = cursor.y;
        for lineno in (0..cursor.y).rev() {
            used += line_height(lineno);
            if used > offsets.top {
                break;
            }
            prev = lineno;
        }
        prev
    };
    // Topmost line that still lets the content bottom reach the window
    // bottom.
    let topmost_visible = {
        let mut used = 0;
        let mut prev = line_count - 1;
        for lineno in (0..line_count).rev() {
            used += line_height(lineno);
            if used > height {
                break;
            }
            prev = lineno;
        }
        prev
    };

    state.vertical_scroll = state
        .vertical_scroll
        .max(min_vertical_scroll.min(topmost_visible));
    state.vertical_scroll = state.vertical_scroll.min(max_vertical_scroll);
    if !allow_scroll_beyond_bottom {
        state.vertical_scroll = state.vertical_scroll.min(topmost_visible);
    }

    // One source line taller than the window: scroll within the line.
    let cursor_line_height = line_height(cursor.y);
    if cursor_line_height > height {
        state.vertical_scroll = cursor.y;
        let cursor_wrap_row = ui_content
            .get_height_for_line(cursor.y, width, get_line_prefix, Some(cursor.x))
            .saturating_sub(1);
        if cursor_wrap_row < state.vertical_scroll_2 {
            state.vertical_scroll_2 = cursor_wrap_row;
        } else if cursor_wrap_row >= state.vertical_scroll_2 + height {
            state.vertical_scroll_2 = cursor_wrap_row + 1 - height;
        }
        state.vertical_scroll_2 = state
            .vertical_scroll_2
            .min(cursor_line_height.saturating_sub(1));
    } else {
        state.vertical_scroll_2 = 0;
    }
}

// -------------------------------------------------------------------------------------------------
// Body copy
// -------------------------------------------------------------------------------------------------

struct CopyBodyResult {
    visible_line_to_row_col: AHashMap<usize, (usize, usize)>,
    rowcol_to_yx: AHashMap<(usize, usize), (usize, usize)>,
    displayed_lines: Vec<usize>,
}

#[allow(clippy::too_many_arguments)]
fn copy_body(
    ui_content: &UIContent,
    screen: &mut Screen,
    write_position: &WritePosition,
    move_x: usize,
    width: usize,
    vertical_scroll: usize,
    horizontal_scroll: usize,
    wrap_lines: bool,
    vertical_scroll_2: usize,
    align: WindowAlign,
    base_style: &str,
    get_line_prefix: Option<&GetLinePrefix>,
) -> CopyBodyResult {
    let xpos = write_position.xpos + move_x;
    let ypos = write_position.ypos;
    let height = write_position.height;

    let mut visible_line_to_row_col: AHashMap<usize, (usize, usize)> = AHashMap::new();
    let mut rowcol_to_yx: AHashMap<(usize, usize), (usize, usize)> = AHashMap::new();
    let mut row_to_line: AHashMap<usize, usize> = AHashMap::new();

    let mut y: i64 = -(vertical_scroll_2 as i64);
    let mut lineno = vertical_scroll;

    'lines: while y < height as i64 && lineno < ui_content.line_count {
        let line = ui_content.get_line(lineno);
        let mut wrap_count = 0usize;
        let mut col = 0usize; // source character index
        let mut x: i64 = -(horizontal_scroll as i64);

        if y >= 0 {
            visible_line_to_row_col.insert(y as usize, (lineno, horizontal_scroll));
            row_to_line.insert(y as usize, lineno);
        }

        // Row prefix (continuation prompt) for the first row of this line.
        if let Some(prefix) = get_line_prefix {
            for fragment in prefix(lineno, 0) {
                for c in fragment.text.chars() {
                    let w = stroke_core::char_width(c);
                    if y >= 0 && x >= 0 && (x as usize) < width {
                        screen.draw_char(
                            ypos + y as usize,
                            xpos + x as usize,
                            Char::new(c.to_string(), merge_styles(base_style, &fragment.style)),
                        );
                    }
                    x += w as i64;
                }
            }
        }

        // Alignment offset for short lines.
        if align != WindowAlign::Left {
            let line_width = fragment_list_width(&line);
            let slack = width.saturating_sub(line_width) as i64;
            x += match align {
                WindowAlign::Center => slack / 2,
                WindowAlign::Right => slack,
                WindowAlign::Left => 0,
            };
        }

        for fragment in &line {
            let style = merge_styles(base_style, &fragment.style);
            for c in fragment.text.chars() {
                let w = stroke_core::char_width(c) as i64;
                if wrap_lines && x + w > width as i64 {
                    y += 1;
                    wrap_count += 1;
                    x = 0;
                    if y >= height as i64 {
                        // Clipped: drop the rest of this (and every further)
                        // line.
                        break 'lines;
                    }
                    if y >= 0 {
                        visible_line_to_row_col.insert(y as usize, (lineno, col));
                        row_to_line.insert(y as usize, lineno);
                        if let Some(prefix) = get_line_prefix {
                            for pf in prefix(lineno, wrap_count) {
                                for pc in pf.text.chars() {
                                    let pw = stroke_core::char_width(pc);
                                    if x >= 0 && (x as usize) < width {
                                        screen.draw_char(
                                            ypos + y as usize,
                                            xpos + x as usize,
                                            Char::new(
                                                pc.to_string(),
                                                merge_styles(base_style, &pf.style),
                                            ),
                                        );
                                    }
                                    x += pw as i64;
                                }
                            }
                        }
                    }
                }
                if y >= 0 && x >= 0 && x + w <= width as i64 {
                    rowcol_to_yx.insert((lineno, col), (ypos + y as usize, xpos + x as usize));
                    if w > 0 {
                        screen.draw_char(
                            ypos + y as usize,
                            xpos + x as usize,
                            Char::new(c.to_string(), style.clone()),
                        );
                    } else if x > 0 {
                        // Combining mark: belongs to the cell on its left.
                        screen.append_zero_width(ypos + y as usize, xpos + x as usize - 1, c);
                    }
                }
                col += 1;
                x += w;
            }
        }
        // Map the after-end-of-line cursor column.
        if y >= 0 && x >= 0 && (x as usize) <= width {
            rowcol_to_yx
                .entry((lineno, col))
                .or_insert((ypos + y as usize, xpos + (x as usize).min(width.saturating_sub(1))));
        }

        lineno += 1;
        y += 1;
    }

    let mut rows: Vec<usize> = row_to_line.keys().copied().collect();
    rows.sort_unstable();
    let displayed_lines: Vec<usize> = rows.into_iter().map(|r| row_to_line[&r]).collect();

    CopyBodyResult {
        visible_line_to_row_col,
        rowcol_to_yx,
        displayed_lines,
    }
}

// -------------------------------------------------------------------------------------------------
// Container implementation
// -------------------------------------------------------------------------------------------------

impl Container for Window {
    fn preferred_width(&self, max_available_width: usize) -> Dimension {
        let mut content_memo: Option<UIContent> = None;
        let content = self.content.clone();
        let mut get_ui_content = move || {
            content_memo
                .get_or_insert_with(|| content.create_content(max_available_width, PROBE_HEIGHT))
                .clone()
        };
        let (left, right) = self.total_margin_width(&mut get_ui_content);
        let margins = left + right;

        let preferred = if self.ignore_content_width.eval() {
            None
        } else {
            self.content
                .preferred_width(max_available_width.saturating_sub(margins))
                .map(|w| w + margins)
        };

        let mut dim = match self.width {
            Some(dim) => dim,
            None => Dimension::new(0, preferred.unwrap_or(0), MAX_DIMENSION, 1),
        };
        if self.dont_extend_width.eval() {
            dim.max = dim.max.min(dim.preferred);
        }
        dim
    }

    fn preferred_height(&self, width: usize, max_available_height: usize) -> Dimension {
        let mut content_memo: Option<UIContent> = None;
        let content = self.content.clone();
        let mut get_ui_content =
            move || content_memo.get_or_insert_with(|| content.create_content(width, PROBE_HEIGHT)).clone();
        let (left, right) = self.total_margin_width(&mut get_ui_content);
        let body_width = width.saturating_sub(left + right);

        let preferred = if self.ignore_content_height.eval() {
            None
        } else {
            self.content.preferred_height(
                body_width,
                max_available_height,
                self.wrap_lines.eval(),
                self.get_line_prefix.as_ref(),
            )
        };

        let mut dim = match self.height {
            Some(dim) => dim,
            None => Dimension::new(0, preferred.unwrap_or(0), MAX_DIMENSION, 1),
        };
        if self.dont_extend_height.eval() {
            dim.max = dim.max.min(dim.preferred);
        }
        dim
    }

    fn write_to_screen(
        &self,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        write_position: &WritePosition,
        parent_style: &str,
        erase_bg: bool,
        _z_index: Option<usize>,
    ) {
        if write_position.width == 0 || write_position.height == 0 {
            return;
        }
        let style = merge_styles(parent_style, &self.style);

        // 1. Shrink the allotted area when the window must not stretch.
        let mut wp = *write_position;
        if self.dont_extend_width.eval() {
            wp.width = wp.width.min(self.preferred_width(wp.width).preferred);
        }
        if self.dont_extend_height.eval() {
            wp.height = wp
                .height
                .min(self.preferred_height(wp.width, wp.height).preferred);
        }
        if wp.width == 0 || wp.height == 0 {
            return;
        }

        // Margin widths (left to right).
        let mut content_memo: Option<UIContent> = None;
        let probe_content = self.content.clone();
        let probe_width = wp.width;
        let mut get_ui_content = move || {
            content_memo
                .get_or_insert_with(|| probe_content.create_content(probe_width, PROBE_HEIGHT))
                .clone()
        };
        let left_widths: Vec<usize> = self
            .left_margins
            .iter()
            .map(|m| m.get_width(&mut get_ui_content))
            .collect();
        let right_widths: Vec<usize> = self
            .right_margins
            .iter()
            .map(|m| m.get_width(&mut get_ui_content))
            .collect();
        let left_total: usize = left_widths.iter().sum();
        let right_total: usize = right_widths.iter().sum();
        let body_width = wp.width.saturating_sub(left_total + right_total);

        // 2. Content for the effective body size.
        let ui_content = self.content.create_content(body_width, wp.height);

        // 3. Scroll to keep the cursor visible.
        let wrap = self.wrap_lines.eval();
        let (vscroll, hscroll, vscroll2) = {
            let mut state = self.state.lock().unwrap();
            if wrap {
                scroll_when_wrapping(
                    &mut state,
                    &ui_content,
                    body_width,
                    wp.height,
                    &self.scroll_offsets,
                    self.get_line_prefix.as_ref(),
                    self.allow_scroll_beyond_bottom.eval(),
                );
            } else {
                scroll_without_wrapping(
                    &mut state,
                    &ui_content,
                    body_width,
                    wp.height,
                    &self.scroll_offsets,
                    self.allow_scroll_beyond_bottom.eval(),
                );
            }
            (
                state.vertical_scroll,
                state.horizontal_scroll,
                state.vertical_scroll_2,
            )
        };
        trace!(
            target: "layout.window",
            id = self.id,
            vscroll,
            hscroll,
            wrap,
            "render"
        );

        // 4. Background fill.
        if erase_bg {
            let fill = Char::new(
                self.fill_char.unwrap_or(' ').to_string(),
                style.clone(),
            );
            screen.fill_area(&wp, &fill);
        }

        // 5./6. Body.
        let copied = copy_body(
            &ui_content,
            screen,
            &wp,
            left_total,
            body_width,
            vscroll,
            hscroll,
            wrap,
            vscroll2,
            self.align,
            &style,
            self.get_line_prefix.as_ref(),
        );

        let body_x = wp.xpos + left_total;

        // Cursor / menu registration.
        if let Some(cursor) = ui_content.cursor_position
            && let Some(&(y, x)) = copied.rowcol_to_yx.get(&(cursor.y, cursor.x))
        {
            screen.set_cursor_position(self.id, Point { x, y });
        }
        if let Some(menu) = ui_content.menu_position
            && let Some(&(y, x)) = copied.rowcol_to_yx.get(&(menu.y, menu.x))
        {
            screen.set_menu_position(self.id, Point { x, y });
        }

        // 9. Render-info snapshot (margins and overlays read it below).
        let render_info = WindowRenderInfo {
            window_id: self.id,
            ui_content: ui_content.clone(),
            vertical_scroll: vscroll,
            horizontal_scroll: hscroll,
            window_width: body_width,
            window_height: wp.height,
            configured_scroll_offsets: self.scroll_offsets,
            visible_line_to_row_col: copied.visible_line_to_row_col.clone(),
            rowcol_to_yx: copied.rowcol_to_yx.clone(),
            x_offset: body_x,
            y_offset: wp.ypos,
            wrap_lines: wrap,
            displayed_lines: copied.displayed_lines.clone(),
        };

        // 7. Margins, using the fresh render info.
        let mut margin_x = wp.xpos;
        for (margin, margin_width) in self.left_margins.iter().zip(&left_widths) {
            self.render_margin(screen, &render_info, margin.as_ref(), margin_x, &wp, *margin_width, &style);
            margin_x += margin_width;
        }
        let mut margin_x = body_x + body_width;
        for (margin, margin_width) in self.right_margins.iter().zip(&right_widths) {
            self.render_margin(screen, &render_info, margin.as_ref(), margin_x, &wp, *margin_width, &style);
            margin_x += margin_width;
        }

        // 8. Overlays.
        self.apply_overlays(screen, &render_info, &copied, &wp, body_x, body_width);

        self.state.lock().unwrap().render_info = Some(render_info);

        // 10. Mouse handlers for the whole window area.
        let control = self.content.clone();
        let state = self.state.clone();
        let visible = copied.visible_line_to_row_col;
        let ypos = wp.ypos;
        mouse_handlers.set_for_range(
            wp.xpos..wp.xpos + wp.width,
            wp.ypos..wp.ypos + wp.height,
            Arc::new(move |event: &MouseEvent| {
                let rel_y = event.position.y.saturating_sub(ypos);
                let translated = visible.get(&rel_y).map(|&(line, start_col)| {
                    let rel_x = event.position.x.saturating_sub(body_x);
                    MouseEvent {
                        position: Point {
                            x: start_col + rel_x,
                            y: line,
                        },
                        ..*event
                    }
                });
                let outcome = match translated {
                    Some(ref translated) => control.mouse_handler(translated),
                    None => HandlerOutcome::NotImplemented,
                };
                if outcome == HandlerOutcome::NotImplemented {
                    // The control declined: the window consumes scrolling.
                    match event.event_type {
                        MouseEventType::ScrollDown => {
                            state.lock().unwrap().vertical_scroll += 1;
                            HandlerOutcome::Handled
                        }
                        MouseEventType::ScrollUp => {
                            let mut state = state.lock().unwrap();
                            state.vertical_scroll = state.vertical_scroll.saturating_sub(1);
                            HandlerOutcome::Handled
                        }
                        _ => HandlerOutcome::NotImplemented,
                    }
                } else {
                    outcome
                }
            }),
        );
    }

    fn get_children(&self) -> Vec<Arc<dyn Container>> {
        Vec::new()
    }

    fn get_key_bindings(&self) -> Option<Arc<dyn KeyBindingsBase>> {
        self.content.get_key_bindings()
    }
}

impl Window {
    #[allow(clippy::too_many_arguments)]
    fn render_margin(
        &self,
        screen: &mut Screen,
        render_info: &WindowRenderInfo,
        margin: &dyn Margin,
        x: usize,
        wp: &WritePosition,
        margin_width: usize,
        style: &str,
    ) {
        if margin_width == 0 {
            return;
        }
        let fragments = margin.create_margin(render_info, margin_width, wp.height);
        for (row, line) in split_lines(&fragments).into_iter().enumerate() {
            if row >= wp.height {
                break;
            }
            let mut cx = 0usize;
            for fragment in line {
                for c in fragment.text.chars() {
                    let w = stroke_core::char_width(c);
                    if cx + w > margin_width {
                        break;
                    }
                    screen.draw_char(
                        wp.ypos + row,
                        x + cx,
                        Char::new(c.to_string(), merge_styles(style, &fragment.style)),
                    );
                    cx += w;
                }
            }
        }
    }

    fn apply_overlays(
        &self,
        screen: &mut Screen,
        render_info: &WindowRenderInfo,
        copied: &CopyBodyResult,
        wp: &WritePosition,
        body_x: usize,
        body_width: usize,
    ) {
        let cursor = render_info.ui_content.cursor_position;

        if self.cursorline.eval()
            && let Some(cursor) = cursor
            && let Some(&(y, _)) = copied.rowcol_to_yx.get(&(cursor.y, cursor.x))
        {
            for x in body_x..body_x + body_width {
                screen.apply_style(y, x, "class:cursor-line");
            }
        }

        if self.cursorcolumn.eval()
            && let Some(cursor) = cursor
            && let Some(&(_, x)) = copied.rowcol_to_yx.get(&(cursor.y, cursor.x))
        {
            for y in wp.ypos..wp.ypos + wp.height {
                screen.apply_style(y, x, "class:cursor-column");
            }
        }

        for column in &self.colorcolumns {
            if column.position >= body_width {
                continue; // beyond the window edge
            }
            let x = body_x + column.position;
            for y in wp.ypos..wp.ypos + wp.height {
                screen.apply_style(y, x, &column.style);
            }
        }
    }
}

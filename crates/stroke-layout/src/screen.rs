//! Screen buffer: a sparse 2-D grid of styled cells with deferred
//! z-ordered drawing and per-window cursor/menu anchors.

use ahash::AHashMap;
use std::sync::Arc;
use stroke_core::{HandlerOutcome, MouseEvent, Point, grapheme_width};

// -------------------------------------------------------------------------------------------------
// Char
// -------------------------------------------------------------------------------------------------

/// One cell: a grapheme cluster plus its style. Wide clusters occupy two
/// columns; the right-hand cell holds a zero-width continuation marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Char {
    pub grapheme: String,
    pub style: String,
    pub width: usize,
}

impl Char {
    pub fn new(grapheme: impl Into<String>, style: impl Into<String>) -> Self {
        let grapheme = grapheme.into();
        let width = grapheme_width(&grapheme);
        Self {
            grapheme,
            style: style.into(),
            width,
        }
    }

    /// The zero-width cell written to the right of a wide cluster.
    pub fn continuation(style: impl Into<String>) -> Self {
        Self {
            grapheme: String::new(),
            style: style.into(),
            width: 0,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.grapheme.is_empty()
    }
}

impl Default for Char {
    fn default() -> Self {
        Self {
            grapheme: " ".to_string(),
            style: String::new(),
            width: 1,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// WritePosition
// -------------------------------------------------------------------------------------------------

/// Rectangle a container may draw into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePosition {
    pub xpos: usize,
    pub ypos: usize,
    pub width: usize,
    pub height: usize,
}

impl WritePosition {
    pub fn new(xpos: usize, ypos: usize, width: usize, height: usize) -> Self {
        Self {
            xpos,
            ypos,
            width,
            height,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Mouse handler grid
// -------------------------------------------------------------------------------------------------

pub type MouseHandler = Arc<dyn Fn(&MouseEvent) -> HandlerOutcome + Send + Sync>;

/// Maps screen cells to the handler of the control drawn there.
#[derive(Default)]
pub struct MouseHandlers {
    handlers: AHashMap<(usize, usize), MouseHandler>,
}

impl MouseHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_for_range(
        &mut self,
        x_range: std::ops::Range<usize>,
        y_range: std::ops::Range<usize>,
        handler: MouseHandler,
    ) {
        for y in y_range {
            for x in x_range.clone() {
                self.handlers.insert((x, y), handler.clone());
            }
        }
    }

    /// Dispatch to the handler under the event position.
    pub fn handle(&self, event: &MouseEvent) -> HandlerOutcome {
        match self.handlers.get(&(event.position.x, event.position.y)) {
            Some(handler) => handler(event),
            None => HandlerOutcome::NotImplemented,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Screen
// -------------------------------------------------------------------------------------------------

type DrawFunc = Box<dyn FnOnce(&mut Screen, &mut MouseHandlers) + Send>;

pub struct Screen {
    rows: AHashMap<usize, AHashMap<usize, Char>>,
    /// High-water marks of everything written so far.
    pub width: usize,
    pub height: usize,
    pub show_cursor: bool,
    cursor_positions: AHashMap<usize, Point>,
    menu_positions: AHashMap<usize, Point>,
    draw_queue: Vec<(usize, u64, DrawFunc)>,
    draw_seq: u64,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen {
    pub fn new() -> Self {
        Self {
            rows: AHashMap::new(),
            width: 0,
            height: 0,
            show_cursor: true,
            cursor_positions: AHashMap::new(),
            menu_positions: AHashMap::new(),
            draw_queue: Vec::new(),
            draw_seq: 0,
        }
    }

    /// Cell at (y, x); default space when never written.
    pub fn data_char(&self, y: usize, x: usize) -> Char {
        self.rows
            .get(&y)
            .and_then(|row| row.get(&x))
            .cloned()
            .unwrap_or_default()
    }

    /// Write one cell. A wide cluster also claims the next column with a
    /// continuation marker.
    pub fn draw_char(&mut self, y: usize, x: usize, ch: Char) {
        let width = ch.width;
        let style = ch.style.clone();
        self.width = self.width.max(x + width.max(1));
        self.height = self.height.max(y + 1);
        self.rows.entry(y).or_default().insert(x, ch);
        if width == 2 {
            self.rows
                .entry(y)
                .or_default()
                .insert(x + 1, Char::continuation(style));
        }
    }

    /// Append a zero-width codepoint (combining mark) to the grapheme
    /// already drawn at (y, x).
    pub fn append_zero_width(&mut self, y: usize, x: usize, c: char) {
        if let Some(cell) = self.rows.get_mut(&y).and_then(|row| row.get_mut(&x)) {
            cell.grapheme.push(c);
        }
    }

    /// Append a style fragment to the cell at (y, x), materializing the
    /// default cell when nothing was drawn there yet.
    pub fn apply_style(&mut self, y: usize, x: usize, style: &str) {
        let row = self.rows.entry(y).or_default();
        let cell = row.entry(x).or_default();
        if !style.is_empty() {
            if !cell.style.is_empty() {
                cell.style.push(' ');
            }
            cell.style.push_str(style);
        }
        self.width = self.width.max(x + 1);
        self.height = self.height.max(y + 1);
    }

    /// Fill a rectangle with copies of `ch`.
    pub fn fill_area(&mut self, area: &WritePosition, ch: &Char) {
        for y in area.ypos..area.ypos + area.height {
            for x in (area.xpos..area.xpos + area.width).step_by(ch.width.max(1)) {
                self.draw_char(y, x, ch.clone());
            }
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Cursor / menu anchors
    // ---------------------------------------------------------------------------------------------

    pub fn set_cursor_position(&mut self, window_id: usize, position: Point) {
        self.cursor_positions.insert(window_id, position);
    }

    pub fn set_menu_position(&mut self, window_id: usize, position: Point) {
        self.menu_positions.insert(window_id, position);
    }

    pub fn cursor_position(&self, window_id: usize) -> Point {
        self.cursor_positions
            .get(&window_id)
            .copied()
            .unwrap_or(Point { x: 0, y: 0 })
    }

    /// Menu anchor, falling back to the cursor position.
    pub fn menu_position(&self, window_id: usize) -> Point {
        self.menu_positions
            .get(&window_id)
            .or_else(|| self.cursor_positions.get(&window_id))
            .copied()
            .unwrap_or(Point { x: 0, y: 0 })
    }

    pub fn any_cursor_position(&self) -> Option<Point> {
        self.cursor_positions.values().copied().next()
    }

    // ---------------------------------------------------------------------------------------------
    // Deferred drawing
    // ---------------------------------------------------------------------------------------------

    /// Enqueue a draw to run during [`Screen::draw_all_floats`], ordered by
    /// ascending z then insertion order.
    pub fn draw_with_z_index(
        &mut self,
        z_index: usize,
        func: impl FnOnce(&mut Screen, &mut MouseHandlers) + Send + 'static,
    ) {
        let seq = self.draw_seq;
        self.draw_seq += 1;
        self.draw_queue.push((z_index, seq, Box::new(func)));
    }

    /// Run queued draws. A draw may enqueue further draws (floats within
    /// floats); each batch is ordered before running.
    pub fn draw_all_floats(&mut self, mouse_handlers: &mut MouseHandlers) {
        while !self.draw_queue.is_empty() {
            let mut batch = std::mem::take(&mut self.draw_queue);
            batch.sort_by_key(|(z, seq, _)| (*z, *seq));
            for (_, _, func) in batch {
                func(self, mouse_handlers);
            }
        }
    }

    /// Plain text of one row in `0..width` (testing / diffing aid).
    pub fn row_text(&self, y: usize) -> String {
        let mut out = String::new();
        let mut x = 0;
        while x < self.width {
            let cell = self.data_char(y, x);
            out.push_str(&cell.grapheme);
            x += cell.width.max(1);
        }
        out
    }
}

//! Container tree: splits, float overlays, conditional and late-bound
//! containers.
//!
//! Containers compose into a tree whose leaves are windows. Size flows up
//! as `Dimension`s, space flows down through the weighted divider, and
//! floats defer their drawing into the screen's z-ordered queue.

use crate::controls::{DummyControl, FormattedTextControl};
use crate::dimension::{
    Dimension, distribute, distribute_remainder, max_dimensions, sum_dimensions,
};
use crate::screen::{Char, MouseHandlers, Screen, WritePosition};
use crate::window::{Window, merge_styles};
use std::sync::{Arc, OnceLock};
use stroke_core::Filter;
use stroke_keys::KeyBindingsBase;
use tracing::trace;

pub trait Container: Send + Sync {
    fn reset(&self) {}

    fn preferred_width(&self, max_available_width: usize) -> Dimension;

    fn preferred_height(&self, width: usize, max_available_height: usize) -> Dimension;

    #[allow(clippy::too_many_arguments)]
    fn write_to_screen(
        &self,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        write_position: &WritePosition,
        parent_style: &str,
        erase_bg: bool,
        z_index: Option<usize>,
    );

    fn get_children(&self) -> Vec<Arc<dyn Container>>;

    fn is_modal(&self) -> bool {
        false
    }

    fn get_key_bindings(&self) -> Option<Arc<dyn KeyBindingsBase>> {
        None
    }
}

/// Fallback content shown when a split cannot satisfy its children's
/// minimum sizes.
fn default_too_small() -> Arc<dyn Container> {
    static FALLBACK: OnceLock<Arc<dyn Container>> = OnceLock::new();
    FALLBACK
        .get_or_init(|| {
            Arc::new(
                Window::new(Arc::new(FormattedTextControl::from_text("Window too small... ")))
                    .with_style("class:window-too-small"),
            )
        })
        .clone()
}

// -------------------------------------------------------------------------------------------------
// Alignment
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerticalAlign {
    #[default]
    Justify,
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HorizontalAlign {
    #[default]
    Justify,
    Left,
    Center,
    Right,
}

/// Entries a split lays out: real children interleaved with padding.
enum SplitEntry {
    Child(usize),
    Padding,
}

fn interleave_with_padding(child_count: usize, padding: &Dimension) -> Vec<SplitEntry> {
    let mut entries = Vec::new();
    for i in 0..child_count {
        if i > 0 && !padding.is_zero() {
            entries.push(SplitEntry::Padding);
        }
        entries.push(SplitEntry::Child(i));
    }
    entries
}

// -------------------------------------------------------------------------------------------------
// HSplit
// -------------------------------------------------------------------------------------------------

/// Stacks children vertically.
pub struct HSplit {
    children: Vec<Arc<dyn Container>>,
    align: VerticalAlign,
    padding: Dimension,
    padding_char: Option<char>,
    padding_style: String,
    window_too_small: Option<Arc<dyn Container>>,
    style: String,
    z_index: Option<usize>,
}

impl HSplit {
    pub fn new(children: Vec<Arc<dyn Container>>) -> Self {
        Self {
            children,
            align: VerticalAlign::default(),
            padding: Dimension::zero(),
            padding_char: None,
            padding_style: String::new(),
            window_too_small: None,
            style: String::new(),
            z_index: None,
        }
    }

    pub fn with_align(mut self, align: VerticalAlign) -> Self {
        self.align = align;
        self
    }

    /// Negative padding is meaningless; `Dimension` is unsigned by
    /// construction, callers pass `Dimension::exact(n)`.
    pub fn with_padding(mut self, padding: Dimension) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_padding_char(mut self, padding_char: char) -> Self {
        self.padding_char = Some(padding_char);
        self
    }

    pub fn with_padding_style(mut self, style: impl Into<String>) -> Self {
        self.padding_style = style.into();
        self
    }

    pub fn with_window_too_small(mut self, fallback: Arc<dyn Container>) -> Self {
        self.window_too_small = Some(fallback);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_z_index(mut self, z_index: usize) -> Self {
        self.z_index = Some(z_index);
        self
    }

    fn entry_dimensions(&self, width: usize, max_height: usize) -> Vec<Dimension> {
        interleave_with_padding(self.children.len(), &self.padding)
            .iter()
            .map(|entry| match entry {
                SplitEntry::Child(i) => self.children[*i].preferred_height(width, max_height),
                SplitEntry::Padding => self.padding,
            })
            .collect()
    }
}

impl Container for HSplit {
    fn reset(&self) {
        for child in &self.children {
            child.reset();
        }
    }

    fn preferred_width(&self, max_available_width: usize) -> Dimension {
        let dimensions: Vec<Dimension> = self
            .children
            .iter()
            .map(|c| c.preferred_width(max_available_width))
            .collect();
        max_dimensions(&dimensions)
    }

    fn preferred_height(&self, width: usize, max_available_height: usize) -> Dimension {
        sum_dimensions(&self.entry_dimensions(width, max_available_height))
    }

    fn write_to_screen(
        &self,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        write_position: &WritePosition,
        parent_style: &str,
        erase_bg: bool,
        z_index: Option<usize>,
    ) {
        let style = merge_styles(parent_style, &self.style);
        let z_index = self.z_index.or(z_index);
        let entries = interleave_with_padding(self.children.len(), &self.padding);
        let dimensions = self.entry_dimensions(write_position.width, write_position.height);

        let Some(mut sizes) = distribute(&dimensions, write_position.height) else {
            trace!(target: "layout.split", height = write_position.height, "too_small");
            self.window_too_small
                .clone()
                .unwrap_or_else(default_too_small)
                .write_to_screen(screen, mouse_handlers, write_position, &style, erase_bg, z_index);
            return;
        };

        let total: usize = sizes.iter().sum();
        let leftover = write_position.height - total;
        let mut ypos = write_position.ypos;
        match self.align {
            VerticalAlign::Justify => {
                let weights: Vec<usize> = dimensions.iter().map(|d| d.weight).collect();
                distribute_remainder(&mut sizes, &weights, write_position.height);
            }
            VerticalAlign::Top => {}
            VerticalAlign::Bottom => ypos += leftover,
            VerticalAlign::Center => ypos += leftover / 2,
        }

        for (entry, size) in entries.iter().zip(&sizes) {
            let area = WritePosition::new(write_position.xpos, ypos, write_position.width, *size);
            match entry {
                SplitEntry::Child(i) => {
                    self.children[*i].write_to_screen(
                        screen,
                        mouse_handlers,
                        &area,
                        &style,
                        erase_bg,
                        z_index,
                    );
                }
                SplitEntry::Padding => {
                    if let Some(c) = self.padding_char {
                        let fill =
                            Char::new(c.to_string(), merge_styles(&style, &self.padding_style));
                        screen.fill_area(&area, &fill);
                    }
                }
            }
            ypos += size;
        }
    }

    fn get_children(&self) -> Vec<Arc<dyn Container>> {
        self.children.clone()
    }
}

// -------------------------------------------------------------------------------------------------
// VSplit
// -------------------------------------------------------------------------------------------------

/// Arranges children side by side.
pub struct VSplit {
    children: Vec<Arc<dyn Container>>,
    align: HorizontalAlign,
    padding: Dimension,
    padding_char: Option<char>,
    padding_style: String,
    window_too_small: Option<Arc<dyn Container>>,
    style: String,
    z_index: Option<usize>,
}

impl VSplit {
    pub fn new(children: Vec<Arc<dyn Container>>) -> Self {
        Self {
            children,
            align: HorizontalAlign::default(),
            padding: Dimension::zero(),
            padding_char: None,
            padding_style: String::new(),
            window_too_small: None,
            style: String::new(),
            z_index: None,
        }
    }

    pub fn with_align(mut self, align: HorizontalAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_padding(mut self, padding: Dimension) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_padding_char(mut self, padding_char: char) -> Self {
        self.padding_char = Some(padding_char);
        self
    }

    pub fn with_padding_style(mut self, style: impl Into<String>) -> Self {
        self.padding_style = style.into();
        self
    }

    pub fn with_window_too_small(mut self, fallback: Arc<dyn Container>) -> Self {
        self.window_too_small = Some(fallback);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_z_index(mut self, z_index: usize) -> Self {
        self.z_index = Some(z_index);
        self
    }

    fn entry_dimensions(&self, max_width: usize) -> Vec<Dimension> {
        interleave_with_padding(self.children.len(), &self.padding)
            .iter()
            .map(|entry| match entry {
                SplitEntry::Child(i) => self.children[*i].preferred_width(max_width),
                SplitEntry::Padding => self.padding,
            })
            .collect()
    }
}

impl Container for VSplit {
    fn reset(&self) {
        for child in &self.children {
            child.reset();
        }
    }

    fn preferred_width(&self, max_available_width: usize) -> Dimension {
        sum_dimensions(&self.entry_dimensions(max_available_width))
    }

    fn preferred_height(&self, width: usize, max_available_height: usize) -> Dimension {
        // Children share the row; the tallest preference wins. Use the
        // divided widths so wrapping children answer for their real width.
        let dimensions = self.entry_dimensions(width);
        let sizes = distribute(&dimensions, width);
        let entries = interleave_with_padding(self.children.len(), &self.padding);
        let heights: Vec<Dimension> = match sizes {
            Some(sizes) => entries
                .iter()
                .zip(&sizes)
                .filter_map(|(entry, size)| match entry {
                    SplitEntry::Child(i) => {
                        Some(self.children[*i].preferred_height(*size, max_available_height))
                    }
                    SplitEntry::Padding => None,
                })
                .collect(),
            None => self
                .children
                .iter()
                .map(|c| c.preferred_height(width, max_available_height))
                .collect(),
        };
        max_dimensions(&heights)
    }

    fn write_to_screen(
        &self,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        write_position: &WritePosition,
        parent_style: &str,
        erase_bg: bool,
        z_index: Option<usize>,
    ) {
        let style = merge_styles(parent_style, &self.style);
        let z_index = self.z_index.or(z_index);
        let entries = interleave_with_padding(self.children.len(), &self.padding);
        let dimensions = self.entry_dimensions(write_position.width);

        let Some(mut sizes) = distribute(&dimensions, write_position.width) else {
            trace!(target: "layout.split", width = write_position.width, "too_small");
            self.window_too_small
                .clone()
                .unwrap_or_else(default_too_small)
                .write_to_screen(screen, mouse_handlers, write_position, &style, erase_bg, z_index);
            return;
        };

        let total: usize = sizes.iter().sum();
        let leftover = write_position.width - total;
        let mut xpos = write_position.xpos;
        match self.align {
            HorizontalAlign::Justify => {
                let weights: Vec<usize> = dimensions.iter().map(|d| d.weight).collect();
                distribute_remainder(&mut sizes, &weights, write_position.width);
            }
            HorizontalAlign::Left => {}
            HorizontalAlign::Right => xpos += leftover,
            HorizontalAlign::Center => xpos += leftover / 2,
        }

        for (entry, size) in entries.iter().zip(&sizes) {
            let area = WritePosition::new(xpos, write_position.ypos, *size, write_position.height);
            match entry {
                SplitEntry::Child(i) => {
                    self.children[*i].write_to_screen(
                        screen,
                        mouse_handlers,
                        &area,
                        &style,
                        erase_bg,
                        z_index,
                    );
                }
                SplitEntry::Padding => {
                    if let Some(c) = self.padding_char {
                        let fill =
                            Char::new(c.to_string(), merge_styles(&style, &self.padding_style));
                        screen.fill_area(&area, &fill);
                    }
                }
            }
            xpos += size;
        }
    }

    fn get_children(&self) -> Vec<Arc<dyn Container>> {
        self.children.clone()
    }
}

// -------------------------------------------------------------------------------------------------
// Floats
// -------------------------------------------------------------------------------------------------

#[derive(Clone)]
pub struct Float {
    pub content: Arc<dyn Container>,
    pub top: Option<usize>,
    pub right: Option<usize>,
    pub bottom: Option<usize>,
    pub left: Option<usize>,
    pub width: Option<usize>,
    pub height: Option<usize>,
    /// Anchor horizontally / vertically at the background cursor.
    pub xcursor: bool,
    pub ycursor: bool,
    /// The window whose cursor anchors this float (falls back to any
    /// registered cursor).
    pub attach_to_window: Option<usize>,
    pub z_index: usize,
    pub transparent: bool,
    pub allow_cover_cursor: bool,
    pub hide_when_covering_content: bool,
}

impl Float {
    pub fn new(content: Arc<dyn Container>) -> Self {
        Self {
            content,
            top: None,
            right: None,
            bottom: None,
            left: None,
            width: None,
            height: None,
            xcursor: false,
            ycursor: false,
            attach_to_window: None,
            z_index: 1,
            transparent: false,
            allow_cover_cursor: false,
            hide_when_covering_content: false,
        }
    }

    pub fn at(mut self, top: Option<usize>, right: Option<usize>, bottom: Option<usize>, left: Option<usize>) -> Self {
        self.top = top;
        self.right = right;
        self.bottom = bottom;
        self.left = left;
        self
    }

    pub fn sized(mut self, width: Option<usize>, height: Option<usize>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_cursor_anchor(mut self, xcursor: bool, ycursor: bool) -> Self {
        self.xcursor = xcursor;
        self.ycursor = ycursor;
        self
    }

    pub fn attached_to(mut self, window_id: usize) -> Self {
        self.attach_to_window = Some(window_id);
        self
    }

    /// # Panics
    ///
    /// Panics on `z_index == 0`; floats always draw above the background.
    pub fn with_z_index(mut self, z_index: usize) -> Self {
        assert!(z_index >= 1, "float z_index must be >= 1");
        self.z_index = z_index;
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn with_allow_cover_cursor(mut self, allow: bool) -> Self {
        self.allow_cover_cursor = allow;
        self
    }

    pub fn with_hide_when_covering_content(mut self, hide: bool) -> Self {
        self.hide_when_covering_content = hide;
        self
    }

    /// Resolve one axis: (offset, size) within `avail`.
    fn resolve_axis(
        start: Option<usize>,
        end: Option<usize>,
        size: Option<usize>,
        preferred: usize,
        cursor: Option<usize>,
        avail: usize,
    ) -> (usize, usize) {
        if let Some(cursor) = cursor {
            // Anchored at the cursor, clipped into the visible area.
            let size = size.unwrap_or(preferred).min(avail);
            let offset = if cursor + size > avail {
                avail.saturating_sub(size)
            } else {
                cursor
            };
            return (offset, size);
        }
        match (start, end, size) {
            (Some(s), Some(e), None) => (s.min(avail), avail.saturating_sub(s + e)),
            (Some(s), _, Some(sz)) => (s.min(avail), sz.min(avail.saturating_sub(s.min(avail)))),
            (None, Some(e), Some(sz)) => {
                let sz = sz.min(avail);
                (avail.saturating_sub(e + sz), sz)
            }
            (None, None, Some(sz)) => {
                let sz = sz.min(avail);
                ((avail - sz) / 2, sz)
            }
            (Some(s), None, None) => (s.min(avail), preferred.min(avail.saturating_sub(s.min(avail)))),
            (None, Some(e), None) => {
                let sz = preferred.min(avail);
                (avail.saturating_sub(e + sz), sz)
            }
            (None, None, None) => {
                let sz = preferred.min(avail);
                ((avail - sz) / 2, sz)
            }
        }
    }
}

/// Background content plus floating overlays drawn at their z-indices.
pub struct FloatContainer {
    content: Arc<dyn Container>,
    floats: Vec<Float>,
}

impl FloatContainer {
    pub fn new(content: Arc<dyn Container>, floats: Vec<Float>) -> Self {
        Self { content, floats }
    }
}

impl Container for FloatContainer {
    fn reset(&self) {
        self.content.reset();
        for float in &self.floats {
            float.content.reset();
        }
    }

    fn preferred_width(&self, max_available_width: usize) -> Dimension {
        self.content.preferred_width(max_available_width)
    }

    fn preferred_height(&self, width: usize, max_available_height: usize) -> Dimension {
        self.content.preferred_height(width, max_available_height)
    }

    fn write_to_screen(
        &self,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        write_position: &WritePosition,
        parent_style: &str,
        erase_bg: bool,
        z_index: Option<usize>,
    ) {
        self.content.write_to_screen(
            screen,
            mouse_handlers,
            write_position,
            parent_style,
            erase_bg,
            z_index,
        );

        for float in &self.floats {
            let float = float.clone();
            let wp = *write_position;
            let style = parent_style.to_string();
            let new_z = z_index.unwrap_or(0) + float.z_index;
            screen.draw_with_z_index(new_z, move |screen, mouse_handlers| {
                draw_float(&float, screen, mouse_handlers, &wp, &style, new_z);
            });
        }
    }

    fn get_children(&self) -> Vec<Arc<dyn Container>> {
        let mut children = vec![self.content.clone()];
        children.extend(self.floats.iter().map(|f| f.content.clone()));
        children
    }
}

fn draw_float(
    float: &Float,
    screen: &mut Screen,
    mouse_handlers: &mut MouseHandlers,
    write_position: &WritePosition,
    style: &str,
    z_index: usize,
) {
    // Cursor anchor, when requested.
    let cursor = match float.attach_to_window {
        Some(window_id) => Some(screen.cursor_position(window_id)),
        None => screen.any_cursor_position(),
    };
    let (cursor_x, cursor_y) = match cursor {
        Some(point) => (
            Some(point.x.saturating_sub(write_position.xpos)),
            Some(point.y.saturating_sub(write_position.ypos)),
        ),
        None => (None, None),
    };

    let preferred_width = float
        .width
        .unwrap_or_else(|| float.content.preferred_width(write_position.width).preferred);
    let (x, width) = Float::resolve_axis(
        float.left,
        float.right,
        float.width,
        preferred_width,
        if float.xcursor { cursor_x } else { None },
        write_position.width,
    );
    let preferred_height = float.height.unwrap_or_else(|| {
        float
            .content
            .preferred_height(width, write_position.height)
            .preferred
    });
    let (y, height) = Float::resolve_axis(
        float.top,
        float.bottom,
        float.height,
        preferred_height,
        if float.ycursor { cursor_y } else { None },
        write_position.height,
    );

    if width == 0 || height == 0 {
        return;
    }
    let area = WritePosition::new(
        write_position.xpos + x,
        write_position.ypos + y,
        width,
        height,
    );

    // A float told to stay clear of the cursor disappears instead of
    // covering it.
    if float.hide_when_covering_content
        && !float.allow_cover_cursor
        && let Some(cursor) = cursor
        && cursor.x >= area.xpos
        && cursor.x < area.xpos + area.width
        && cursor.y >= area.ypos
        && cursor.y < area.ypos + area.height
    {
        trace!(target: "layout.float", z_index, "hidden_over_cursor");
        return;
    }

    float.content.write_to_screen(
        screen,
        mouse_handlers,
        &area,
        style,
        !float.transparent,
        Some(z_index),
    );
}

// -------------------------------------------------------------------------------------------------
// ConditionalContainer
// -------------------------------------------------------------------------------------------------

/// Shows `content` while the filter holds, otherwise the alternative (or
/// nothing, at zero size).
pub struct ConditionalContainer {
    content: Arc<dyn Container>,
    filter: Filter,
    alternative: Option<Arc<dyn Container>>,
}

impl ConditionalContainer {
    pub fn new(content: Arc<dyn Container>, filter: Filter) -> Self {
        Self {
            content,
            filter,
            alternative: None,
        }
    }

    pub fn with_alternative(mut self, alternative: Arc<dyn Container>) -> Self {
        self.alternative = Some(alternative);
        self
    }
}

impl Container for ConditionalContainer {
    fn reset(&self) {
        self.content.reset();
        if let Some(alternative) = &self.alternative {
            alternative.reset();
        }
    }

    fn preferred_width(&self, max_available_width: usize) -> Dimension {
        if self.filter.eval() {
            self.content.preferred_width(max_available_width)
        } else {
            match &self.alternative {
                Some(alternative) => alternative.preferred_width(max_available_width),
                None => Dimension::exact(0),
            }
        }
    }

    fn preferred_height(&self, width: usize, max_available_height: usize) -> Dimension {
        if self.filter.eval() {
            self.content.preferred_height(width, max_available_height)
        } else {
            match &self.alternative {
                Some(alternative) => alternative.preferred_height(width, max_available_height),
                None => Dimension::exact(0),
            }
        }
    }

    fn write_to_screen(
        &self,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        write_position: &WritePosition,
        parent_style: &str,
        erase_bg: bool,
        z_index: Option<usize>,
    ) {
        let target = if self.filter.eval() {
            Some(&self.content)
        } else {
            self.alternative.as_ref()
        };
        if let Some(target) = target {
            target.write_to_screen(
                screen,
                mouse_handlers,
                write_position,
                parent_style,
                erase_bg,
                z_index,
            );
        }
    }

    fn get_children(&self) -> Vec<Arc<dyn Container>> {
        let mut children = vec![self.content.clone()];
        children.extend(self.alternative.clone());
        children
    }
}

// -------------------------------------------------------------------------------------------------
// DynamicContainer
// -------------------------------------------------------------------------------------------------

pub type ContainerResolver = Arc<dyn Fn() -> Option<Arc<dyn Container>> + Send + Sync>;

/// Resolves its real container on every call; `None` behaves as an empty
/// zero-size container.
pub struct DynamicContainer {
    resolver: ContainerResolver,
}

impl DynamicContainer {
    pub fn new(resolver: impl Fn() -> Option<Arc<dyn Container>> + Send + Sync + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    fn resolve(&self) -> Arc<dyn Container> {
        static EMPTY: OnceLock<Arc<dyn Container>> = OnceLock::new();
        match (self.resolver)() {
            Some(container) => container,
            None => EMPTY
                .get_or_init(|| Arc::new(Window::new(Arc::new(DummyControl))))
                .clone(),
        }
    }
}

impl Container for DynamicContainer {
    fn reset(&self) {
        self.resolve().reset();
    }

    fn preferred_width(&self, max_available_width: usize) -> Dimension {
        self.resolve().preferred_width(max_available_width)
    }

    fn preferred_height(&self, width: usize, max_available_height: usize) -> Dimension {
        self.resolve().preferred_height(width, max_available_height)
    }

    fn write_to_screen(
        &self,
        screen: &mut Screen,
        mouse_handlers: &mut MouseHandlers,
        write_position: &WritePosition,
        parent_style: &str,
        erase_bg: bool,
        z_index: Option<usize>,
    ) {
        self.resolve().write_to_screen(
            screen,
            mouse_handlers,
            write_position,
            parent_style,
            erase_bg,
            z_index,
        );
    }

    fn get_children(&self) -> Vec<Arc<dyn Container>> {
        vec![self.resolve()]
    }
}


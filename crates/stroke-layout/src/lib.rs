//! Layout and rendering engine.
//!
//! A container tree (splits, floats, windows) produces preferred sizes via
//! weighted space division, windows compute scroll positions that keep the
//! cursor visible, and controls write styled cells into a sparse screen
//! buffer with z-ordered float overlays. The renderer that diffs the
//! screen against the terminal lives downstream; this crate stops at the
//! filled `Screen`.

pub mod containers;
pub mod controls;
pub mod dimension;
pub mod margins;
pub mod processors;
pub mod screen;
pub mod scroll;
pub mod search;
pub mod window;

pub use containers::{
    Container, ConditionalContainer, DynamicContainer, Float, FloatContainer, HSplit,
    HorizontalAlign, VSplit, VerticalAlign,
};
pub use controls::{
    BufferControl, DummyControl, FormattedTextControl, GetLinePrefix, SET_CURSOR_POSITION,
    SET_MENU_POSITION, SearchBufferControl, UIContent, UIControl,
};
pub use dimension::{Dimension, MAX_DIMENSION, TakeUsingWeights, distribute, sum_dimensions};
pub use margins::{ConditionalMargin, Margin, NumberedMargin, ScrollbarMargin};
pub use processors::{
    DisplayMultipleCursors, HighlightSearchProcessor, HighlightSelectionProcessor, Processor,
    Transformation, TransformationInput,
};
pub use screen::{Char, MouseHandler, MouseHandlers, Screen, WritePosition};
pub use scroll::{scroll_one_line_down, scroll_one_line_up, scroll_page_down, scroll_page_up};
pub use search::{SearchDirection, SearchState};
pub use window::{
    ColorColumn, ScrollOffsets, Window, WindowAlign, WindowRenderInfo,
};

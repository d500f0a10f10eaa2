//! Window margins: line numbers, scrollbars, and a conditional wrapper.

use crate::controls::UIContent;
use crate::window::WindowRenderInfo;
use stroke_core::{Filter, Fragment, Fragments};
use std::sync::Arc;

pub trait Margin: Send + Sync {
    /// Column width this margin needs. The content getter is lazy: margins
    /// that don't depend on content never pay for it.
    fn get_width(&self, get_ui_content: &mut dyn FnMut() -> UIContent) -> usize;

    /// Margin content as fragments; rows are separated by `\n`.
    fn create_margin(
        &self,
        render_info: &WindowRenderInfo,
        width: usize,
        height: usize,
    ) -> Fragments;
}

// -------------------------------------------------------------------------------------------------
// Line numbers
// -------------------------------------------------------------------------------------------------

/// Shows line numbers (absolute or relative to the cursor line); rows past
/// the end of the content show tildes when configured.
pub struct NumberedMargin {
    pub relative: Filter,
    pub display_tildes: Filter,
}

impl NumberedMargin {
    pub fn new() -> Self {
        Self {
            relative: Filter::never(),
            display_tildes: Filter::never(),
        }
    }

    pub fn with_relative(mut self, relative: Filter) -> Self {
        self.relative = relative;
        self
    }

    pub fn with_display_tildes(mut self, display_tildes: Filter) -> Self {
        self.display_tildes = display_tildes;
        self
    }
}

impl Default for NumberedMargin {
    fn default() -> Self {
        Self::new()
    }
}

fn digit_count(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

impl Margin for NumberedMargin {
    fn get_width(&self, get_ui_content: &mut dyn FnMut() -> UIContent) -> usize {
        digit_count(get_ui_content().line_count) + 1
    }

    fn create_margin(
        &self,
        render_info: &WindowRenderInfo,
        width: usize,
        height: usize,
    ) -> Fragments {
        let relative = self.relative.eval();
        let cursor_row = render_info
            .ui_content
            .cursor_position
            .map(|p| p.y)
            .unwrap_or(0);
        let mut fragments = Fragments::new();
        let mut last_lineno: Option<usize> = None;

        for row in 0..height {
            match render_info.displayed_lines.get(row) {
                Some(&lineno) => {
                    // Only the first row of a wrapped line gets a number.
                    if last_lineno != Some(lineno) {
                        let (style, number) = if lineno == cursor_row {
                            (
                                "class:line-number,current-line-number",
                                lineno + 1, // current line shows its absolute number
                            )
                        } else if relative {
                            ("class:line-number", lineno.abs_diff(cursor_row))
                        } else {
                            ("class:line-number", lineno + 1)
                        };
                        fragments.push(Fragment::new(
                            style,
                            format!("{:>width$}", number, width = width.saturating_sub(1)),
                        ));
                    }
                    last_lineno = Some(lineno);
                }
                None => {
                    if self.display_tildes.eval() {
                        fragments.push(Fragment::new("class:tilde", "~"));
                    }
                }
            }
            fragments.push(Fragment::new("", "\n"));
        }
        fragments
    }
}

// -------------------------------------------------------------------------------------------------
// Scrollbar
// -------------------------------------------------------------------------------------------------

/// One-column scrollbar with an optional arrow at each end.
pub struct ScrollbarMargin {
    pub display_arrows: Filter,
    pub up_arrow_symbol: char,
    pub down_arrow_symbol: char,
}

impl ScrollbarMargin {
    pub fn new() -> Self {
        Self {
            display_arrows: Filter::never(),
            up_arrow_symbol: '^',
            down_arrow_symbol: 'v',
        }
    }

    pub fn with_display_arrows(mut self, display_arrows: Filter) -> Self {
        self.display_arrows = display_arrows;
        self
    }
}

impl Default for ScrollbarMargin {
    fn default() -> Self {
        Self::new()
    }
}

impl Margin for ScrollbarMargin {
    fn get_width(&self, _get_ui_content: &mut dyn FnMut() -> UIContent) -> usize {
        1
    }

    fn create_margin(
        &self,
        render_info: &WindowRenderInfo,
        _width: usize,
        height: usize,
    ) -> Fragments {
        let arrows = self.display_arrows.eval();
        let track_height = if arrows { height.saturating_sub(2) } else { height };
        if track_height == 0 {
            return Vec::new();
        }
        let content_height = render_info.content_height().max(1);

        let thumb_start = render_info.vertical_scroll * track_height / content_height;
        let thumb_size = (track_height * track_height / content_height).max(1);
        let thumb_end = (thumb_start + thumb_size).min(track_height);

        let mut fragments = Fragments::new();
        if arrows {
            fragments.push(Fragment::new(
                "class:scrollbar.arrow",
                self.up_arrow_symbol.to_string(),
            ));
            fragments.push(Fragment::new("", "\n"));
        }
        for row in 0..track_height {
            let style = if row >= thumb_start && row < thumb_end {
                "class:scrollbar.button"
            } else {
                "class:scrollbar.background"
            };
            fragments.push(Fragment::new(style, " "));
            fragments.push(Fragment::new("", "\n"));
        }
        if arrows {
            fragments.push(Fragment::new(
                "class:scrollbar.arrow",
                self.down_arrow_symbol.to_string(),
            ));
        }
        fragments
    }
}

// -------------------------------------------------------------------------------------------------
// Conditional wrapper
// -------------------------------------------------------------------------------------------------

/// Forwards to the wrapped margin while the filter holds; reports zero
/// width otherwise.
pub struct ConditionalMargin {
    margin: Arc<dyn Margin>,
    filter: Filter,
}

impl ConditionalMargin {
    pub fn new(margin: Arc<dyn Margin>, filter: Filter) -> Self {
        Self { margin, filter }
    }
}

impl Margin for ConditionalMargin {
    fn get_width(&self, get_ui_content: &mut dyn FnMut() -> UIContent) -> usize {
        if self.filter.eval() {
            self.margin.get_width(get_ui_content)
        } else {
            0
        }
    }

    fn create_margin(
        &self,
        render_info: &WindowRenderInfo,
        width: usize,
        height: usize,
    ) -> Fragments {
        if self.filter.eval() && width > 0 {
            self.margin.create_margin(render_info, width, height)
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn digit_counting() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(99), 2);
        assert_eq!(digit_count(100), 3);
    }

    #[test]
    fn numbered_margin_width_tracks_line_count() {
        let margin = NumberedMargin::new();
        let mut get = || {
            UIContent::new(Arc::new(|_| Vec::new()), 150)
        };
        assert_eq!(margin.get_width(&mut get), 4); // "150" + space
    }

    #[test]
    fn conditional_margin_collapses() {
        let margin = ConditionalMargin::new(Arc::new(ScrollbarMargin::new()), Filter::never());
        let mut get = || UIContent::new(Arc::new(|_| Vec::new()), 3);
        assert_eq!(margin.get_width(&mut get), 0);
    }
}

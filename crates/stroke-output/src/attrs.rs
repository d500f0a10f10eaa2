//! Resolved style attributes and cursor shapes.

/// Attributes a cell or run of text renders with. Color strings are ANSI
/// color names (`"ansired"`), six-digit hex RGB (`"ff5733"`), `"default"`,
/// or empty for "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attrs {
    pub color: Option<String>,
    pub bgcolor: Option<String>,
    pub bold: bool,
    pub underline: bool,
    pub strike: bool,
    pub italic: bool,
    pub blink: bool,
    pub reverse: bool,
    pub hidden: bool,
}

impl Attrs {
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_bgcolor(mut self, bgcolor: impl Into<String>) -> Self {
        self.bgcolor = Some(bgcolor.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorShape {
    /// Leave whatever shape the terminal currently has untouched.
    NeverChange,
    Block,
    Beam,
    Underline,
    BlinkingBlock,
    BlinkingBeam,
    BlinkingUnderline,
}

impl CursorShape {
    pub(crate) fn escape_code(self) -> Option<&'static str> {
        match self {
            CursorShape::NeverChange => None,
            CursorShape::Block => Some("\x1b[2 q"),
            CursorShape::BlinkingBlock => Some("\x1b[1 q"),
            CursorShape::Underline => Some("\x1b[4 q"),
            CursorShape::BlinkingUnderline => Some("\x1b[3 q"),
            CursorShape::Beam => Some("\x1b[6 q"),
            CursorShape::BlinkingBeam => Some("\x1b[5 q"),
        }
    }
}

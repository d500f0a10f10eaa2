//! Key identities: named keys, character keys, and pressed-key values.
//!
//! A `KeyOrChar` is the unit the binding registry and processor match on:
//! either one of the named terminal keys below or a Unicode scalar. The
//! `Any` member is a first-class wildcard that matches any single key during
//! lookup while remaining distinct from every real key.
//!
//! Every named key has a canonical lowercase spelling (`"c-x"`, `"f4"`,
//! `"escape"`); `FromStr` accepts exactly those spellings plus the
//! `tab`/`enter`/`backspace` aliases, so binding tables read the way they
//! are written in documentation.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,

    ControlAt,
    ControlA,
    ControlB,
    ControlC,
    ControlD,
    ControlE,
    ControlF,
    ControlG,
    ControlH,
    ControlI,
    ControlJ,
    ControlK,
    ControlL,
    ControlM,
    ControlN,
    ControlO,
    ControlP,
    ControlQ,
    ControlR,
    ControlS,
    ControlT,
    ControlU,
    ControlV,
    ControlW,
    ControlX,
    ControlY,
    ControlZ,
    ControlBackslash,
    ControlSquareClose,
    ControlCircumflex,
    ControlUnderscore,

    Up,
    Down,
    Right,
    Left,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    BackTab,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    ScrollUp,
    ScrollDown,
    CPRResponse,
    Vt100MouseEvent,
    WindowsMouseEvent,
    BracketedPaste,
    SIGINT,
    /// Swallowed without dispatch; produced by decoders for sequences that
    /// must not reach any handler.
    Ignore,
    /// Wildcard: matches any single key-or-char during lookup.
    Any,
}

impl Key {
    // Control-key aliases used throughout binding tables.
    pub const TAB: Key = Key::ControlI;
    pub const ENTER: Key = Key::ControlM;
    pub const BACKSPACE: Key = Key::ControlH;

    pub fn name(self) -> &'static str {
        use Key::*;
        match self {
            Escape => "escape",
            ControlAt => "c-@",
            ControlA => "c-a",
            ControlB => "c-b",
            ControlC => "c-c",
            ControlD => "c-d",
            ControlE => "c-e",
            ControlF => "c-f",
            ControlG => "c-g",
            ControlH => "c-h",
            ControlI => "c-i",
            ControlJ => "c-j",
            ControlK => "c-k",
            ControlL => "c-l",
            ControlM => "c-m",
            ControlN => "c-n",
            ControlO => "c-o",
            ControlP => "c-p",
            ControlQ => "c-q",
            ControlR => "c-r",
            ControlS => "c-s",
            ControlT => "c-t",
            ControlU => "c-u",
            ControlV => "c-v",
            ControlW => "c-w",
            ControlX => "c-x",
            ControlY => "c-y",
            ControlZ => "c-z",
            ControlBackslash => "c-\\",
            ControlSquareClose => "c-]",
            ControlCircumflex => "c-^",
            ControlUnderscore => "c-_",
            Up => "up",
            Down => "down",
            Right => "right",
            Left => "left",
            Home => "home",
            End => "end",
            Insert => "insert",
            Delete => "delete",
            PageUp => "pageup",
            PageDown => "pagedown",
            BackTab => "s-tab",
            F1 => "f1",
            F2 => "f2",
            F3 => "f3",
            F4 => "f4",
            F5 => "f5",
            F6 => "f6",
            F7 => "f7",
            F8 => "f8",
            F9 => "f9",
            F10 => "f10",
            F11 => "f11",
            F12 => "f12",
            ScrollUp => "<scroll-up>",
            ScrollDown => "<scroll-down>",
            CPRResponse => "<cursor-position-response>",
            Vt100MouseEvent => "<vt100-mouse-event>",
            WindowsMouseEvent => "<windows-mouse-event>",
            BracketedPaste => "<bracketed-paste>",
            SIGINT => "<sigint>",
            Ignore => "<ignore>",
            Any => "<any>",
        }
    }

    fn all() -> &'static [Key] {
        use Key::*;
        &[
            Escape,
            ControlAt,
            ControlA,
            ControlB,
            ControlC,
            ControlD,
            ControlE,
            ControlF,
            ControlG,
            ControlH,
            ControlI,
            ControlJ,
            ControlK,
            ControlL,
            ControlM,
            ControlN,
            ControlO,
            ControlP,
            ControlQ,
            ControlR,
            ControlS,
            ControlT,
            ControlU,
            ControlV,
            ControlW,
            ControlX,
            ControlY,
            ControlZ,
            ControlBackslash,
            ControlSquareClose,
            ControlCircumflex,
            ControlUnderscore,
            Up,
            Down,
            Right,
            Left,
            Home,
            End,
            Insert,
            Delete,
            PageUp,
            PageDown,
            BackTab,
            F1,
            F2,
            F3,
            F4,
            F5,
            F6,
            F7,
            F8,
            F9,
            F10,
            F11,
            F12,
            ScrollUp,
            ScrollDown,
            CPRResponse,
            Vt100MouseEvent,
            WindowsMouseEvent,
            BracketedPaste,
            SIGINT,
            Ignore,
            Any,
        ]
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for unknown key spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKey(pub String);

impl fmt::Display for UnknownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown key name: {:?}", self.0)
    }
}

impl std::error::Error for UnknownKey {}

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tab" => return Ok(Key::TAB),
            "enter" => return Ok(Key::ENTER),
            "backspace" => return Ok(Key::BACKSPACE),
            _ => {}
        }
        Key::all()
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

// -------------------------------------------------------------------------------------------------
// KeyOrChar
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOrChar {
    Key(Key),
    Char(char),
}

impl KeyOrChar {
    pub fn is_any(self) -> bool {
        matches!(self, KeyOrChar::Key(Key::Any))
    }
}

impl From<Key> for KeyOrChar {
    fn from(key: Key) -> Self {
        KeyOrChar::Key(key)
    }
}

impl From<char> for KeyOrChar {
    fn from(ch: char) -> Self {
        KeyOrChar::Char(ch)
    }
}

impl fmt::Display for KeyOrChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOrChar::Key(k) => k.fmt(f),
            KeyOrChar::Char(c) => c.fmt(f),
        }
    }
}

impl FromStr for KeyOrChar {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(KeyOrChar::Char(c));
        }
        if s == "space" {
            return Ok(KeyOrChar::Char(' '));
        }
        s.parse::<Key>().map(KeyOrChar::Key)
    }
}

/// Parse a binding key sequence from its spellings.
///
/// # Panics
///
/// Panics on an unknown spelling (programmer error in a binding table).
pub fn parse_key_sequence(specs: &[&str]) -> Vec<KeyOrChar> {
    specs
        .iter()
        .map(|s| {
            s.parse::<KeyOrChar>()
                .unwrap_or_else(|e| panic!("invalid key in binding table: {e}"))
        })
        .collect()
}

// -------------------------------------------------------------------------------------------------
// KeyPress
// -------------------------------------------------------------------------------------------------

/// A decoded key event: the key identity plus the raw data that produced it.
/// For character keys the data defaults to the character itself (used by
/// self-insert); for protocol keys it carries the escape payload (mouse
/// reports, CPR responses, bracketed paste bodies).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: KeyOrChar,
    pub data: String,
}

impl KeyPress {
    pub fn new(key: impl Into<KeyOrChar>) -> Self {
        let key = key.into();
        let data = match key {
            KeyOrChar::Char(c) => c.to_string(),
            KeyOrChar::Key(_) => String::new(),
        };
        Self { key, data }
    }

    pub fn with_data(key: impl Into<KeyOrChar>, data: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_round_trip() {
        for key in Key::all() {
            // Aliased spellings parse back to the aliased key, which is
            // structurally equal for control keys.
            assert_eq!(key.name().parse::<Key>().unwrap(), *key);
        }
    }

    #[test]
    fn aliases() {
        assert_eq!("tab".parse::<Key>().unwrap(), Key::ControlI);
        assert_eq!("enter".parse::<Key>().unwrap(), Key::ControlM);
        assert_eq!("backspace".parse::<Key>().unwrap(), Key::ControlH);
    }

    #[test]
    fn unknown_name_rejected() {
        assert!("c-xyzzy".parse::<Key>().is_err());
    }

    #[test]
    fn key_or_char_from_str() {
        assert_eq!("a".parse::<KeyOrChar>().unwrap(), KeyOrChar::Char('a'));
        assert_eq!("space".parse::<KeyOrChar>().unwrap(), KeyOrChar::Char(' '));
        assert_eq!(
            "c-x".parse::<KeyOrChar>().unwrap(),
            KeyOrChar::Key(Key::ControlX)
        );
    }

    #[test]
    fn char_press_carries_itself_as_data() {
        assert_eq!(KeyPress::new('q').data, "q");
        assert_eq!(KeyPress::new(Key::Up).data, "");
    }
}

//! Mouse report payload decoding.
//!
//! The input decoder surfaces terminal mouse reports as key presses carrying
//! the raw escape payload; these functions turn a payload into the shared
//! `MouseEvent` model. Three wire forms exist:
//!
//! * SGR:     `ESC [ < code ; x ; y (M|m)` — `M` press/move, `m` release
//! * typical: `ESC [ M c_code c_x c_y` — bytes offset by 32, 1-based
//! * urxvt:   `ESC [ code ; x ; y M` — 1-based decimal fields
//!
//! Unparseable payloads decode to `None`; a garbled report must never take
//! down the key pipeline.

use stroke_core::{MouseButton, MouseEvent, MouseEventType, MouseModifiers, Point};

/// Button bits of an xterm code (low two bits, scroll bit folded in).
fn decode_button(code: u16) -> MouseButton {
    if code & 64 != 0 {
        return MouseButton::None; // scroll reports carry no button
    }
    match code & 0b11 {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        2 => MouseButton::Right,
        3 => MouseButton::None,
        _ => unreachable!(),
    }
}

fn decode_modifiers(code: u16) -> MouseModifiers {
    let mut mods = MouseModifiers::empty();
    if code & 4 != 0 {
        mods |= MouseModifiers::SHIFT;
    }
    if code & 8 != 0 {
        mods |= MouseModifiers::ALT;
    }
    if code & 16 != 0 {
        mods |= MouseModifiers::CTRL;
    }
    mods
}

/// Event kind from an xterm code plus the press/release flag.
fn decode_event_type(code: u16, pressed: bool) -> MouseEventType {
    if code & 64 != 0 {
        // Scroll wheel: low bit selects the direction.
        if code & 0b1 == 0 {
            MouseEventType::ScrollUp
        } else {
            MouseEventType::ScrollDown
        }
    } else if code & 32 != 0 {
        MouseEventType::MouseMove
    } else if pressed {
        MouseEventType::MouseDown
    } else {
        MouseEventType::MouseUp
    }
}

fn event_from_code(code: u16, pressed: bool, x: usize, y: usize) -> MouseEvent {
    MouseEvent::new(
        Point::new(x, y),
        decode_event_type(code, pressed),
        decode_button(code),
        decode_modifiers(code),
    )
}

/// Decode an SGR payload: `\x1b[<0;5;10M`. Coordinates in the report are
/// 1-based; the result is 0-based.
pub fn parse_sgr_mouse_event(data: &str) -> Option<MouseEvent> {
    let rest = data.strip_prefix("\x1b[<")?;
    let pressed = match rest.as_bytes().last()? {
        b'M' => true,
        b'm' => false,
        _ => return None,
    };
    let rest = &rest[..rest.len() - 1];
    let mut fields = rest.split(';');
    let code: u16 = fields.next()?.parse().ok()?;
    let x: usize = fields.next()?.parse().ok()?;
    let y: usize = fields.next()?.parse().ok()?;
    if fields.next().is_some() || x == 0 || y == 0 {
        return None;
    }
    Some(event_from_code(code, pressed, x - 1, y - 1))
}

/// Decode an X10/typical payload: `\x1b[M` followed by three bytes, each
/// offset by 32 (or by 0xDC00 + 32 for surrogate-escaped input).
pub fn parse_typical_mouse_event(data: &str) -> Option<MouseEvent> {
    let rest = data.strip_prefix("\x1b[M")?;
    let mut chars = rest.chars();
    let (c_code, c_x, c_y) = (chars.next()?, chars.next()?, chars.next()?);
    if chars.next().is_some() {
        return None;
    }
    let unshift = |c: char| -> Option<u32> {
        let v = c as u32;
        // Surrogate-escape form shifts the byte into 0xDC00..0xDCFF.
        let v = if (0xDC00..0xDD00).contains(&v) { v - 0xDC00 } else { v };
        v.checked_sub(32)
    };
    let code = unshift(c_code)? as u16;
    let x = unshift(c_x)? as usize;
    let y = unshift(c_y)? as usize;
    if x == 0 || y == 0 {
        return None;
    }
    // X10 reports only press (and release as button 3); move/scroll share
    // the same bit layout as SGR codes.
    let pressed = code & 0b11 != 3;
    Some(event_from_code(code, pressed, x - 1, y - 1))
}

/// Decode an urxvt payload: `\x1b[96;14;3M` with 1-based decimal fields.
pub fn parse_urxvt_mouse_event(data: &str) -> Option<MouseEvent> {
    let rest = data.strip_prefix("\x1b[")?.strip_suffix('M')?;
    let mut fields = rest.split(';');
    let code: u16 = fields.next()?.parse().ok()?;
    let x: usize = fields.next()?.parse().ok()?;
    let y: usize = fields.next()?.parse().ok()?;
    if fields.next().is_some() || x == 0 || y == 0 {
        return None;
    }
    // urxvt codes are already offset by 32.
    let code = code.checked_sub(32)?;
    let pressed = code & 0b11 != 3;
    Some(event_from_code(code, pressed, x - 1, y - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sgr_left_press() {
        let ev = parse_sgr_mouse_event("\x1b[<0;5;10M").unwrap();
        assert_eq!(ev.position, Point::new(4, 9));
        assert_eq!(ev.event_type, MouseEventType::MouseDown);
        assert_eq!(ev.button, MouseButton::Left);
        assert_eq!(ev.modifiers, MouseModifiers::empty());
    }

    #[test]
    fn sgr_release_and_modifiers() {
        let ev = parse_sgr_mouse_event("\x1b[<18;1;1m").unwrap(); // right + ctrl
        assert_eq!(ev.event_type, MouseEventType::MouseUp);
        assert_eq!(ev.button, MouseButton::Right);
        assert_eq!(ev.modifiers, MouseModifiers::CTRL);
    }

    #[test]
    fn sgr_scroll() {
        let up = parse_sgr_mouse_event("\x1b[<64;3;4M").unwrap();
        assert_eq!(up.event_type, MouseEventType::ScrollUp);
        assert_eq!(up.button, MouseButton::None);
        let down = parse_sgr_mouse_event("\x1b[<65;3;4M").unwrap();
        assert_eq!(down.event_type, MouseEventType::ScrollDown);
    }

    #[test]
    fn sgr_drag_is_move() {
        let ev = parse_sgr_mouse_event("\x1b[<32;2;2M").unwrap();
        assert_eq!(ev.event_type, MouseEventType::MouseMove);
        assert_eq!(ev.button, MouseButton::Left);
    }

    #[test]
    fn typical_encodes_with_offset_32() {
        // code 0 -> ' ', x 5 -> '%', y 10 -> '*'
        let ev = parse_typical_mouse_event("\x1b[M %*").unwrap();
        assert_eq!(ev.position, Point::new(4, 9));
        assert_eq!(ev.event_type, MouseEventType::MouseDown);
    }

    #[test]
    fn typical_button_release() {
        // code 3 -> '#': no button = release in X10 terms
        let ev = parse_typical_mouse_event("\x1b[M#!!").unwrap();
        assert_eq!(ev.event_type, MouseEventType::MouseUp);
        assert_eq!(ev.button, MouseButton::None);
    }

    #[test]
    fn urxvt_codes() {
        let ev = parse_urxvt_mouse_event("\x1b[32;14;3M").unwrap();
        assert_eq!(ev.position, Point::new(13, 2));
        assert_eq!(ev.event_type, MouseEventType::MouseDown);
        let scroll = parse_urxvt_mouse_event("\x1b[96;1;1M").unwrap();
        assert_eq!(scroll.event_type, MouseEventType::ScrollUp);
    }

    #[test]
    fn garbage_decodes_to_none() {
        for payload in ["", "\x1b[<", "\x1b[<a;b;cM", "\x1b[M", "\x1b[<0;0;0M", "nonsense"] {
            assert_eq!(parse_sgr_mouse_event(payload), None, "{payload:?}");
            assert_eq!(parse_urxvt_mouse_event(payload), None, "{payload:?}");
        }
        assert_eq!(parse_typical_mouse_event("\x1b[M!"), None);
    }
}

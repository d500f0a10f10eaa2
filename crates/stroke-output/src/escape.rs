//! Attrs → SGR escape string memoization.
//!
//! One cache per output, keyed by `(Attrs, ColorDepth)`. The produced string
//! always starts from a reset (`ESC[0;...m`) so emission never depends on
//! the terminal's previous attribute state.

use crate::attrs::Attrs;
use crate::color_depth::ColorDepth;
use crate::colors::{
    SixteenColorCache, TwoFiftySixColorCache, ansi_color_entry, parse_hex,
};
use ahash::AHashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct EscapeCodeCache {
    cache: RwLock<AHashMap<(Attrs, ColorDepth), String>>,
    sixteen: SixteenColorCache,
    two_fifty_six: TwoFiftySixColorCache,
}

impl EscapeCodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn escape_code(&self, attrs: &Attrs, depth: ColorDepth) -> String {
        let key = (attrs.clone(), depth);
        if let Some(hit) = self.cache.read().unwrap().get(&key) {
            return hit.clone();
        }
        let code = self.build(attrs, depth);
        self.cache.write().unwrap().insert(key, code.clone());
        code
    }

    fn build(&self, attrs: &Attrs, depth: ColorDepth) -> String {
        let mut codes: Vec<String> = Vec::new();

        // Foreground, then background. The 4-bit background mapping excludes
        // whatever ANSI name the foreground landed on, so a hex pair that is
        // nearly identical stays distinguishable.
        let fg_name = self.color_codes(attrs.color.as_deref(), depth, false, None, &mut codes);
        self.color_codes(attrs.bgcolor.as_deref(), depth, true, fg_name, &mut codes);

        for (enabled, code) in [
            (attrs.bold, "1"),
            (attrs.italic, "3"),
            (attrs.underline, "4"),
            (attrs.blink, "5"),
            (attrs.reverse, "7"),
            (attrs.hidden, "8"),
            (attrs.strike, "9"),
        ] {
            if enabled {
                codes.push(code.to_string());
            }
        }

        if codes.is_empty() {
            "\x1b[0m".to_string()
        } else {
            format!("\x1b[0;{}m", codes.join(";"))
        }
    }

    /// Append the color escape codes for one side; returns the ANSI name the
    /// color resolved to when an RGB value went through the 16-color map.
    fn color_codes(
        &self,
        color: Option<&str>,
        depth: ColorDepth,
        background: bool,
        exclude_name: Option<&'static str>,
        codes: &mut Vec<String>,
    ) -> Option<&'static str> {
        let color = match color {
            Some(c) if !c.is_empty() => c,
            _ => return None,
        };
        let offset = if background { 10 } else { 0 };

        if color == "ansidefault" || color == "default" {
            if depth != ColorDepth::Depth1Bit {
                codes.push((39 + offset).to_string());
            }
            return None;
        }

        if let Some((code, table_index, rgb)) = ansi_color_entry(color) {
            match depth {
                ColorDepth::Depth1Bit => {}
                ColorDepth::Depth4Bit => codes.push((code + offset).to_string()),
                ColorDepth::Depth8Bit => {
                    // Table order matches palette indices 0..=15.
                    let base = if background { 48 } else { 38 };
                    codes.push(format!("{base};5;{table_index}"));
                }
                ColorDepth::Depth24Bit => {
                    let base = if background { 48 } else { 38 };
                    codes.push(format!("{base};2;{};{};{}", rgb.0, rgb.1, rgb.2));
                }
            }
            return None;
        }

        let Some(rgb) = parse_hex(color) else {
            return None; // unresolvable color strings are best-effort no-ops
        };
        match depth {
            ColorDepth::Depth1Bit => None,
            ColorDepth::Depth4Bit => {
                let (code, name) = self.sixteen.closest(rgb, exclude_name);
                codes.push((code + offset).to_string());
                Some(name)
            }
            ColorDepth::Depth8Bit => {
                let base = if background { 48 } else { 38 };
                codes.push(format!("{base};5;{}", self.two_fifty_six.closest(rgb)));
                None
            }
            ColorDepth::Depth24Bit => {
                let base = if background { 48 } else { 38 };
                codes.push(format!("{base};2;{};{};{}", rgb.0, rgb.1, rgb.2));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cache() -> EscapeCodeCache {
        EscapeCodeCache::new()
    }

    #[test]
    fn empty_attrs_reset_only() {
        assert_eq!(
            cache().escape_code(&Attrs::default(), ColorDepth::Depth8Bit),
            "\x1b[0m"
        );
    }

    #[test]
    fn monochrome_drops_colors_keeps_styles() {
        let attrs = Attrs {
            bold: true,
            ..Attrs::default()
        }
        .with_color("ff0000");
        assert_eq!(
            cache().escape_code(&attrs, ColorDepth::Depth1Bit),
            "\x1b[0;1m"
        );
    }

    #[test]
    fn named_color_four_bit() {
        let attrs = Attrs::default().with_color("ansired").with_bgcolor("ansiblue");
        assert_eq!(
            cache().escape_code(&attrs, ColorDepth::Depth4Bit),
            "\x1b[0;31;44m"
        );
    }

    #[test]
    fn named_color_eight_bit_uses_low_palette() {
        let attrs = Attrs::default().with_color("ansired");
        assert_eq!(
            cache().escape_code(&attrs, ColorDepth::Depth8Bit),
            "\x1b[0;38;5;1m"
        );
    }

    #[test]
    fn hex_eight_bit() {
        let attrs = Attrs::default().with_color("ff0000");
        assert_eq!(
            cache().escape_code(&attrs, ColorDepth::Depth8Bit),
            "\x1b[0;38;5;196m"
        );
    }

    #[test]
    fn hex_true_color() {
        let attrs = Attrs::default().with_color("ff5733").with_bgcolor("000000");
        assert_eq!(
            cache().escape_code(&attrs, ColorDepth::Depth24Bit),
            "\x1b[0;38;2;255;87;51;48;2;0;0;0m"
        );
    }

    #[test]
    fn four_bit_fg_bg_never_collide() {
        // Both map nearest to ansiwhite; the background must pick another.
        let attrs = Attrs::default()
            .with_color("fafafa")
            .with_bgcolor("f0f0f0");
        let code = cache().escape_code(&attrs, ColorDepth::Depth4Bit);
        let body = code
            .strip_prefix("\x1b[0;")
            .and_then(|s| s.strip_suffix('m'))
            .unwrap();
        let parts: Vec<&str> = body.split(';').collect();
        assert_eq!(parts.len(), 2);
        assert_ne!(parts[0].parse::<u16>().unwrap() + 10, parts[1].parse::<u16>().unwrap());
    }

    #[test]
    fn style_flag_order() {
        let attrs = Attrs {
            bold: true,
            underline: true,
            strike: true,
            italic: true,
            blink: true,
            reverse: true,
            hidden: true,
            ..Attrs::default()
        };
        assert_eq!(
            cache().escape_code(&attrs, ColorDepth::Depth1Bit),
            "\x1b[0;1;3;4;5;7;8;9m"
        );
    }

    #[test]
    fn functionally_pure() {
        let attrs = Attrs::default().with_color("aabbcc");
        let c = cache();
        assert_eq!(
            c.escape_code(&attrs, ColorDepth::Depth8Bit),
            c.escape_code(&attrs, ColorDepth::Depth8Bit)
        );
    }

    #[test]
    fn default_color_codes() {
        let attrs = Attrs::default().with_color("default").with_bgcolor("default");
        assert_eq!(
            cache().escape_code(&attrs, ColorDepth::Depth4Bit),
            "\x1b[0;39;49m"
        );
    }
}

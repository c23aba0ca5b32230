//! CSS color parsing into normalized RGBA.

use std::str::FromStr;

use csscolorparser::Color as CssColor;
use serde::{Deserialize, Serialize};

use crate::values::{function_args, parse_percentage, split_top_level_whitespace};

/// Color with every channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
            a: a as f64 / 255.0,
        }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= f64::EPSILON
    }

    /// `#rrggbb`, alpha dropped.
    pub fn to_hex(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            channel_u8(self.r),
            channel_u8(self.g),
            channel_u8(self.b)
        )
    }

    /// `#rrggbbaa`.
    pub fn to_hex8(&self) -> String {
        format!("{}{:02x}", self.to_hex(), channel_u8(self.a))
    }
}

fn channel_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

const NAMED_COLORS: &[(&str, &str)] = &[
    ("black", "#000000"),
    ("white", "#ffffff"),
    ("red", "#ff0000"),
    ("green", "#008000"),
    ("lime", "#00ff00"),
    ("blue", "#0000ff"),
    ("yellow", "#ffff00"),
    ("cyan", "#00ffff"),
    ("aqua", "#00ffff"),
    ("magenta", "#ff00ff"),
    ("fuchsia", "#ff00ff"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("silver", "#c0c0c0"),
    ("maroon", "#800000"),
    ("olive", "#808000"),
    ("navy", "#000080"),
    ("purple", "#800080"),
    ("teal", "#008080"),
    ("orange", "#ffa500"),
];

/// Parses hex (3/4/6/8 digits), `rgb()`/`rgba()`, the fixed named-color
/// table and, as a last resort, any other CSS color syntax (`hsl()`, the
/// full named set). Returns `None` for keywords without a concrete color
/// (`currentcolor`, `inherit`, `none`) and for unparseable input.
pub fn parse_color(input: &str) -> Option<Rgba> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    match lower.as_str() {
        "none" | "inherit" | "initial" | "unset" | "currentcolor" => return None,
        "transparent" => return Some(Rgba::TRANSPARENT),
        _ => {}
    }

    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = function_args(&lower, "rgb").or_else(|| function_args(&lower, "rgba")) {
        return parse_rgb_args(args);
    }
    if let Some((_, hex)) = NAMED_COLORS.iter().find(|(name, _)| *name == lower) {
        return parse_hex(&hex[1..]);
    }

    // The fallback parser also reads bare hex digits, which would turn
    // numbers like "100" into colors.
    if lower.chars().all(|c| c.is_ascii_hexdigit() || c == '.') {
        return None;
    }
    CssColor::from_str(trimmed)
        .ok()
        .map(|c| Rgba::new(c.r, c.g, c.b, c.a))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::from_u8(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        4 => Some(Rgba::from_u8(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Rgba::from_u8(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Rgba::from_u8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

/// Components are 0-255 (or percentages). Alpha is 0-1 or a percentage;
/// an alpha above 1 is read as a 0-255 byte and divided by 255, which
/// tolerates a known malformed pattern from the extraction side.
fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let (channels, alpha) = if args.contains(',') {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [r, g, b] => (vec![*r, *g, *b], None),
            [r, g, b, a] => (vec![*r, *g, *b], Some(*a)),
            _ => return None,
        }
    } else {
        // Space syntax: `rgb(0 0 0 / 50%)`
        let (color_part, alpha_part) = match args.split_once('/') {
            Some((c, a)) => (c, Some(a.trim())),
            None => (args, None),
        };
        let parts = split_top_level_whitespace(color_part);
        if parts.len() != 3 {
            return None;
        }
        (parts, alpha_part)
    };

    let mut rgb = [0.0f64; 3];
    for (slot, raw) in rgb.iter_mut().zip(channels.iter()) {
        let value = match parse_percentage(raw) {
            Some(fraction) => fraction,
            None => raw.parse::<f64>().ok().filter(|v| v.is_finite())? / 255.0,
        };
        *slot = value.clamp(0.0, 1.0);
    }

    let a = match alpha {
        None => 1.0,
        Some(raw) => match parse_percentage(raw) {
            Some(fraction) => fraction,
            None => {
                let v = raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
                if v > 1.0 { v / 255.0 } else { v }
            }
        },
    };

    Some(Rgba::new(rgb[0], rgb[1], rgb[2], a.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn hex_round_trips_six_digits() {
        for hex in ["#1a2b3c", "#ffffff", "#000000", "#7f8081", "#c0ffee"] {
            let color = parse_color(hex).expect("hex should parse");
            assert_eq!(color.to_hex(), hex);
            assert_eq!(color.a, 1.0);
        }
    }

    #[test]
    fn short_and_alpha_hex() {
        assert_eq!(parse_color("#f00").unwrap().to_hex(), "#ff0000");
        let c = parse_color("#00ff0080").unwrap();
        assert!(approx(c.a, 128.0 / 255.0));
        assert!(parse_color("#ff").is_none());
        assert!(parse_color("#gggggg").is_none());
    }

    #[test]
    fn rgb_and_rgba_functions() {
        let c = parse_color("rgb(255, 0, 0)").unwrap();
        assert_eq!(c, Rgba::new(1.0, 0.0, 0.0, 1.0));
        let c = parse_color("rgba(0, 255, 0, 0.5)").unwrap();
        assert!(approx(c.g, 1.0) && approx(c.a, 0.5));
        let c = parse_color("rgb(0 0 255 / 25%)").unwrap();
        assert!(approx(c.b, 1.0) && approx(c.a, 0.25));
    }

    #[test]
    fn alpha_above_one_is_read_as_byte() {
        let c = parse_color("rgba(0, 0, 0, 128)").unwrap();
        assert!(approx(c.a, 128.0 / 255.0));
    }

    #[test]
    fn named_colors_route_through_hex() {
        assert_eq!(parse_color("Red").unwrap().to_hex(), "#ff0000");
        assert_eq!(parse_color("grey").unwrap().to_hex(), "#808080");
        assert_eq!(parse_color("transparent"), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn other_css_syntax_falls_back_to_full_parser() {
        assert_eq!(parse_color("hsl(0, 100%, 50%)").unwrap().to_hex(), "#ff0000");
        assert_eq!(parse_color("rebeccapurple").unwrap().to_hex(), "#663399");
    }

    #[test]
    fn unparseable_yields_none() {
        assert!(parse_color("currentColor").is_none());
        assert!(parse_color("not-a-color").is_none());
        assert!(parse_color("rgb(1, 2)").is_none());
        assert!(parse_color("").is_none());
        assert!(parse_color("100").is_none());
        assert!(parse_color("ff0000").is_none());
    }
}

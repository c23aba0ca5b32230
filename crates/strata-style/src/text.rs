use strata_ir::{CssProperty, Styles};
use tracing::debug;

use crate::color::{Rgba, parse_color};
use crate::model::{LineHeight, TextAlign, TextCase, TextDecoration, TextStyle};
use crate::values::parse_length;

pub fn map_text_style(styles: &Styles) -> TextStyle {
    let defaults = TextStyle::default();
    let font_size = styles
        .number(CssProperty::FontSize)
        .filter(|s| *s > 0.0)
        .unwrap_or(defaults.font_size);

    TextStyle {
        font_size,
        line_height: styles
            .str(CssProperty::LineHeight)
            .map(|v| line_height(&v))
            .unwrap_or_default(),
        letter_spacing: styles
            .str(CssProperty::LetterSpacing)
            .and_then(|v| parse_length(&v))
            .unwrap_or(0.0),
        align: match styles.keyword(CssProperty::TextAlign).as_deref() {
            Some("center") => TextAlign::Center,
            Some("right") | Some("end") => TextAlign::Right,
            Some("justify") => TextAlign::Justified,
            _ => TextAlign::Left,
        },
        decoration: styles
            .keyword(CssProperty::TextDecoration)
            .map(|v| decoration(&v))
            .unwrap_or_default(),
        case: match styles.keyword(CssProperty::TextTransform).as_deref() {
            Some("uppercase") => TextCase::Upper,
            Some("lowercase") => TextCase::Lower,
            Some("capitalize") => TextCase::Title,
            _ => TextCase::Original,
        },
        color: styles
            .str(CssProperty::Color)
            .and_then(|v| parse_color(&v))
            .unwrap_or(Rgba::BLACK),
    }
}

/// `normal` is auto, `px` is absolute, `%` and unitless multipliers are
/// relative to the font size.
fn line_height(value: &str) -> LineHeight {
    let v = value.trim();
    if v.eq_ignore_ascii_case("normal") {
        return LineHeight::Auto;
    }
    if let Some(percent) = v.strip_suffix('%') {
        if let Ok(p) = percent.trim().parse::<f64>() {
            return LineHeight::Percent(p);
        }
    }
    if v.ends_with("px") {
        if let Some(px) = parse_length(v) {
            return LineHeight::Pixels(px);
        }
    }
    match v.parse::<f64>() {
        Ok(multiplier) if multiplier.is_finite() && multiplier > 0.0 => {
            LineHeight::Percent(multiplier * 100.0)
        }
        _ => {
            debug!(line_height = %v, "line-height not understood, using auto");
            LineHeight::Auto
        }
    }
}

/// Computed `text-decoration` carries line, style and color
/// (`underline solid rgb(0, 0, 0)`); only the line matters here.
fn decoration(value: &str) -> TextDecoration {
    if value.contains("underline") {
        TextDecoration::Underline
    } else if value.contains("line-through") {
        TextDecoration::Strikethrough
    } else {
        TextDecoration::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::StyleValue;

    fn styles(pairs: &[(&str, StyleValue)]) -> Styles {
        let mut styles = Styles::default();
        for (name, value) in pairs {
            styles.insert(name, value.clone());
        }
        styles
    }

    #[test]
    fn defaults_when_unstyled() {
        let style = map_text_style(&Styles::default());
        assert_eq!(style, TextStyle::default());
    }

    #[test]
    fn line_height_units() {
        assert_eq!(line_height("normal"), LineHeight::Auto);
        assert_eq!(line_height("24px"), LineHeight::Pixels(24.0));
        assert_eq!(line_height("1.5"), LineHeight::Percent(150.0));
        assert_eq!(line_height("120%"), LineHeight::Percent(120.0));
        assert_eq!(line_height("bogus"), LineHeight::Auto);
    }

    #[test]
    fn full_text_style() {
        let style = map_text_style(&styles(&[
            ("fontSize", StyleValue::from("20px")),
            ("letterSpacing", StyleValue::from("0.5px")),
            ("textAlign", StyleValue::from("center")),
            ("textDecoration", StyleValue::from("underline solid rgb(0, 0, 0)")),
            ("textTransform", StyleValue::from("uppercase")),
            ("color", StyleValue::from("#ff0000")),
        ]));
        assert_eq!(style.font_size, 20.0);
        assert_eq!(style.letter_spacing, 0.5);
        assert_eq!(style.align, TextAlign::Center);
        assert_eq!(style.decoration, TextDecoration::Underline);
        assert_eq!(style.case, TextCase::Upper);
        assert_eq!(style.color.to_hex(), "#ff0000");
    }
}

//! Typed view over the raw computed-style bag of an IR node.
//!
//! The extraction agent ships `{property: value}` maps using either CSS
//! (`z-index`) or CSSOM (`zIndex`) spelling. Recognized properties are keyed
//! by [`CssProperty`]; anything else is kept verbatim in an opaque bucket.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Number(f64),
    Text(String),
}

impl StyleValue {
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            StyleValue::Number(n) => Cow::Owned(format_number(*n)),
            StyleValue::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    /// Numeric value, accepting bare numbers and `px` lengths.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            StyleValue::Number(n) if n.is_finite() => Some(*n),
            StyleValue::Number(_) => None,
            StyleValue::Text(s) => {
                let trimmed = s.trim();
                let raw = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
                raw.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        match self {
            StyleValue::Text(s) => s.trim().eq_ignore_ascii_case(keyword),
            StyleValue::Number(_) => false,
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Text(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Text(value)
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Number(value)
    }
}

impl From<i32> for StyleValue {
    fn from(value: i32) -> Self {
        StyleValue::Number(value as f64)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// CSS properties the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CssProperty {
    // Stacking and compositing
    Position,
    ZIndex,
    Opacity,
    Transform,
    Filter,
    BackdropFilter,
    Perspective,
    ClipPath,
    Isolation,
    MixBlendMode,
    Display,
    Visibility,
    Overflow,
    // Flexbox
    FlexDirection,
    FlexWrap,
    JustifyContent,
    AlignItems,
    AlignSelf,
    FlexGrow,
    Order,
    Gap,
    RowGap,
    ColumnGap,
    // Box
    Padding,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,
    Width,
    Height,
    // Paint
    Background,
    BackgroundColor,
    BackgroundImage,
    BoxShadow,
    BorderRadius,
    BorderWidth,
    BorderColor,
    BorderStyle,
    // Text
    Color,
    FontFamily,
    FontSize,
    FontWeight,
    FontStyle,
    LineHeight,
    LetterSpacing,
    TextAlign,
    TextDecoration,
    TextTransform,
}

impl CssProperty {
    /// Resolves a property name in either `kebab-case` or `camelCase`.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = to_kebab_case(name.trim());
        let prop = match normalized.as_str() {
            "position" => CssProperty::Position,
            "z-index" => CssProperty::ZIndex,
            "opacity" => CssProperty::Opacity,
            "transform" => CssProperty::Transform,
            "filter" => CssProperty::Filter,
            "backdrop-filter" | "-webkit-backdrop-filter" => CssProperty::BackdropFilter,
            "perspective" => CssProperty::Perspective,
            "clip-path" => CssProperty::ClipPath,
            "isolation" => CssProperty::Isolation,
            "mix-blend-mode" => CssProperty::MixBlendMode,
            "display" => CssProperty::Display,
            "visibility" => CssProperty::Visibility,
            "overflow" => CssProperty::Overflow,
            "flex-direction" => CssProperty::FlexDirection,
            "flex-wrap" => CssProperty::FlexWrap,
            "justify-content" => CssProperty::JustifyContent,
            "align-items" => CssProperty::AlignItems,
            "align-self" => CssProperty::AlignSelf,
            "flex-grow" => CssProperty::FlexGrow,
            "order" => CssProperty::Order,
            "gap" => CssProperty::Gap,
            "row-gap" => CssProperty::RowGap,
            "column-gap" => CssProperty::ColumnGap,
            "padding" => CssProperty::Padding,
            "padding-top" => CssProperty::PaddingTop,
            "padding-right" => CssProperty::PaddingRight,
            "padding-bottom" => CssProperty::PaddingBottom,
            "padding-left" => CssProperty::PaddingLeft,
            "width" => CssProperty::Width,
            "height" => CssProperty::Height,
            "background" => CssProperty::Background,
            "background-color" => CssProperty::BackgroundColor,
            "background-image" => CssProperty::BackgroundImage,
            "box-shadow" => CssProperty::BoxShadow,
            "border-radius" => CssProperty::BorderRadius,
            "border-width" => CssProperty::BorderWidth,
            "border-color" => CssProperty::BorderColor,
            "border-style" => CssProperty::BorderStyle,
            "color" => CssProperty::Color,
            "font-family" => CssProperty::FontFamily,
            "font-size" => CssProperty::FontSize,
            "font-weight" => CssProperty::FontWeight,
            "font-style" => CssProperty::FontStyle,
            "line-height" => CssProperty::LineHeight,
            "letter-spacing" => CssProperty::LetterSpacing,
            "text-align" => CssProperty::TextAlign,
            "text-decoration" | "text-decoration-line" => CssProperty::TextDecoration,
            "text-transform" => CssProperty::TextTransform,
            _ => return None,
        };
        Some(prop)
    }

    pub fn css_name(self) -> &'static str {
        match self {
            CssProperty::Position => "position",
            CssProperty::ZIndex => "z-index",
            CssProperty::Opacity => "opacity",
            CssProperty::Transform => "transform",
            CssProperty::Filter => "filter",
            CssProperty::BackdropFilter => "backdrop-filter",
            CssProperty::Perspective => "perspective",
            CssProperty::ClipPath => "clip-path",
            CssProperty::Isolation => "isolation",
            CssProperty::MixBlendMode => "mix-blend-mode",
            CssProperty::Display => "display",
            CssProperty::Visibility => "visibility",
            CssProperty::Overflow => "overflow",
            CssProperty::FlexDirection => "flex-direction",
            CssProperty::FlexWrap => "flex-wrap",
            CssProperty::JustifyContent => "justify-content",
            CssProperty::AlignItems => "align-items",
            CssProperty::AlignSelf => "align-self",
            CssProperty::FlexGrow => "flex-grow",
            CssProperty::Order => "order",
            CssProperty::Gap => "gap",
            CssProperty::RowGap => "row-gap",
            CssProperty::ColumnGap => "column-gap",
            CssProperty::Padding => "padding",
            CssProperty::PaddingTop => "padding-top",
            CssProperty::PaddingRight => "padding-right",
            CssProperty::PaddingBottom => "padding-bottom",
            CssProperty::PaddingLeft => "padding-left",
            CssProperty::Width => "width",
            CssProperty::Height => "height",
            CssProperty::Background => "background",
            CssProperty::BackgroundColor => "background-color",
            CssProperty::BackgroundImage => "background-image",
            CssProperty::BoxShadow => "box-shadow",
            CssProperty::BorderRadius => "border-radius",
            CssProperty::BorderWidth => "border-width",
            CssProperty::BorderColor => "border-color",
            CssProperty::BorderStyle => "border-style",
            CssProperty::Color => "color",
            CssProperty::FontFamily => "font-family",
            CssProperty::FontSize => "font-size",
            CssProperty::FontWeight => "font-weight",
            CssProperty::FontStyle => "font-style",
            CssProperty::LineHeight => "line-height",
            CssProperty::LetterSpacing => "letter-spacing",
            CssProperty::TextAlign => "text-align",
            CssProperty::TextDecoration => "text-decoration",
            CssProperty::TextTransform => "text-transform",
        }
    }
}

fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    // CSSOM spells vendor prefixes as `WebkitFoo`.
    if let Some(rest) = out.strip_prefix("-webkit-") {
        if matches!(rest, "transform" | "filter" | "clip-path" | "perspective") {
            return rest.to_string();
        }
    }
    out
}

/// Computed styles of one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<StyleValue>>",
    into = "BTreeMap<String, Option<StyleValue>>"
)]
pub struct Styles {
    known: BTreeMap<CssProperty, StyleValue>,
    opaque: BTreeMap<String, StyleValue>,
}

impl Styles {
    pub fn insert(&mut self, name: &str, value: StyleValue) {
        match CssProperty::from_name(name) {
            Some(prop) => {
                self.known.insert(prop, value);
            }
            None => {
                self.opaque.insert(name.trim().to_string(), value);
            }
        }
    }

    pub fn get(&self, prop: CssProperty) -> Option<&StyleValue> {
        self.known.get(&prop)
    }

    /// Trimmed string value; empty strings read as absent.
    pub fn str(&self, prop: CssProperty) -> Option<Cow<'_, str>> {
        let value = self.known.get(&prop)?;
        match value.as_str() {
            Cow::Borrowed(s) => {
                let t = s.trim();
                (!t.is_empty()).then_some(Cow::Borrowed(t))
            }
            Cow::Owned(s) => Some(Cow::Owned(s)),
        }
    }

    /// Lowercased keyword value.
    pub fn keyword(&self, prop: CssProperty) -> Option<String> {
        self.str(prop).map(|s| s.to_ascii_lowercase())
    }

    pub fn number(&self, prop: CssProperty) -> Option<f64> {
        self.known.get(&prop).and_then(StyleValue::as_number)
    }

    pub fn opaque(&self, name: &str) -> Option<&StyleValue> {
        self.opaque.get(name)
    }

    pub fn known(&self) -> impl Iterator<Item = (CssProperty, &StyleValue)> {
        self.known.iter().map(|(k, v)| (*k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.opaque.is_empty()
    }
}

impl From<BTreeMap<String, Option<StyleValue>>> for Styles {
    fn from(raw: BTreeMap<String, Option<StyleValue>>) -> Self {
        let mut styles = Styles::default();
        for (name, value) in raw {
            if let Some(value) = value {
                styles.insert(&name, value);
            }
        }
        styles
    }
}

impl From<Styles> for BTreeMap<String, Option<StyleValue>> {
    fn from(styles: Styles) -> Self {
        let mut out = BTreeMap::new();
        for (prop, value) in styles.known {
            out.insert(prop.css_name().to_string(), Some(value));
        }
        for (name, value) in styles.opaque {
            out.insert(name, Some(value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_and_kebab_resolve_to_same_property() {
        assert_eq!(CssProperty::from_name("zIndex"), Some(CssProperty::ZIndex));
        assert_eq!(CssProperty::from_name("z-index"), Some(CssProperty::ZIndex));
        assert_eq!(
            CssProperty::from_name("WebkitBackdropFilter"),
            Some(CssProperty::BackdropFilter)
        );
        assert_eq!(CssProperty::from_name("cursor"), None);
    }

    #[test]
    fn unknown_properties_stay_opaque() {
        let styles: Styles =
            serde_json::from_str(r#"{"cursor":"pointer","opacity":"0.5","zIndex":2,"x":null}"#)
                .unwrap();
        assert_eq!(styles.opaque("cursor"), Some(&StyleValue::Text("pointer".into())));
        assert_eq!(styles.number(CssProperty::Opacity), Some(0.5));
        assert_eq!(styles.number(CssProperty::ZIndex), Some(2.0));
        assert!(styles.opaque("x").is_none());
    }

    #[test]
    fn numbers_accept_px_suffix() {
        assert_eq!(StyleValue::from("12px").as_number(), Some(12.0));
        assert_eq!(StyleValue::from(" 4 ").as_number(), Some(4.0));
        assert_eq!(StyleValue::from("auto").as_number(), None);
        assert_eq!(StyleValue::from(3).as_str(), "3");
    }

    #[test]
    fn blank_strings_read_as_absent() {
        let mut styles = Styles::default();
        styles.insert("color", StyleValue::from("   "));
        assert!(styles.str(CssProperty::Color).is_none());
    }
}

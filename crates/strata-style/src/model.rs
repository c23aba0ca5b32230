//! Target primitive model: what the design tool accepts for fills, effects,
//! auto-layout and text.

use serde::{Deserialize, Serialize};

use crate::color::Rgba;

/// 2x3 affine transform in the design tool's gradient convention.
pub type Transform2x3 = [[f64; 3]; 2];

pub const IDENTITY_TRANSFORM: Transform2x3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f64,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleMode {
    #[default]
    Fill,
    Fit,
    Crop,
    Tile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Paint {
    Solid {
        color: Rgba,
        opacity: f64,
    },
    GradientLinear {
        transform: Transform2x3,
        stops: Vec<ColorStop>,
    },
    Image {
        hash: String,
        scale_mode: ScaleMode,
    },
}

impl Paint {
    /// Solid paint with the color's alpha moved into the paint opacity.
    pub fn solid(color: Rgba) -> Self {
        Paint::Solid {
            opacity: color.a,
            color: color.with_alpha(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    PassThrough,
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Maps a `mix-blend-mode` keyword. Unknown keywords read as `Normal`.
    pub fn from_css(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "multiply" => BlendMode::Multiply,
            "screen" => BlendMode::Screen,
            "overlay" => BlendMode::Overlay,
            "darken" => BlendMode::Darken,
            "lighten" => BlendMode::Lighten,
            "color-dodge" => BlendMode::ColorDodge,
            "color-burn" => BlendMode::ColorBurn,
            "hard-light" => BlendMode::HardLight,
            "soft-light" => BlendMode::SoftLight,
            "difference" => BlendMode::Difference,
            "exclusion" => BlendMode::Exclusion,
            "hue" => BlendMode::Hue,
            "saturation" => BlendMode::Saturation,
            "color" => BlendMode::Color,
            "luminosity" => BlendMode::Luminosity,
            _ => BlendMode::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    DropShadow {
        color: Rgba,
        offset: Vector,
        radius: f64,
        spread: f64,
        blend_mode: BlendMode,
    },
    InnerShadow {
        color: Rgba,
        offset: Vector,
        radius: f64,
        spread: f64,
        blend_mode: BlendMode,
    },
    LayerBlur {
        radius: f64,
    },
    BackgroundBlur {
        radius: f64,
    },
}

impl Effect {
    pub fn is_inner(&self) -> bool {
        matches!(self, Effect::InnerShadow { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AxisAlign {
    #[default]
    Min,
    Center,
    Max,
    SpaceBetween,
    Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingMode {
    Fixed,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub fn from_edges(edges: [f64; 4]) -> Self {
        Self {
            top: edges[0],
            right: edges[1],
            bottom: edges[2],
            left: edges[3],
        }
    }
}

/// Container auto-layout derived from flexbox.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AutoLayout {
    pub mode: LayoutMode,
    pub primary_align: AxisAlign,
    pub counter_align: AxisAlign,
    pub item_spacing: f64,
    pub counter_spacing: f64,
    pub padding: Padding,
    pub primary_sizing: SizingMode,
    pub counter_sizing: SizingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChildAlign {
    Min,
    Center,
    Max,
    Stretch,
}

/// Per-item flex properties, applied only inside an auto-layout parent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChildLayout {
    pub grow: f64,
    pub align_self: Option<ChildAlign>,
    pub order: Option<i32>,
}

impl ChildLayout {
    pub fn is_default(&self) -> bool {
        self.grow == 0.0 && self.align_self.is_none() && self.order.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineHeight {
    #[default]
    Auto,
    Pixels(f64),
    Percent(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    Strikethrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextCase {
    #[default]
    Original,
    Upper,
    Lower,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size: f64,
    pub line_height: LineHeight,
    pub letter_spacing: f64,
    pub align: TextAlign,
    pub decoration: TextDecoration,
    pub case: TextCase,
    pub color: Rgba,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            line_height: LineHeight::Auto,
            letter_spacing: 0.0,
            align: TextAlign::Left,
            decoration: TextDecoration::None,
            case: TextCase::Original,
            color: Rgba::BLACK,
        }
    }
}

//! Visual properties of a single node, gathered from its computed style.

use serde::Serialize;
use strata_ir::{CssProperty, Styles};
use tracing::debug;

use crate::color::parse_color;
use crate::filter::{map_backdrop_filter, map_filter};
use crate::gradient::parse_linear_gradient;
use crate::model::{BlendMode, Effect, Paint};
use crate::shadow::parse_box_shadow;
use crate::transform::rotation_degrees;
use crate::values::{parse_length, split_top_level_whitespace};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStyle {
    pub fills: Vec<Paint>,
    pub strokes: Vec<Paint>,
    pub stroke_weight: f64,
    pub corner_radius: f64,
    pub effects: Vec<Effect>,
    pub opacity: f64,
    pub blend_mode: BlendMode,
    /// CSS degrees, clockwise.
    pub rotation: Option<f64>,
    pub clips_content: bool,
    pub visible: bool,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            fills: Vec::new(),
            strokes: Vec::new(),
            stroke_weight: 0.0,
            corner_radius: 0.0,
            effects: Vec::new(),
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            rotation: None,
            clips_content: false,
            visible: true,
        }
    }
}

pub fn map_node_style(styles: &Styles) -> NodeStyle {
    let mut style = NodeStyle::default();

    if let Some(color) = styles
        .str(CssProperty::BackgroundColor)
        .and_then(|v| parse_color(&v))
        .filter(|c| !c.is_transparent())
    {
        style.fills.push(Paint::solid(color));
    }
    let gradient = styles
        .str(CssProperty::BackgroundImage)
        .and_then(|v| parse_linear_gradient(&v))
        .or_else(|| {
            styles
                .str(CssProperty::Background)
                .and_then(|v| parse_linear_gradient(&v))
        });
    if let Some(gradient) = gradient {
        style.fills.push(gradient);
    }

    map_border(styles, &mut style);

    if let Some(radius) = styles.str(CssProperty::BorderRadius).and_then(|v| {
        split_top_level_whitespace(&v)
            .first()
            .and_then(|first| parse_length(first))
    }) {
        style.corner_radius = radius.max(0.0);
    }

    if let Some(shadow) = styles.str(CssProperty::BoxShadow) {
        style.effects.extend(parse_box_shadow(&shadow));
    }
    if let Some(blur) = styles.str(CssProperty::Filter).and_then(|v| map_filter(&v)) {
        style.effects.push(blur);
    }
    if let Some(blur) = styles
        .str(CssProperty::BackdropFilter)
        .and_then(|v| map_backdrop_filter(&v))
    {
        style.effects.push(blur);
    }

    if let Some(opacity) = styles.number(CssProperty::Opacity) {
        style.opacity = opacity.clamp(0.0, 1.0);
    }
    if let Some(mode) = styles.keyword(CssProperty::MixBlendMode) {
        style.blend_mode = BlendMode::from_css(&mode);
    }
    style.rotation = styles
        .str(CssProperty::Transform)
        .and_then(|v| rotation_degrees(&v))
        .filter(|deg| deg.abs() > 1e-6);

    style.clips_content = matches!(
        styles.keyword(CssProperty::Overflow).as_deref(),
        Some("hidden") | Some("clip")
    );
    let hidden = styles.keyword(CssProperty::Visibility).as_deref() == Some("hidden")
        || styles.keyword(CssProperty::Display).as_deref() == Some("none");
    style.visible = !hidden;

    style
}

/// Uniform borders only: the first width and color apply to every side.
fn map_border(styles: &Styles, style: &mut NodeStyle) {
    let border_style = styles.keyword(CssProperty::BorderStyle);
    if matches!(border_style.as_deref(), Some("none") | Some("hidden")) {
        return;
    }
    let Some(width) = styles.str(CssProperty::BorderWidth).and_then(|v| {
        split_top_level_whitespace(&v)
            .first()
            .and_then(|first| parse_length(first))
    }) else {
        return;
    };
    if width <= 0.0 {
        return;
    }
    let color = styles
        .str(CssProperty::BorderColor)
        .and_then(|v| split_top_level_whitespace(&v).first().and_then(|c| parse_color(c)))
        .or_else(|| styles.str(CssProperty::Color).and_then(|v| parse_color(&v)));
    match color {
        Some(color) if !color.is_transparent() => {
            style.strokes.push(Paint::solid(color));
            style.stroke_weight = width;
        }
        _ => debug!("border without a visible color skipped"),
    }
}

use tracing::debug;

use crate::color::{Rgba, parse_color};
use crate::model::{BlendMode, Effect, Vector};
use crate::values::{parse_length, split_top_level_commas, split_top_level_whitespace};

/// Used when a layer omits its color (CSS would use `currentcolor`).
const DEFAULT_SHADOW_COLOR: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.25);

/// Maps a multi-layer `box-shadow` value to shadow effects.
///
/// Layers are split on commas outside parentheses. Each layer takes an
/// optional `inset` keyword, two to four lengths (offset-x, offset-y,
/// blur, spread) and a color either before or after the lengths, which
/// covers both authored values and the browser's computed serialization
/// (`rgba(0, 0, 0, 0.5) 0px 1px 2px 0px`). Unparseable layers are dropped.
pub fn parse_box_shadow(input: &str) -> Vec<Effect> {
    let value = input.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    split_top_level_commas(value)
        .into_iter()
        .filter_map(|layer| {
            let effect = parse_shadow_layer(layer);
            if effect.is_none() {
                debug!(layer = %layer, "box-shadow layer dropped");
            }
            effect
        })
        .collect()
}

fn parse_shadow_layer(layer: &str) -> Option<Effect> {
    let mut inset = false;
    let mut lengths: Vec<f64> = Vec::with_capacity(4);
    let mut color_tokens: Vec<&str> = Vec::new();
    let mut lengths_closed = false;

    for token in split_top_level_whitespace(layer) {
        if token.eq_ignore_ascii_case("inset") {
            inset = true;
        } else if let Some(length) = parse_length(token) {
            if lengths_closed {
                // lengths must be contiguous
                return None;
            }
            lengths.push(length);
        } else {
            lengths_closed = !lengths.is_empty();
            color_tokens.push(token);
        }
    }

    if lengths.len() < 2 || lengths.len() > 4 || color_tokens.len() > 1 {
        return None;
    }
    let color = match color_tokens.first() {
        Some(raw) => parse_color(raw)?,
        None => DEFAULT_SHADOW_COLOR,
    };

    let offset = Vector {
        x: lengths[0],
        y: lengths[1],
    };
    let radius = lengths.get(2).copied().unwrap_or(0.0).max(0.0);
    let spread = lengths.get(3).copied().unwrap_or(0.0);

    let effect = if inset {
        Effect::InnerShadow {
            color,
            offset,
            radius,
            spread,
            blend_mode: BlendMode::Normal,
        }
    } else {
        Effect::DropShadow {
            color,
            offset,
            radius,
            spread,
            blend_mode: BlendMode::Normal,
        }
    };
    Some(effect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_layers_second_inset() {
        let effects = parse_box_shadow("0 1px 2px rgba(0,0,0,0.5), inset 0 0 4px #000");
        assert_eq!(effects.len(), 2);
        assert!(!effects[0].is_inner());
        assert!(effects[1].is_inner());
        match &effects[0] {
            Effect::DropShadow {
                offset,
                radius,
                color,
                ..
            } => {
                assert_eq!(*offset, Vector { x: 0.0, y: 1.0 });
                assert_eq!(*radius, 2.0);
                assert!((color.a - 0.5).abs() < 1e-9);
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn computed_style_order_with_leading_color() {
        let effects = parse_box_shadow("rgba(0, 0, 0, 0.2) 0px 4px 6px -1px");
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::DropShadow { spread, radius, .. } => {
                assert_eq!(*spread, -1.0);
                assert_eq!(*radius, 6.0);
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn malformed_layers_are_dropped_not_fatal() {
        let effects = parse_box_shadow("garbage, 2px 2px red, 1px");
        assert_eq!(effects.len(), 1);
        assert!(parse_box_shadow("none").is_empty());
    }

    #[test]
    fn missing_color_uses_default() {
        let effects = parse_box_shadow("3px 3px");
        match &effects[0] {
            Effect::DropShadow { color, radius, .. } => {
                assert_eq!(*color, DEFAULT_SHADOW_COLOR);
                assert_eq!(*radius, 0.0);
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }
}

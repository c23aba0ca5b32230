use tracing::debug;

use crate::model::Effect;
use crate::values::{function_args, parse_length, split_top_level_whitespace};

/// Maps `filter`. Only `blur(<px>)` becomes a layer blur; every other
/// filter function is ignored.
pub fn map_filter(input: &str) -> Option<Effect> {
    blur_radius(input, "filter").map(|radius| Effect::LayerBlur { radius })
}

/// Maps `backdrop-filter: blur(<px>)` to a background blur.
pub fn map_backdrop_filter(input: &str) -> Option<Effect> {
    blur_radius(input, "backdrop-filter").map(|radius| Effect::BackgroundBlur { radius })
}

fn blur_radius(input: &str, property: &str) -> Option<f64> {
    let value = input.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return None;
    }
    let mut radius = None;
    for function in split_top_level_whitespace(value) {
        match function_args(function, "blur") {
            Some(args) => radius = parse_length(args).filter(|r| *r > 0.0),
            None => debug!(property, function = %function, "filter function ignored"),
        }
    }
    radius
}

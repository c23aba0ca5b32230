use tracing::debug;

use crate::color::parse_color;
use crate::model::{ColorStop, Paint, Transform2x3};
use crate::values::{
    function_args, parse_angle, parse_percentage, split_top_level_commas,
    split_top_level_whitespace,
};

const DEFAULT_ANGLE: f64 = 180.0;

/// Maps `linear-gradient(...)` to a gradient paint.
///
/// The first argument is read as a direction when it is an angle or a
/// `to <side>` keyword (default 180deg, top to bottom). Stops without a
/// position are spread evenly between their positioned neighbours, so a
/// gradient with no positions at all spans `[0, 1]` uniformly. Fewer than
/// two resolvable stops fail the mapping. Any other gradient function is
/// not recognized.
///
/// `background` values with several layers are accepted; the first linear
/// gradient layer is used. Within a layer the call may sit among other
/// shorthand tokens (color, repeat, position, box).
pub fn parse_linear_gradient(input: &str) -> Option<Paint> {
    let args = split_top_level_commas(input)
        .into_iter()
        .flat_map(split_top_level_whitespace)
        .find_map(|token| function_args(token, "linear-gradient"))?;

    let mut segments = split_top_level_commas(args);
    if segments.is_empty() {
        return None;
    }
    let angle = match direction_angle(segments[0]) {
        Some(angle) => {
            segments.remove(0);
            angle
        }
        None => DEFAULT_ANGLE,
    };

    let mut raw_stops: Vec<(crate::color::Rgba, Option<f64>)> = Vec::new();
    for segment in segments {
        match parse_stop(segment) {
            Some(stop) => raw_stops.push(stop),
            None => debug!(stop = %segment, "gradient stop skipped"),
        }
    }
    if raw_stops.len() < 2 {
        return None;
    }

    Some(Paint::GradientLinear {
        transform: angle_to_transform(angle),
        stops: distribute_stops(raw_stops),
    })
}

fn direction_angle(segment: &str) -> Option<f64> {
    if let Some(angle) = parse_angle(segment) {
        return Some(angle);
    }
    let lower = segment.trim().to_ascii_lowercase();
    let keywords = lower.strip_prefix("to ")?;
    let mut words: Vec<&str> = keywords.split_whitespace().collect();
    words.sort_unstable();
    let angle = match words.as_slice() {
        ["top"] => 0.0,
        ["right"] => 90.0,
        ["bottom"] => 180.0,
        ["left"] => 270.0,
        ["right", "top"] => 45.0,
        ["bottom", "right"] => 135.0,
        ["bottom", "left"] => 225.0,
        ["left", "top"] => 315.0,
        _ => return None,
    };
    Some(angle)
}

fn parse_stop(segment: &str) -> Option<(crate::color::Rgba, Option<f64>)> {
    let tokens = split_top_level_whitespace(segment);
    let (color_token, position) = match tokens.as_slice() {
        [color] => (*color, None),
        [color, position, ..] => (*color, parse_percentage(position)),
        [] => return None,
    };
    let color = parse_color(color_token)?;
    Some((color, position))
}

/// Fills missing positions: first defaults to 0, last to 1, gaps are
/// interpolated linearly between positioned neighbours. Positions are
/// clamped so they never decrease.
fn distribute_stops(raw: Vec<(crate::color::Rgba, Option<f64>)>) -> Vec<ColorStop> {
    let n = raw.len();
    let mut positions: Vec<Option<f64>> = raw.iter().map(|(_, p)| *p).collect();
    if positions[0].is_none() {
        positions[0] = Some(0.0);
    }
    if positions[n - 1].is_none() {
        positions[n - 1] = Some(1.0);
    }

    let mut i = 0;
    while i < n {
        if positions[i].is_some() {
            i += 1;
            continue;
        }
        let start = i - 1;
        let mut end = i;
        while positions[end].is_none() {
            end += 1;
        }
        let from = positions[start].unwrap_or(0.0);
        let to = positions[end].unwrap_or(1.0);
        let span = (end - start) as f64;
        for k in i..end {
            positions[k] = Some(from + (to - from) * (k - start) as f64 / span);
        }
        i = end;
    }

    let mut last = 0.0f64;
    raw.into_iter()
        .zip(positions)
        .map(|((color, _), position)| {
            let p = position.unwrap_or(last).clamp(0.0, 1.0).max(last);
            last = p;
            ColorStop { position: p, color }
        })
        .collect()
}

/// Converts a CSS gradient angle (0deg points up, clockwise) into the
/// design tool's gradient transform, rotating about the box center.
/// 90deg (left to right) is the identity.
pub fn angle_to_transform(angle_deg: f64) -> Transform2x3 {
    let rad = (angle_deg - 90.0).to_radians();
    let (sin, cos) = rad.sin_cos();
    [
        [cos, sin, 0.5 - 0.5 * cos - 0.5 * sin],
        [-sin, cos, 0.5 + 0.5 * sin - 0.5 * cos],
    ]
}

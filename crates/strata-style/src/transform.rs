use tracing::debug;

use crate::values::{function_args, parse_angle};

/// Below this `a² + b²` a matrix has no meaningful rotation.
const DEGENERATE_EPSILON: f64 = 1e-12;

/// Recovers a pure rotation (CSS degrees, clockwise) from a `transform`.
///
/// `matrix(a, b, c, d, e, f)` and `matrix3d(...)` are reduced to
/// `atan2(b, a)`; scale, skew and translation are not reproduced. A
/// degenerate matrix (`a² + b² ≈ 0`) is rejected. When no matrix is present
/// a `rotate(<angle>)` function is used directly.
pub fn rotation_degrees(input: &str) -> Option<f64> {
    let value = input.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return None;
    }
    let lower = value.to_ascii_lowercase();

    if let Some(args) = function_args(&lower, "matrix") {
        let m = parse_numbers(args)?;
        if m.len() != 6 {
            return None;
        }
        return rotation_from_ab(m[0], m[1]);
    }
    if let Some(args) = function_args(&lower, "matrix3d") {
        let m = parse_numbers(args)?;
        if m.len() != 16 {
            return None;
        }
        return rotation_from_ab(m[0], m[1]);
    }

    // rotate(...) may be one of several functions in an authored value.
    let start = lower.find("rotate(")?;
    let end = lower[start..].find(')')? + start;
    let angle = parse_angle(&lower[start + "rotate(".len()..end]);
    if angle.is_none() {
        debug!(transform = %value, "rotate() angle not understood");
    }
    angle
}

fn rotation_from_ab(a: f64, b: f64) -> Option<f64> {
    if a * a + b * b < DEGENERATE_EPSILON {
        debug!(a, b, "degenerate transform matrix rejected");
        return None;
    }
    Some(b.atan2(a).to_degrees())
}

fn parse_numbers(args: &str) -> Option<Vec<f64>> {
    args.split(',')
        .map(|part| part.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

//! Low-level CSS value tokenizing shared by the mapping modules.

/// Parses a `px` length or a bare number. Other units are rejected.
pub fn parse_length(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(stripped) = trimmed.strip_suffix("px") {
        return stripped.trim().parse().ok().filter(|v: &f64| v.is_finite());
    }
    trimmed.parse().ok().filter(|v: &f64| v.is_finite())
}

/// Parses a percentage (`"50%"`) into a fraction (`0.5`).
pub fn parse_percentage(value: &str) -> Option<f64> {
    let stripped = value.trim().strip_suffix('%')?;
    stripped
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v / 100.0)
}

/// Splits on commas that are not nested inside parentheses, so
/// `rgba(0, 0, 0, 0.5), red` yields two items.
pub fn split_top_level_commas(input: &str) -> Vec<&str> {
    split_top_level(input, |ch| ch == ',')
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect()
}

/// Splits on whitespace outside parentheses.
pub fn split_top_level_whitespace(input: &str) -> Vec<&str> {
    split_top_level(input, char::is_whitespace)
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect()
}

fn split_top_level(input: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = (depth - 1).max(0),
            c if depth == 0 && is_separator(c) => {
                parts.push(input[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(input[start..].trim());
    parts
}

/// Returns the argument list of `name(...)` when `input` is exactly that
/// function call (case-insensitive name).
pub fn function_args<'a>(input: &'a str, name: &str) -> Option<&'a str> {
    let s = input.trim();
    let open = s.find('(')?;
    if !s[..open].trim().eq_ignore_ascii_case(name) {
        return None;
    }
    let mut depth = 0i32;
    for (i, ch) in s.char_indices().skip_while(|(i, _)| *i < open) {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    // the call must span the whole input
                    return (i == s.len() - 1).then(|| s[open + 1..i].trim());
                }
            }
            _ => {}
        }
    }
    None
}

/// Expands a 1-4 value box shorthand to `[top, right, bottom, left]`,
/// copying each missing side from its CSS shorthand partner.
pub fn parse_edge_values(input: &str) -> Option<[f64; 4]> {
    let tokens = split_top_level_whitespace(input);
    let mut parts = Vec::with_capacity(4);
    for token in tokens {
        parts.push(parse_length(token)?);
    }
    match parts.as_slice() {
        [] => None,
        [single] => Some([*single, *single, *single, *single]),
        [vertical, horizontal] => Some([*vertical, *horizontal, *vertical, *horizontal]),
        [top, horizontal, bottom] => Some([*top, *horizontal, *bottom, *horizontal]),
        [top, right, bottom, left, ..] => Some([*top, *right, *bottom, *left]),
    }
}

/// Parses an angle in `deg`, `rad`, `grad` or `turn` into degrees.
pub fn parse_angle(value: &str) -> Option<f64> {
    let v = value.trim().to_ascii_lowercase();
    let (number, factor) = if let Some(n) = v.strip_suffix("deg") {
        (n, 1.0)
    } else if let Some(n) = v.strip_suffix("grad") {
        (n, 0.9)
    } else if let Some(n) = v.strip_suffix("rad") {
        (n, 180.0 / std::f64::consts::PI)
    } else if let Some(n) = v.strip_suffix("turn") {
        (n, 360.0)
    } else {
        return None;
    };
    number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n * factor)
}

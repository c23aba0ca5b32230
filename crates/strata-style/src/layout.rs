//! Flexbox to auto-layout mapping.

use strata_ir::{CssProperty, Styles};
use tracing::{debug, warn};

use crate::model::{AutoLayout, AxisAlign, ChildAlign, ChildLayout, LayoutMode, Padding, SizingMode};
use crate::values::{parse_edge_values, parse_length, split_top_level_whitespace};

/// Maps a flex container to auto-layout. Returns `None` unless `display`
/// is `flex` or `inline-flex`.
pub fn map_auto_layout(styles: &Styles) -> Option<AutoLayout> {
    let display = styles.keyword(CssProperty::Display)?;
    if display != "flex" && display != "inline-flex" {
        return None;
    }

    let mode = match styles.keyword(CssProperty::FlexDirection).as_deref() {
        None | Some("row") => LayoutMode::Horizontal,
        Some("row-reverse") => {
            debug!("row-reverse mapped as row; item order is not reversed");
            LayoutMode::Horizontal
        }
        Some("column") => LayoutMode::Vertical,
        Some("column-reverse") => {
            debug!("column-reverse mapped as column; item order is not reversed");
            LayoutMode::Vertical
        }
        Some(other) => {
            debug!(flex_direction = %other, "unknown flex-direction, using row");
            LayoutMode::Horizontal
        }
    };

    if let Some(wrap) = styles.keyword(CssProperty::FlexWrap) {
        if wrap != "nowrap" {
            warn!(flex_wrap = %wrap, "flex-wrap is not supported, ignored");
        }
    }

    let primary_align = styles
        .keyword(CssProperty::JustifyContent)
        .map(|v| map_justify_content(&v))
        .unwrap_or(AxisAlign::Min);
    let counter_align = styles
        .keyword(CssProperty::AlignItems)
        .map(|v| map_align_items(&v))
        .unwrap_or(AxisAlign::Min);

    let (row_gap, column_gap) = gaps(styles);
    let (item_spacing, counter_spacing) = match mode {
        LayoutMode::Vertical => (row_gap, column_gap),
        _ => (column_gap, row_gap),
    };

    let width_fixed = is_fixed_dimension(styles, CssProperty::Width);
    let height_fixed = is_fixed_dimension(styles, CssProperty::Height);
    let (primary_fixed, counter_fixed) = match mode {
        LayoutMode::Vertical => (height_fixed, width_fixed),
        _ => (width_fixed, height_fixed),
    };

    Some(AutoLayout {
        mode,
        primary_align,
        counter_align,
        item_spacing,
        counter_spacing,
        padding: parse_padding(styles),
        primary_sizing: sizing(primary_fixed),
        counter_sizing: sizing(counter_fixed),
    })
}

fn sizing(fixed: bool) -> SizingMode {
    if fixed {
        SizingMode::Fixed
    } else {
        SizingMode::Auto
    }
}

fn map_justify_content(value: &str) -> AxisAlign {
    match value {
        "flex-start" | "start" | "left" | "normal" => AxisAlign::Min,
        "center" => AxisAlign::Center,
        "flex-end" | "end" | "right" => AxisAlign::Max,
        "space-between" => AxisAlign::SpaceBetween,
        "space-around" | "space-evenly" => {
            warn!(justify_content = %value, "approximated as center");
            AxisAlign::Center
        }
        other => {
            debug!(justify_content = %other, "unknown justify-content, using start");
            AxisAlign::Min
        }
    }
}

fn map_align_items(value: &str) -> AxisAlign {
    if value.contains("baseline") {
        return AxisAlign::Baseline;
    }
    match value {
        "flex-start" | "start" | "self-start" => AxisAlign::Min,
        "center" => AxisAlign::Center,
        "flex-end" | "end" | "self-end" => AxisAlign::Max,
        "stretch" | "normal" => {
            warn!(align_items = %value, "stretch approximated as start");
            AxisAlign::Min
        }
        other => {
            debug!(align_items = %other, "unknown align-items, using start");
            AxisAlign::Min
        }
    }
}

/// `(row_gap, column_gap)`. Longhands override the `gap` shorthand.
fn gaps(styles: &Styles) -> (f64, f64) {
    let (mut row, mut column) = (0.0, 0.0);
    if let Some(gap) = styles.str(CssProperty::Gap) {
        let values: Vec<f64> = split_top_level_whitespace(&gap)
            .into_iter()
            .filter_map(parse_length)
            .collect();
        match values.as_slice() {
            [both] => (row, column) = (*both, *both),
            [r, c, ..] => (row, column) = (*r, *c),
            [] => {}
        }
    }
    if let Some(r) = styles.str(CssProperty::RowGap).and_then(|v| parse_length(&v)) {
        row = r;
    }
    if let Some(c) = styles.str(CssProperty::ColumnGap).and_then(|v| parse_length(&v)) {
        column = c;
    }
    (row.max(0.0), column.max(0.0))
}

fn is_fixed_dimension(styles: &Styles, prop: CssProperty) -> bool {
    match styles.str(prop) {
        Some(value) => {
            let v = value.trim();
            !v.ends_with('%') && !v.eq_ignore_ascii_case("auto") && parse_length(v).is_some()
        }
        None => false,
    }
}

/// Expands the `padding` shorthand, then applies any longhand overrides.
pub fn parse_padding(styles: &Styles) -> Padding {
    let mut padding = styles
        .str(CssProperty::Padding)
        .and_then(|v| parse_edge_values(&v))
        .map(Padding::from_edges)
        .unwrap_or_default();
    let longhands = [
        (CssProperty::PaddingTop, &mut padding.top),
        (CssProperty::PaddingRight, &mut padding.right),
        (CssProperty::PaddingBottom, &mut padding.bottom),
        (CssProperty::PaddingLeft, &mut padding.left),
    ];
    for (prop, slot) in longhands {
        if let Some(v) = styles.str(prop).and_then(|v| parse_length(&v)) {
            *slot = v;
        }
    }
    padding
}

/// Per-item flex properties. Only meaningful when the parent has auto-layout.
pub fn map_child_layout(styles: &Styles) -> ChildLayout {
    let grow = styles
        .number(CssProperty::FlexGrow)
        .filter(|g| *g >= 0.0)
        .unwrap_or(0.0);
    let align_self = styles
        .keyword(CssProperty::AlignSelf)
        .and_then(|v| match v.as_str() {
            "flex-start" | "start" | "self-start" => Some(ChildAlign::Min),
            "center" => Some(ChildAlign::Center),
            "flex-end" | "end" | "self-end" => Some(ChildAlign::Max),
            "stretch" => Some(ChildAlign::Stretch),
            _ => None,
        });
    let order = styles
        .number(CssProperty::Order)
        .filter(|o| o.fract() == 0.0 && *o != 0.0)
        .map(|o| o as i32);
    ChildLayout {
        grow,
        align_self,
        order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::StyleValue;

    fn styles(pairs: &[(&str, &str)]) -> Styles {
        let mut styles = Styles::default();
        for (name, value) in pairs {
            styles.insert(name, StyleValue::from(*value));
        }
        styles
    }

    #[test]
    fn non_flex_containers_have_no_auto_layout() {
        assert!(map_auto_layout(&styles(&[("display", "block")])).is_none());
        assert!(map_auto_layout(&Styles::default()).is_none());
    }

    #[test]
    fn column_flex_with_gap_and_alignment() {
        let layout = map_auto_layout(&styles(&[
            ("display", "flex"),
            ("flexDirection", "column"),
            ("justifyContent", "space-between"),
            ("alignItems", "center"),
            ("gap", "8px 12px"),
            ("height", "200px"),
            ("width", "50%"),
        ]))
        .unwrap();
        assert_eq!(layout.mode, LayoutMode::Vertical);
        assert_eq!(layout.primary_align, AxisAlign::SpaceBetween);
        assert_eq!(layout.counter_align, AxisAlign::Center);
        assert_eq!(layout.item_spacing, 8.0);
        assert_eq!(layout.counter_spacing, 12.0);
        assert_eq!(layout.primary_sizing, SizingMode::Fixed);
        assert_eq!(layout.counter_sizing, SizingMode::Auto);
    }

    #[test]
    fn lossy_alignments_are_approximated() {
        let layout = map_auto_layout(&styles(&[
            ("display", "inline-flex"),
            ("justify-content", "space-evenly"),
            ("align-items", "stretch"),
            ("flex-wrap", "wrap"),
        ]))
        .unwrap();
        assert_eq!(layout.mode, LayoutMode::Horizontal);
        assert_eq!(layout.primary_align, AxisAlign::Center);
        assert_eq!(layout.counter_align, AxisAlign::Min);

        let baseline =
            map_auto_layout(&styles(&[("display", "flex"), ("align-items", "first baseline")]))
                .unwrap();
        assert_eq!(baseline.counter_align, AxisAlign::Baseline);
    }

    #[test]
    fn padding_shorthand_expansion() {
        let p = parse_padding(&styles(&[("padding", "10px 20px")]));
        assert_eq!((p.top, p.right, p.bottom, p.left), (10.0, 20.0, 10.0, 20.0));
        let p = parse_padding(&styles(&[("padding", "5px")]));
        assert_eq!((p.top, p.right, p.bottom, p.left), (5.0, 5.0, 5.0, 5.0));
        let p = parse_padding(&styles(&[("padding", "5px"), ("paddingLeft", "0px")]));
        assert_eq!(p.left, 0.0);
        assert_eq!(p.top, 5.0);
    }

    #[test]
    fn child_properties() {
        let child = map_child_layout(&styles(&[
            ("flex-grow", "1"),
            ("align-self", "stretch"),
            ("order", "2"),
        ]));
        assert_eq!(child.grow, 1.0);
        assert_eq!(child.align_self, Some(ChildAlign::Stretch));
        assert_eq!(child.order, Some(2));
        assert!(map_child_layout(&styles(&[("align-self", "auto")])).is_default());
    }
}

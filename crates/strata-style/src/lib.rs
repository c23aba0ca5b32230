//! Translation of CSS computed-style strings into the design tool's
//! paint, effect, layout and text model.
//!
//! Every function here is pure: malformed input yields `None` or an empty
//! list and the caller keeps neutral defaults. Lossy approximations are
//! logged through `tracing`.

#![allow(clippy::all)]

pub mod color;
pub mod filter;
pub mod gradient;
pub mod layout;
pub mod model;
pub mod node_style;
pub mod shadow;
pub mod text;
pub mod transform;
pub mod values;

pub use color::{Rgba, parse_color};
pub use filter::{map_backdrop_filter, map_filter};
pub use gradient::parse_linear_gradient;
pub use layout::{map_auto_layout, map_child_layout, parse_padding};
pub use model::{
    AutoLayout, AxisAlign, BlendMode, ChildAlign, ChildLayout, ColorStop, Effect, LayoutMode,
    LineHeight, Padding, Paint, ScaleMode, SizingMode, TextAlign, TextCase, TextDecoration,
    TextStyle, Vector,
};
pub use node_style::{NodeStyle, map_node_style};
pub use shadow::parse_box_shadow;
pub use text::map_text_style;
pub use transform::rotation_degrees;

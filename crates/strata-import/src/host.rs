//! Capabilities the importer consumes from the design-tool host.
//!
//! The host owns the target document. The importer never holds target nodes
//! directly, only the [`TargetId`] handles the host gives back. Calls that
//! may suspend in a real host (node creation, font loading, image decode and
//! fetch) are async; cheap bookkeeping calls are plain methods.

use std::fmt;

use strata_ir::{ImportEvent, Rect};
use strata_style::{AutoLayout, ChildLayout, NodeStyle, Paint, Rgba, TextStyle};

use crate::error::HostError;

/// Handle of a node in the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Family + style pair as the host names fonts (`"Inter"`, `"Semi Bold Italic"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl fmt::Display for FontName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Frame,
    Rectangle,
    Text,
    Vector,
}

impl TargetKind {
    pub fn accepts_children(self) -> bool {
        matches!(self, TargetKind::Frame)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Frame => "FRAME",
            TargetKind::Rectangle => "RECTANGLE",
            TargetKind::Text => "TEXT",
            TargetKind::Vector => "VECTOR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub characters: String,
    pub font: FontName,
    pub style: TextStyle,
}

/// Everything the host needs to create one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub kind: TargetKind,
    pub name: String,
    /// IR id the node was created from.
    pub source_id: Option<String>,
    /// Position relative to the parent.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees, counter-clockwise (host convention).
    pub rotation: f64,
    pub style: NodeStyle,
    pub auto_layout: Option<AutoLayout>,
    /// Set only when the parent has auto-layout.
    pub child_layout: Option<ChildLayout>,
    pub text: Option<TextContent>,
}

impl NodeSpec {
    pub fn new(kind: TargetKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            source_id: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            style: NodeStyle::default(),
            auto_layout: None,
            child_layout: None,
            text: None,
        }
    }

    /// Solid rectangle standing in for content that could not be delivered.
    pub fn placeholder(name: impl Into<String>, x: f64, y: f64, rect: &Rect, color: Rgba) -> Self {
        let mut spec = Self::new(TargetKind::Rectangle, name);
        spec.x = x;
        spec.y = y;
        spec.width = rect.width.max(1.0);
        spec.height = rect.height.max(1.0);
        spec.style.fills.push(Paint::solid(color));
        spec
    }
}

/// Host reference to decoded image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Color(Rgba),
    Float(f64),
    String(String),
}

impl VariableValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            VariableValue::Color(_) => "COLOR",
            VariableValue::Float(_) => "FLOAT",
            VariableValue::String(_) => "STRING",
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait NodeFactory {
    /// The document root every unparented node attaches to.
    fn root(&self) -> TargetId;

    /// Creates a node and appends it as the last child of `parent`.
    async fn create_node(&mut self, parent: TargetId, spec: NodeSpec)
    -> Result<TargetId, HostError>;
}

#[allow(async_fn_in_trait)]
pub trait FontLoader {
    async fn load_font(&mut self, font: &FontName) -> Result<(), HostError>;
}

#[allow(async_fn_in_trait)]
pub trait ImageDecoder {
    async fn decode_image(&mut self, bytes: &[u8]) -> Result<ImageHandle, HostError>;
}

#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    /// Fetches a cross-origin image through the host's proxy.
    async fn fetch_image(&mut self, url: &str) -> Result<Vec<u8>, HostError>;
}

pub trait VariableStore {
    fn create_variable(
        &mut self,
        collection: &str,
        name: &str,
        value: &VariableValue,
    ) -> Result<VariableId, HostError>;
}

/// Status surface (the plugin UI).
pub trait StatusSink {
    fn emit(&mut self, event: ImportEvent);
}

/// Every capability the importer needs.
pub trait Host: NodeFactory + FontLoader + ImageDecoder + ImageFetcher + VariableStore + StatusSink {}

impl<T> Host for T where
    T: NodeFactory + FontLoader + ImageDecoder + ImageFetcher + VariableStore + StatusSink
{
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::message::ChunkData;
use crate::style::Styles;

pub type NodeId = String;

/// Creation path selector for an IR node.
///
/// Unknown tags from newer extraction agents deserialize to [`NodeKind::Other`]
/// and are materialized like frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Frame,
    Text,
    Image,
    Svg,
    Other,
}

impl From<String> for NodeKind {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "FRAME" | "ELEMENT" | "GROUP" => NodeKind::Frame,
            "TEXT" => NodeKind::Text,
            "IMAGE" | "IMG" => NodeKind::Image,
            "SVG" | "VECTOR" => NodeKind::Svg,
            _ => NodeKind::Other,
        }
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Frame => "FRAME",
            NodeKind::Text => "TEXT",
            NodeKind::Image => "IMAGE",
            NodeKind::Svg => "SVG",
            NodeKind::Other => "OTHER",
        }
        .to_string()
    }
}

/// Absolute viewport geometry of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Image bytes as shipped by the extraction agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImagePayload {
    /// Bytes inlined in the node (base64 or a raw byte array on the wire).
    Inline {
        data: ChunkData,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        mime: Option<String>,
    },
    /// Cross-origin image the host has to fetch through its proxy.
    Remote {
        url: String,
        #[serde(default)]
        #[serde(rename = "needsProxy")]
        needs_proxy: bool,
    },
    /// Bytes follow as `IMAGE_CHUNK` messages.
    Pending,
}

/// Placeholder left in a node whose image bytes are streamed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageChunkRef {
    #[serde(default)]
    pub is_streamed: bool,
    #[serde(default)]
    pub total_chunks: u32,
}

/// Compositing hints computed by the extraction agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compositing {
    #[serde(default)]
    pub creates_stacking_context: bool,
}

/// One flattened visual element of the source page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, alias = "layout")]
    pub rect: Rect,
    #[serde(default)]
    pub styles: Styles,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_chunk_ref: Option<ImageChunkRef>,
    #[serde(default)]
    pub compositing: Compositing,
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pseudo_elements: Vec<IrNode>,
}

/// Borrowed view of the single payload a node carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload<'a> {
    None,
    Text(&'a str),
    Image(&'a ImagePayload),
    Svg(&'a str),
    Streamed(&'a ImageChunkRef),
}

impl IrNode {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            rect: Rect::default(),
            styles: Styles::default(),
            parent: None,
            text: None,
            image: None,
            svg: None,
            image_chunk_ref: None,
            compositing: Compositing::default(),
            pseudo_elements: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_style(mut self, name: &str, value: impl Into<crate::StyleValue>) -> Self {
        self.styles.insert(name, value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Resolves the payload. A streamed chunk reference wins over everything
    /// else, then image, svg and text in that order.
    pub fn payload(&self) -> Payload<'_> {
        if let Some(chunk_ref) = self.image_chunk_ref.as_ref() {
            if chunk_ref.is_streamed {
                return Payload::Streamed(chunk_ref);
            }
        }
        if let Some(image) = self.image.as_ref() {
            if matches!(image, ImagePayload::Pending) {
                if let Some(chunk_ref) = self.image_chunk_ref.as_ref() {
                    return Payload::Streamed(chunk_ref);
                }
            }
            return Payload::Image(image);
        }
        if let Some(svg) = self.svg.as_deref() {
            return Payload::Svg(svg);
        }
        if let Some(text) = self.text.as_deref() {
            return Payload::Text(text);
        }
        Payload::None
    }

    pub fn is_streamed_image(&self) -> bool {
        matches!(self.payload(), Payload::Streamed(_))
    }

    /// Human readable layer name.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => match self.kind {
                NodeKind::Text => self
                    .text
                    .as_deref()
                    .map(|t| t.chars().take(32).collect::<String>())
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| "Text".to_string()),
                NodeKind::Image => "Image".to_string(),
                NodeKind::Svg => "Vector".to_string(),
                NodeKind::Frame | NodeKind::Other => "Frame".to_string(),
            },
        }
    }
}

/// One batch of nodes in source order.
///
/// Construction drops duplicate ids (first occurrence wins) and can splice
/// pseudo-elements into the sequence right after their owner.
#[derive(Debug, Clone, Default)]
pub struct IrBatch {
    nodes: Vec<IrNode>,
}

impl IrBatch {
    pub fn new(nodes: Vec<IrNode>, flatten_pseudo: bool) -> Self {
        let mut seen: HashSet<NodeId> = HashSet::with_capacity(nodes.len());
        let mut out = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            let pseudos = std::mem::take(&mut node.pseudo_elements);
            let owner = node.id.clone();
            if !seen.insert(owner.clone()) {
                warn!(id = %owner, "duplicate node id in batch; keeping first occurrence");
                continue;
            }
            out.push(node);
            if !flatten_pseudo {
                continue;
            }
            for (index, mut pseudo) in pseudos.into_iter().enumerate() {
                if pseudo.id.trim().is_empty() {
                    pseudo.id = format!("{owner}::{index}");
                }
                pseudo.parent = Some(owner.clone());
                pseudo.pseudo_elements.clear();
                if seen.insert(pseudo.id.clone()) {
                    out.push(pseudo);
                } else {
                    warn!(id = %pseudo.id, "duplicate pseudo-element id in batch");
                }
            }
        }
        Self { nodes: out }
    }

    pub fn nodes(&self) -> &[IrNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<IrNode> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

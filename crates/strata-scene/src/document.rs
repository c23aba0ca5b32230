//! Node arena of the in-memory design document.

use serde::Serialize;
use serde_json::{Value, json};
use strata_import::{HostError, NodeSpec, TargetId, TargetKind};
use strata_style::{AutoLayout, ChildLayout, NodeStyle, TextStyle};

#[derive(Debug, Clone, Serialize)]
pub struct SceneText {
    pub characters: String,
    pub font_family: String,
    pub font_style: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: TargetId,
    pub parent: Option<TargetId>,
    pub children: Vec<TargetId>,
    pub kind: TargetKind,
    pub name: String,
    pub source_id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub style: NodeStyle,
    pub auto_layout: Option<AutoLayout>,
    pub child_layout: Option<ChildLayout>,
    pub text: Option<SceneText>,
}

impl SceneNode {
    fn from_spec(id: TargetId, parent: TargetId, spec: NodeSpec) -> Self {
        Self {
            id,
            parent: Some(parent),
            children: Vec::new(),
            kind: spec.kind,
            name: spec.name,
            source_id: spec.source_id,
            x: spec.x,
            y: spec.y,
            width: spec.width,
            height: spec.height,
            rotation: spec.rotation,
            style: spec.style,
            auto_layout: spec.auto_layout,
            child_layout: spec.child_layout,
            text: spec.text.map(|text| SceneText {
                characters: text.characters,
                font_family: text.font.family,
                font_style: text.font.style,
                style: text.style,
            }),
        }
    }
}

/// Tree of nodes rooted at a page frame with id 0.
#[derive(Debug, Clone)]
pub struct SceneDocument {
    nodes: Vec<SceneNode>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self::new("Page")
    }
}

impl SceneDocument {
    pub fn new(page_name: impl Into<String>) -> Self {
        let page = SceneNode {
            id: TargetId(0),
            parent: None,
            children: Vec::new(),
            kind: TargetKind::Frame,
            name: page_name.into(),
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
        };
        Self { nodes: vec![page] }
    }

    pub fn root(&self) -> TargetId {
        TargetId(0)
    }

    pub fn get(&self, id: TargetId) -> Option<&SceneNode> {
        usize::try_from(id.0).ok().and_then(|i| self.nodes.get(i))
    }

    /// Appends a node as the last child of `parent`. Only frames take
    /// children.
    pub fn append(&mut self, parent: TargetId, spec: NodeSpec) -> Result<TargetId, HostError> {
        let parent_kind = self
            .get(parent)
            .map(|node| node.kind)
            .ok_or_else(|| HostError::NodeCreation(format!("unknown parent {parent}")))?;
        if !parent_kind.accepts_children() {
            return Err(HostError::NodeCreation(format!(
                "{} {parent} cannot hold children",
                parent_kind.as_str()
            )));
        }
        let id = TargetId(self.nodes.len() as u64);
        self.nodes.push(SceneNode::from_spec(id, parent, spec));
        // Parent existence was checked above.
        if let Some(node) = self.nodes.get_mut(parent.0 as usize) {
            node.children.push(id);
        }
        Ok(id)
    }

    pub fn children(&self, id: TargetId) -> &[TargetId] {
        self.get(id).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    pub fn find_by_source(&self, source_id: &str) -> Option<&SceneNode> {
        self.nodes
            .iter()
            .find(|node| node.source_id.as_deref() == Some(source_id))
    }

    /// Source ids of the children of `id`, in sibling order.
    pub fn child_sources(&self, id: TargetId) -> Vec<&str> {
        self.children(id)
            .iter()
            .filter_map(|child| self.get(*child))
            .filter_map(|node| node.source_id.as_deref())
            .collect()
    }

    pub fn depth_of(&self, id: TargetId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).and_then(|node| node.parent);
        }
        depth
    }

    /// Nodes excluding the page.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().skip(1)
    }

    /// Nested JSON dump starting at the page.
    pub fn to_json(&self) -> Value {
        self.node_json(self.root())
    }

    fn node_json(&self, id: TargetId) -> Value {
        let Some(node) = self.get(id) else {
            return Value::Null;
        };
        let mut value = json!({
            "id": node.id.0,
            "type": node.kind.as_str(),
            "name": node.name,
            "x": node.x,
            "y": node.y,
            "width": node.width,
            "height": node.height,
        });
        if let Value::Object(map) = &mut value {
            if let Some(source) = &node.source_id {
                map.insert("sourceId".into(), json!(source));
            }
            if node.rotation != 0.0 {
                map.insert("rotation".into(), json!(node.rotation));
            }
            if node.id != self.root() {
                map.insert("style".into(), json!(node.style));
            }
            if let Some(layout) = &node.auto_layout {
                map.insert("autoLayout".into(), json!(layout));
            }
            if let Some(child) = &node.child_layout {
                map.insert("childLayout".into(), json!(child));
            }
            if let Some(text) = &node.text {
                map.insert("text".into(), json!(text));
            }
            if !node.children.is_empty() {
                let children: Vec<Value> =
                    node.children.iter().map(|child| self.node_json(*child)).collect();
                map.insert("children".into(), Value::Array(children));
            }
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_sibling_order() {
        let mut doc = SceneDocument::default();
        let mut frame = NodeSpec::new(TargetKind::Frame, "frame");
        frame.source_id = Some("f".into());
        let f = doc.append(doc.root(), frame).unwrap();
        for id in ["a", "b", "c"] {
            let mut spec = NodeSpec::new(TargetKind::Rectangle, id);
            spec.source_id = Some(id.into());
            doc.append(f, spec).unwrap();
        }
        assert_eq!(doc.child_sources(f), vec!["a", "b", "c"]);
        assert_eq!(doc.depth_of(doc.find_by_source("b").unwrap().id), 2);
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn leaves_reject_children() {
        let mut doc = SceneDocument::default();
        let rect = doc
            .append(doc.root(), NodeSpec::new(TargetKind::Rectangle, "r"))
            .unwrap();
        let err = doc.append(rect, NodeSpec::new(TargetKind::Frame, "f"));
        assert!(matches!(err, Err(HostError::NodeCreation(_))));
        assert!(doc.append(TargetId(99), NodeSpec::new(TargetKind::Frame, "f")).is_err());
    }

    #[test]
    fn json_dump_nests_children() {
        let mut doc = SceneDocument::new("Import");
        let f = doc.append(doc.root(), NodeSpec::new(TargetKind::Frame, "outer")).unwrap();
        doc.append(f, NodeSpec::new(TargetKind::Text, "label")).unwrap();
        let json = doc.to_json();
        assert_eq!(json["name"], "Import");
        assert_eq!(json["children"][0]["name"], "outer");
        assert_eq!(json["children"][0]["children"][0]["type"], "TEXT");
    }
}

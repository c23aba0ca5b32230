//! In-memory host used by the unit tests.

use std::collections::{HashMap, HashSet};

use strata_ir::ImportEvent;

use crate::error::HostError;
use crate::host::{
    FontLoader, FontName, ImageDecoder, ImageFetcher, ImageHandle, NodeFactory, NodeSpec,
    StatusSink, TargetId, VariableId, VariableStore, VariableValue,
};

pub struct FakeHost {
    pub nodes: Vec<(TargetId, TargetId, NodeSpec)>,
    pub fonts: HashSet<FontName>,
    pub remote: HashMap<String, Vec<u8>>,
    pub variables: Vec<(String, VariableValue)>,
    pub events: Vec<ImportEvent>,
    /// Source ids whose creation is rejected.
    pub reject: HashSet<String>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::with_fonts(&[("Inter", "Regular")])
    }
}

impl FakeHost {
    pub fn with_fonts(fonts: &[(&str, &str)]) -> Self {
        Self {
            nodes: Vec::new(),
            fonts: fonts.iter().map(|(f, s)| FontName::new(*f, *s)).collect(),
            remote: HashMap::new(),
            variables: Vec::new(),
            events: Vec::new(),
            reject: HashSet::new(),
        }
    }

    /// `(target, parent, spec)` of the node created from `source`.
    pub fn find(&self, source: &str) -> Option<&(TargetId, TargetId, NodeSpec)> {
        self.nodes
            .iter()
            .find(|(_, _, spec)| spec.source_id.as_deref() == Some(source))
    }

    pub fn parent_of(&self, source: &str) -> Option<TargetId> {
        self.find(source).map(|(_, parent, _)| *parent)
    }

    pub fn target_of(&self, source: &str) -> Option<TargetId> {
        self.find(source).map(|(target, _, _)| *target)
    }
}

impl NodeFactory for FakeHost {
    fn root(&self) -> TargetId {
        TargetId(0)
    }

    async fn create_node(&mut self, parent: TargetId, spec: NodeSpec) -> Result<TargetId, HostError> {
        if let Some(source) = spec.source_id.as_deref() {
            if self.reject.contains(source) {
                return Err(HostError::NodeCreation(format!("{source} rejected")));
            }
        }
        let target = TargetId(self.nodes.len() as u64 + 1);
        self.nodes.push((target, parent, spec));
        Ok(target)
    }
}

impl FontLoader for FakeHost {
    async fn load_font(&mut self, font: &FontName) -> Result<(), HostError> {
        if self.fonts.contains(font) {
            Ok(())
        } else {
            Err(HostError::FontNotFound {
                family: font.family.clone(),
                style: font.style.clone(),
            })
        }
    }
}

impl ImageDecoder for FakeHost {
    async fn decode_image(&mut self, bytes: &[u8]) -> Result<ImageHandle, HostError> {
        if bytes.is_empty() {
            return Err(HostError::Decode("empty image".to_string()));
        }
        Ok(ImageHandle(format!("image-{}", bytes.len())))
    }
}

impl ImageFetcher for FakeHost {
    async fn fetch_image(&mut self, url: &str) -> Result<Vec<u8>, HostError> {
        self.remote.get(url).cloned().ok_or_else(|| HostError::Fetch {
            url: url.to_string(),
            reason: "404".to_string(),
        })
    }
}

impl VariableStore for FakeHost {
    fn create_variable(
        &mut self,
        _collection: &str,
        name: &str,
        value: &VariableValue,
    ) -> Result<VariableId, HostError> {
        self.variables.push((name.to_string(), value.clone()));
        Ok(VariableId(self.variables.len() as u64))
    }
}

impl StatusSink for FakeHost {
    fn emit(&mut self, event: ImportEvent) {
        self.events.push(event);
    }
}

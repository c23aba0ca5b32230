//! In-memory design document implementing every importer host capability.
//!
//! `SceneHost` stands in for the design tool: it keeps the created node
//! tree, knows which fonts are installed, decodes images with the `image`
//! crate, serves proxied fetches from a fixture map, stores variables and
//! records status events. The CLI and the end-to-end tests import into it.

#![allow(clippy::all)]

pub mod document;
pub mod fonts;
pub mod images;

use std::collections::HashMap;

use serde_json::{Value, json};
use strata_import::{
    FontLoader, FontName, HostError, ImageDecoder, ImageFetcher, ImageHandle, NodeFactory,
    NodeSpec, StatusSink, TargetId, VariableId, VariableStore, VariableValue,
};
use strata_ir::ImportEvent;
use tracing::{debug, info};

pub use document::{SceneDocument, SceneNode, SceneText};
pub use fonts::FontRegistry;
pub use images::{ImageInfo, ImageStore, sha256_hex};

#[derive(Debug, Clone, PartialEq)]
pub struct SceneVariable {
    pub id: VariableId,
    pub collection: String,
    pub name: String,
    pub value: VariableValue,
}

#[derive(Debug, Default)]
pub struct SceneHost {
    pub document: SceneDocument,
    pub fonts: FontRegistry,
    pub images: ImageStore,
    /// URL to bytes, served by `fetch_image`.
    pub fixtures: HashMap<String, Vec<u8>>,
    pub variables: Vec<SceneVariable>,
    pub events: Vec<ImportEvent>,
    pub loaded_fonts: Vec<FontName>,
}

impl SceneHost {
    pub fn new(fonts: FontRegistry) -> Self {
        Self {
            fonts,
            ..Self::default()
        }
    }

    pub fn with_fixture(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.fixtures.insert(url.into(), bytes);
        self
    }

    pub fn variable(&self, name: &str) -> Option<&SceneVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            ImportEvent::Error { message } => Some(message.as_str()),
            _ => None,
        })
    }

    /// Document tree plus variables, images and the event log.
    pub fn to_json(&self) -> Value {
        let variables: Vec<Value> = self
            .variables
            .iter()
            .map(|v| {
                let value = match &v.value {
                    VariableValue::Color(color) => json!(color),
                    VariableValue::Float(n) => json!(n),
                    VariableValue::String(s) => json!(s),
                };
                json!({
                    "collection": v.collection,
                    "name": v.name,
                    "type": v.value.type_name(),
                    "value": value,
                })
            })
            .collect();
        let images: serde_json::Map<String, Value> = self
            .images
            .iter()
            .map(|(hash, info)| (hash.clone(), json!(info)))
            .collect();
        json!({
            "document": self.document.to_json(),
            "variables": variables,
            "images": images,
            "events": self.events,
        })
    }
}

impl NodeFactory for SceneHost {
    fn root(&self) -> TargetId {
        self.document.root()
    }

    async fn create_node(&mut self, parent: TargetId, spec: NodeSpec) -> Result<TargetId, HostError> {
        let kind = spec.kind;
        let id = self.document.append(parent, spec)?;
        debug!(id = %id, parent = %parent, kind = kind.as_str(), "node created");
        Ok(id)
    }
}

impl FontLoader for SceneHost {
    async fn load_font(&mut self, font: &FontName) -> Result<(), HostError> {
        if !self.fonts.contains(font) {
            return Err(HostError::FontNotFound {
                family: font.family.clone(),
                style: font.style.clone(),
            });
        }
        if !self.loaded_fonts.contains(font) {
            info!(font = %font, "font loaded");
            self.loaded_fonts.push(font.clone());
        }
        Ok(())
    }
}

impl ImageDecoder for SceneHost {
    async fn decode_image(&mut self, bytes: &[u8]) -> Result<ImageHandle, HostError> {
        self.images.decode(bytes)
    }
}

impl ImageFetcher for SceneHost {
    async fn fetch_image(&mut self, url: &str) -> Result<Vec<u8>, HostError> {
        self.fixtures.get(url).cloned().ok_or_else(|| HostError::Fetch {
            url: url.to_string(),
            reason: "no fixture for url".to_string(),
        })
    }
}

impl VariableStore for SceneHost {
    fn create_variable(
        &mut self,
        collection: &str,
        name: &str,
        value: &VariableValue,
    ) -> Result<VariableId, HostError> {
        if self
            .variables
            .iter()
            .any(|v| v.collection == collection && v.name == name)
        {
            return Err(HostError::Variable {
                name: name.to_string(),
                reason: format!("already exists in {collection}"),
            });
        }
        let id = VariableId(self.variables.len() as u64 + 1);
        self.variables.push(SceneVariable {
            id,
            collection: collection.to_string(),
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(id)
    }
}

impl StatusSink for SceneHost {
    fn emit(&mut self, event: ImportEvent) {
        self.events.push(event);
    }
}

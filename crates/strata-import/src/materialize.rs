//! IR node to host node: kind selection, relative geometry, style mapping,
//! fonts and image payloads.

use strata_ir::{ImagePayload, IrNode, NodeKind, Payload};
use strata_style::{
    LayoutMode, Paint, ScaleMode, map_auto_layout, map_child_layout, map_node_style,
    map_text_style,
};
use tracing::{debug, warn};

use crate::assembler::{CreatedNode, NodeCreator, ParentSlot};
use crate::error::{ImportError, Result};
use crate::fonts::{FontCache, font_for_styles};
use crate::host::{Host, NodeSpec, TargetKind, TextContent};
use crate::settings::ImportSettings;

pub struct Materializer<'a, H> {
    host: &'a mut H,
    fonts: &'a mut FontCache,
    settings: &'a ImportSettings,
}

impl<'a, H: Host> Materializer<'a, H> {
    pub fn new(host: &'a mut H, fonts: &'a mut FontCache, settings: &'a ImportSettings) -> Self {
        Self {
            host,
            fonts,
            settings,
        }
    }

    /// Geometry and visual style shared by every kind. Position is made
    /// relative to the parent; CSS clockwise rotation becomes the host's
    /// counter-clockwise angle.
    pub fn base_spec(&self, node: &IrNode, parent: &ParentSlot, kind: TargetKind) -> NodeSpec {
        let mut spec = NodeSpec::new(kind, node.display_name());
        spec.source_id = Some(node.id.clone());
        spec.x = node.rect.x - parent.origin_x;
        spec.y = node.rect.y - parent.origin_y;
        spec.width = node.rect.width.max(0.0);
        spec.height = node.rect.height.max(0.0);
        spec.style = map_node_style(&node.styles);
        spec.rotation = spec.style.rotation.map(|deg| -deg).unwrap_or(0.0);

        if kind == TargetKind::Frame {
            spec.auto_layout = map_auto_layout(&node.styles);
        }
        if parent.auto_layout {
            let child = map_child_layout(&node.styles);
            if !child.is_default() {
                spec.child_layout = Some(child);
            }
        }
        spec
    }

    /// Full spec for `node`. The flag is set when image content had to be
    /// replaced by a placeholder fill.
    pub async fn spec_for(&mut self, node: &IrNode, parent: &ParentSlot) -> Result<(NodeSpec, bool)> {
        match node.payload() {
            Payload::Text(characters) => {
                let mut spec = self.base_spec(node, parent, TargetKind::Text);
                let wanted = font_for_styles(&node.styles, &self.settings.default_font.family);
                let font = match self
                    .fonts
                    .load(&mut *self.host, &wanted, &self.settings.default_font)
                    .await
                {
                    Ok(font) => font,
                    Err(err) => {
                        // The text node is kept, naming the default font.
                        warn!(id = %node.id, error = %err, "no font could be loaded");
                        self.settings.default_font.clone()
                    }
                };
                spec.style.fills.clear();
                spec.text = Some(TextContent {
                    characters: characters.to_string(),
                    font,
                    style: map_text_style(&node.styles),
                });
                Ok((spec, false))
            }
            Payload::Image(payload) => {
                let mut spec = self.base_spec(node, parent, TargetKind::Rectangle);
                match self.image_paint(&node.id, payload).await {
                    Ok(paint) => {
                        spec.style.fills.push(paint);
                        Ok((spec, false))
                    }
                    Err(err) => {
                        warn!(id = %node.id, error = %err, "image unavailable, using placeholder");
                        self.fill_placeholder(&mut spec);
                        Ok((spec, true))
                    }
                }
            }
            Payload::Svg(markup) => {
                debug!(id = %node.id, bytes = markup.len(), "svg imported as vector placeholder");
                let mut spec = self.base_spec(node, parent, TargetKind::Vector);
                if spec.style.fills.is_empty() {
                    self.fill_placeholder(&mut spec);
                }
                Ok((spec, false))
            }
            Payload::Streamed(_) => {
                // Bytes for streamed images travel separately; reaching here
                // means they will never be attached to this node.
                let mut spec = self.base_spec(node, parent, TargetKind::Rectangle);
                self.fill_placeholder(&mut spec);
                Ok((spec, true))
            }
            Payload::None if node.kind == NodeKind::Image => {
                let mut spec = self.base_spec(node, parent, TargetKind::Rectangle);
                self.fill_placeholder(&mut spec);
                Ok((spec, true))
            }
            Payload::None => Ok((self.base_spec(node, parent, TargetKind::Frame), false)),
        }
    }

    /// Decodes inline bytes, or fetches a remote image through the host's
    /// proxy first.
    pub async fn image_paint(&mut self, node_id: &str, payload: &ImagePayload) -> Result<Paint> {
        match payload {
            ImagePayload::Inline { data, .. } => self.decode(node_id, data.as_bytes()).await,
            ImagePayload::Remote { url, needs_proxy } => {
                debug!(id = node_id, url = %url, needs_proxy, "fetching image");
                let bytes = self.host.fetch_image(url).await.map_err(|err| {
                    ImportError::ImageFetch {
                        url: url.clone(),
                        reason: err.to_string(),
                    }
                })?;
                self.decode(node_id, &bytes).await
            }
            ImagePayload::Pending => Err(ImportError::ImageDecode {
                node_id: node_id.to_string(),
                reason: "image bytes were never sent".to_string(),
            }),
        }
    }

    async fn decode(&mut self, node_id: &str, bytes: &[u8]) -> Result<Paint> {
        let handle = self
            .host
            .decode_image(bytes)
            .await
            .map_err(|err| ImportError::ImageDecode {
                node_id: node_id.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Paint::Image {
            hash: handle.0,
            scale_mode: ScaleMode::Fill,
        })
    }

    fn fill_placeholder(&self, spec: &mut NodeSpec) {
        spec.style.fills = vec![Paint::solid(self.settings.placeholder_color)];
    }

    /// Creates a streamed image whose bytes have been reassembled.
    pub async fn create_image(
        &mut self,
        node: &IrNode,
        parent: &ParentSlot,
        bytes: &[u8],
    ) -> Option<CreatedNode> {
        let mut spec = self.base_spec(node, parent, TargetKind::Rectangle);
        let placeholder = match self.decode(&node.id, bytes).await {
            Ok(paint) => {
                spec.style.fills.push(paint);
                false
            }
            Err(err) => {
                warn!(id = %node.id, error = %err, "streamed image unusable, using placeholder");
                self.fill_placeholder(&mut spec);
                true
            }
        };
        self.commit(parent, spec, placeholder).await
    }

    /// Solid rectangle at the node's last known geometry.
    pub async fn create_placeholder(
        &mut self,
        node: &IrNode,
        parent: &ParentSlot,
    ) -> Option<CreatedNode> {
        let spec = NodeSpec {
            source_id: Some(node.id.clone()),
            ..NodeSpec::placeholder(
                node.display_name(),
                node.rect.x - parent.origin_x,
                node.rect.y - parent.origin_y,
                &node.rect,
                self.settings.placeholder_color,
            )
        };
        self.commit(parent, spec, true).await
    }

    async fn commit(
        &mut self,
        parent: &ParentSlot,
        spec: NodeSpec,
        placeholder: bool,
    ) -> Option<CreatedNode> {
        let accepts_children = spec.kind.accepts_children();
        let auto_layout = spec
            .auto_layout
            .is_some_and(|layout| layout.mode != LayoutMode::None);
        let source = spec.source_id.clone().unwrap_or_default();
        match self.host.create_node(parent.target, spec).await {
            Ok(target) => Some(CreatedNode {
                target,
                accepts_children,
                auto_layout,
                placeholder,
            }),
            Err(err) => {
                warn!(id = %source, error = %err, "host rejected node");
                None
            }
        }
    }
}

impl<H: Host> NodeCreator for Materializer<'_, H> {
    async fn create(&mut self, node: &IrNode, parent: &ParentSlot) -> Option<CreatedNode> {
        match self.spec_for(node, parent).await {
            Ok((spec, placeholder)) => self.commit(parent, spec, placeholder).await,
            Err(err) => {
                warn!(id = %node.id, error = %err, "node skipped");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FontName, TargetId};
    use crate::testing::FakeHost;
    use strata_ir::{ChunkData, Rect};
    use strata_style::Effect;

    fn parent_at(x: f64, y: f64, auto_layout: bool) -> ParentSlot {
        ParentSlot {
            target: TargetId(0),
            origin_x: x,
            origin_y: y,
            depth: 1,
            auto_layout,
        }
    }

    #[test]
    fn frame_geometry_is_relative_and_styled() {
        let mut host = FakeHost::default();
        let mut fonts = FontCache::new();
        let settings = ImportSettings::default();
        let mut materializer = Materializer::new(&mut host, &mut fonts, &settings);

        let node = IrNode::new("card", NodeKind::Frame)
            .with_rect(Rect::new(110.0, 60.0, 200.0, 80.0))
            .with_style("backgroundColor", "#ffffff")
            .with_style("boxShadow", "0 2px 4px rgba(0,0,0,0.2)")
            .with_style("transform", "rotate(10deg)")
            .with_style("display", "flex")
            .with_style("flexGrow", "1");
        let (spec, placeholder) =
            pollster::block_on(materializer.spec_for(&node, &parent_at(100.0, 50.0, true))).unwrap();

        assert!(!placeholder);
        assert_eq!(spec.kind, TargetKind::Frame);
        assert_eq!((spec.x, spec.y, spec.width, spec.height), (10.0, 10.0, 200.0, 80.0));
        assert_eq!(spec.rotation, -10.0);
        assert_eq!(spec.style.fills.len(), 1);
        assert!(matches!(spec.style.effects[0], Effect::DropShadow { .. }));
        assert_eq!(spec.auto_layout.unwrap().mode, LayoutMode::Horizontal);
        assert_eq!(spec.child_layout.unwrap().grow, 1.0);
    }

    #[test]
    fn child_layout_only_inside_auto_layout_parent() {
        let mut host = FakeHost::default();
        let mut fonts = FontCache::new();
        let settings = ImportSettings::default();
        let materializer = Materializer::new(&mut host, &mut fonts, &settings);
        let node = IrNode::new("item", NodeKind::Frame).with_style("flexGrow", "2");
        let spec = materializer.base_spec(&node, &parent_at(0.0, 0.0, false), TargetKind::Frame);
        assert!(spec.child_layout.is_none());
    }

    #[test]
    fn text_uses_resolved_font_with_fallback() {
        let mut host = FakeHost::with_fonts(&[("Inter", "Regular"), ("Roboto", "Regular")]);
        let mut fonts = FontCache::new();
        let settings = ImportSettings::default();
        let mut materializer = Materializer::new(&mut host, &mut fonts, &settings);

        let node = IrNode::new("t", NodeKind::Text)
            .with_text("Hello")
            .with_style("fontFamily", "Roboto, sans-serif")
            .with_style("fontWeight", "700")
            .with_style("fontSize", "24px")
            .with_style("backgroundColor", "red");
        let (spec, _) =
            pollster::block_on(materializer.spec_for(&node, &parent_at(0.0, 0.0, false))).unwrap();
        let text = spec.text.unwrap();
        assert_eq!(text.font, FontName::new("Roboto", "Regular"));
        assert_eq!(text.characters, "Hello");
        assert_eq!(text.style.font_size, 24.0);
        assert!(spec.style.fills.is_empty());
    }

    #[test]
    fn text_survives_an_exhausted_font_chain() {
        let mut host = FakeHost::with_fonts(&[]);
        let mut fonts = FontCache::new();
        let settings = ImportSettings::default();
        let mut materializer = Materializer::new(&mut host, &mut fonts, &settings);

        let node = IrNode::new("t", NodeKind::Text)
            .with_text("Still here")
            .with_style("fontFamily", "Nope");
        let (spec, placeholder) =
            pollster::block_on(materializer.spec_for(&node, &parent_at(0.0, 0.0, false))).unwrap();
        assert!(!placeholder);
        let text = spec.text.unwrap();
        assert_eq!(text.characters, "Still here");
        assert_eq!(text.font, settings.default_font);
    }

    #[test]
    fn undecodable_image_becomes_placeholder() {
        let mut host = FakeHost::default();
        let mut fonts = FontCache::new();
        let settings = ImportSettings::default();
        let mut materializer = Materializer::new(&mut host, &mut fonts, &settings);

        let mut node = IrNode::new("img", NodeKind::Image);
        node.image = Some(ImagePayload::Inline {
            data: ChunkData(Vec::new()),
            mime: None,
        });
        let (spec, placeholder) =
            pollster::block_on(materializer.spec_for(&node, &parent_at(0.0, 0.0, false))).unwrap();
        assert!(placeholder);
        assert!(matches!(spec.style.fills[0], Paint::Solid { .. }));

        node.image = Some(ImagePayload::Inline {
            data: ChunkData(b"png".to_vec()),
            mime: None,
        });
        let (spec, placeholder) =
            pollster::block_on(materializer.spec_for(&node, &parent_at(0.0, 0.0, false))).unwrap();
        assert!(!placeholder);
        assert!(matches!(spec.style.fills[0], Paint::Image { .. }));
    }

    #[test]
    fn remote_images_are_fetched_then_decoded() {
        let mut host = FakeHost::default();
        host.remote.insert("https://cdn.test/a.png".into(), b"png".to_vec());
        let mut fonts = FontCache::new();
        let settings = ImportSettings::default();
        let mut materializer = Materializer::new(&mut host, &mut fonts, &settings);

        let paint = pollster::block_on(materializer.image_paint(
            "img",
            &ImagePayload::Remote {
                url: "https://cdn.test/a.png".into(),
                needs_proxy: true,
            },
        ))
        .unwrap();
        assert!(matches!(paint, Paint::Image { .. }));

        let missing = pollster::block_on(materializer.image_paint(
            "img",
            &ImagePayload::Remote {
                url: "https://cdn.test/missing.png".into(),
                needs_proxy: true,
            },
        ));
        assert!(matches!(missing, Err(ImportError::ImageFetch { .. })));
    }
}

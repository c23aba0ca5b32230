use std::io::Cursor;

use anyhow::Result;
use serde_json::json;
use strata_import::{ImportSettings, Importer, TargetKind};
use strata_ir::{
    ChunkData, ImageChunkRef, ImagePayload, ImportEvent, ImportMessage, InboundMessage, IrNode,
    NodeKind, Rect,
};
use strata_scene::{FontRegistry, SceneHost, sha256_hex};
use strata_style::{LayoutMode, Paint};

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

fn importer() -> Result<Importer<SceneHost>> {
    let fonts = FontRegistry::parse_list("Inter:Regular,Inter:Bold,Roboto:Regular")?;
    Ok(Importer::new(SceneHost::new(fonts), ImportSettings::default())?)
}

fn send(importer: &mut Importer<SceneHost>, message: impl Into<InboundMessage>) {
    pollster::block_on(importer.handle(message.into()));
}

#[test]
fn streaming_session_builds_the_document() -> Result<()> {
    let mut importer = importer()?;
    let inline = png(2, 2);
    let streamed = png(4, 3);
    let (head, tail) = streamed.split_at(streamed.len() / 2);

    send(
        &mut importer,
        ImportMessage::Tokens {
            explicit: serde_json::from_value(json!({"brand": "#0080ff", "gap": "12px"}))?,
            implicit: serde_json::from_value(json!({"gap": "8px", "family": "Inter"}))?,
        },
    );
    send(
        &mut importer,
        ImportMessage::Fonts {
            fonts: serde_json::from_value(json!([{"family": "Inter", "weight": 700}]))?,
            font_faces: Vec::new(),
        },
    );

    let mut logo = IrNode::new("logo", NodeKind::Image)
        .with_parent("header")
        .with_rect(Rect::new(20.0, 20.0, 32.0, 32.0));
    logo.image = Some(ImagePayload::Inline {
        data: ChunkData(inline.clone()),
        mime: Some("image/png".into()),
    });
    let mut hero = IrNode::new("hero", NodeKind::Image)
        .with_parent("page")
        .with_rect(Rect::new(0.0, 80.0, 400.0, 300.0));
    hero.image_chunk_ref = Some(ImageChunkRef {
        is_streamed: true,
        total_chunks: 2,
    });

    send(
        &mut importer,
        ImportMessage::Nodes {
            nodes: vec![
                IrNode::new("page", NodeKind::Frame)
                    .with_rect(Rect::new(0.0, 0.0, 400.0, 600.0))
                    .with_style("backgroundColor", "#ffffff"),
                IrNode::new("header", NodeKind::Frame)
                    .with_parent("page")
                    .with_rect(Rect::new(10.0, 10.0, 380.0, 60.0))
                    .with_style("display", "flex")
                    .with_style("gap", "8px")
                    .with_style("padding", "10px 20px"),
                logo,
                IrNode::new("title", NodeKind::Text)
                    .with_parent("header")
                    .with_rect(Rect::new(60.0, 20.0, 200.0, 24.0))
                    .with_text("Strata")
                    .with_style("fontFamily", "Inter, sans-serif")
                    .with_style("fontWeight", "700")
                    .with_style("flexGrow", "1"),
                hero,
            ],
        },
    );
    send(
        &mut importer,
        ImportMessage::ImageChunk {
            node_id: "hero".into(),
            chunk_index: 1,
            data: ChunkData(tail.to_vec()),
            total_chunks: 2,
        },
    );
    send(
        &mut importer,
        ImportMessage::ImageChunk {
            node_id: "hero".into(),
            chunk_index: 0,
            data: ChunkData(head.to_vec()),
            total_chunks: 2,
        },
    );
    send(&mut importer, ImportMessage::Complete { stats: None });

    let host = importer.host();
    let doc = &host.document;
    assert_eq!(host.errors().count(), 0);

    let page = doc.find_by_source("page").expect("page");
    assert_eq!(page.parent, Some(doc.root()));
    assert_eq!(doc.child_sources(page.id), vec!["header", "hero"]);

    let header = doc.find_by_source("header").expect("header");
    let layout = header.auto_layout.expect("auto layout");
    assert_eq!(layout.mode, LayoutMode::Horizontal);
    assert_eq!(layout.item_spacing, 8.0);
    assert_eq!(layout.padding.left, 20.0);
    assert_eq!(layout.padding.top, 10.0);
    assert_eq!((header.x, header.y), (10.0, 10.0));

    let logo = doc.find_by_source("logo").expect("logo");
    assert_eq!(logo.kind, TargetKind::Rectangle);
    assert_eq!((logo.x, logo.y), (10.0, 10.0));
    assert!(
        matches!(&logo.style.fills[0], Paint::Image { hash, .. } if *hash == sha256_hex(&inline))
    );

    let title = doc.find_by_source("title").expect("title");
    let text = title.text.as_ref().expect("text");
    assert_eq!((text.font_family.as_str(), text.font_style.as_str()), ("Inter", "Bold"));
    assert_eq!(title.child_layout.map(|c| c.grow), Some(1.0));

    let hero = doc.find_by_source("hero").expect("hero");
    assert!(
        matches!(&hero.style.fills[0], Paint::Image { hash, .. } if *hash == sha256_hex(&streamed))
    );
    assert_eq!(host.images.get(&sha256_hex(&streamed)).map(|i| i.width), Some(4));

    assert_eq!(host.variables.len(), 3);
    assert_eq!(host.variable("gap").map(|v| v.value.type_name()), Some("FLOAT"));
    assert_eq!(host.variable("brand").map(|v| v.value.type_name()), Some("COLOR"));
    assert_eq!(host.variable("family").map(|v| v.value.type_name()), Some("STRING"));

    let stats = host
        .events
        .iter()
        .find_map(|event| match event {
            ImportEvent::Complete { stats } => Some(*stats),
            _ => None,
        })
        .expect("complete event");
    assert_eq!(stats.created, 5);
    assert_eq!(stats.images, 2);
    assert_eq!(stats.texts, 1);
    assert_eq!(stats.placeholders, 0);
    assert_eq!(stats.max_depth, 3);
    Ok(())
}

#[test]
fn stacking_decides_sibling_order() -> Result<()> {
    let mut importer = importer()?;
    let positioned = |id: &str, z: &str| {
        IrNode::new(id, NodeKind::Frame)
            .with_parent("page")
            .with_style("position", "relative")
            .with_style("zIndex", z)
    };
    send(
        &mut importer,
        ImportMessage::Nodes {
            nodes: vec![
                IrNode::new("page", NodeKind::Frame),
                positioned("modal", "10"),
                IrNode::new("content", NodeKind::Frame).with_parent("page"),
                positioned("backdrop", "-1"),
                IrNode::new("modal-body", NodeKind::Frame).with_parent("modal"),
            ],
        },
    );
    let doc = &importer.host().document;
    let page = doc.find_by_source("page").expect("page");
    assert_eq!(doc.child_sources(page.id), vec!["backdrop", "content", "modal"]);
    let modal = doc.find_by_source("modal").expect("modal");
    assert_eq!(doc.child_sources(modal.id), vec!["modal-body"]);
    assert_eq!(importer.stats().flattened, 0);
    Ok(())
}

#[test]
fn unreachable_images_become_placeholders() -> Result<()> {
    let fonts = FontRegistry::parse_list("Inter:Regular")?;
    let host = SceneHost::new(fonts).with_fixture("https://cdn.test/ok.png", png(1, 1));
    let mut importer = Importer::new(host, ImportSettings::default())?;

    let remote = |id: &str, url: &str| {
        let mut node = IrNode::new(id, NodeKind::Image).with_rect(Rect::new(0.0, 0.0, 0.0, 0.0));
        node.image = Some(ImagePayload::Remote {
            url: url.into(),
            needs_proxy: true,
        });
        node
    };
    send(
        &mut importer,
        ImportMessage::Nodes {
            nodes: vec![
                remote("ok", "https://cdn.test/ok.png"),
                remote("missing", "https://cdn.test/missing.png"),
            ],
        },
    );
    send(&mut importer, ImportMessage::Complete { stats: None });

    let doc = &importer.host().document;
    let ok = doc.find_by_source("ok").expect("ok");
    assert!(matches!(ok.style.fills[0], Paint::Image { .. }));
    let missing = doc.find_by_source("missing").expect("missing");
    assert!(matches!(missing.style.fills[0], Paint::Solid { .. }));
    assert_eq!(importer.stats().placeholders, 1);
    Ok(())
}

#[test]
fn json_messages_round_through_the_scene() -> Result<()> {
    let mut importer = importer()?;
    let lines = [
        r#"{"type":"NODES","nodes":[{"id":"card","type":"FRAME","rect":{"x":0,"y":0,"width":100,"height":50},"styles":{"border-radius":"8px 4px","box-shadow":"0 1px 2px rgba(0,0,0,.3)","opacity":"0.5"}}]}"#,
        r#"{"type":"NODES","nodes":[{"id":"orphan","type":"TEXT","parent":"nowhere","text":"hi"}]}"#,
        r#"{"type":"COMPLETE"}"#,
    ];
    for line in lines {
        pollster::block_on(importer.handle_json(line));
    }
    let host = importer.host();
    let card = host.document.find_by_source("card").expect("card");
    assert_eq!(card.style.corner_radius, 8.0);
    assert_eq!(card.style.opacity, 0.5);
    assert_eq!(card.style.effects.len(), 1);

    let orphan = host.document.find_by_source("orphan").expect("orphan");
    assert_eq!(orphan.parent, Some(host.document.root()));
    assert_eq!(importer.stats().orphans, 1);

    let dump = host.to_json();
    assert_eq!(dump["document"]["children"][0]["sourceId"], "card");
    assert_eq!(dump["document"]["children"][1]["text"]["characters"], "hi");
    Ok(())
}

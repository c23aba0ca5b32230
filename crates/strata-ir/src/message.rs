//! Message channel protocol between the extraction agent, the UI panel and
//! the importer.
//!
//! Two inbound dialects exist: the streaming protocol (`TOKENS`, `FONTS`,
//! `NODES`, `IMAGE_CHUNK`, `COMPLETE`, ...) and the older whole-payload
//! protocol (`full_page`, `node_chunk`, ...). Both deserialize into
//! [`InboundMessage`].

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::node::IrNode;
use crate::style::StyleValue;

/// Binary payload. Accepts base64 (optionally as a `data:` URL) or a JSON
/// byte array; always serializes as base64.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkData(pub Vec<u8>);

impl ChunkData {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for ChunkData {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for ChunkData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for ChunkData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Encoded(String),
            Bytes(Vec<u8>),
            // Uint8Array passed through JSON.stringify: {"0": 137, "1": 80, ...}
            Indexed(BTreeMap<String, u8>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Encoded(text) => {
                let encoded = match text.split_once(";base64,") {
                    Some((_, rest)) if text.starts_with("data:") => rest,
                    _ => text.as_str(),
                };
                STANDARD
                    .decode(encoded.trim())
                    .map(ChunkData)
                    .map_err(|e| D::Error::custom(format!("invalid base64 chunk data: {e}")))
            }
            Raw::Bytes(bytes) => Ok(ChunkData(bytes)),
            Raw::Indexed(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (key, byte) in map {
                    let index: usize = key
                        .parse()
                        .map_err(|_| D::Error::custom(format!("invalid byte index '{key}'")))?;
                    pairs.push((index, byte));
                }
                pairs.sort_by_key(|(index, _)| *index);
                Ok(ChunkData(pairs.into_iter().map(|(_, b)| b).collect()))
            }
        }
    }
}

/// Design tokens discovered on the page (custom properties and
/// frequently used literal values).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignTokens {
    #[serde(default)]
    pub explicit: BTreeMap<String, Value>,
    #[serde(default)]
    pub implicit: BTreeMap<String, Value>,
}

/// A font used on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontRequest {
    pub family: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<StyleValue>,
}

/// Streaming import protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMessage {
    Tokens {
        #[serde(default)]
        explicit: BTreeMap<String, Value>,
        #[serde(default)]
        implicit: BTreeMap<String, Value>,
    },
    Fonts {
        #[serde(default)]
        fonts: Vec<FontRequest>,
        #[serde(default)]
        #[serde(rename = "fontFaces")]
        font_faces: Vec<FontRequest>,
    },
    Nodes {
        #[serde(default)]
        nodes: Vec<IrNode>,
    },
    ImageChunk {
        #[serde(rename = "nodeId")]
        node_id: String,
        #[serde(rename = "chunkIndex")]
        chunk_index: u32,
        data: ChunkData,
        #[serde(rename = "totalChunks")]
        total_chunks: u32,
    },
    Complete {
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<Value>,
    },
    Progress {
        #[serde(default)]
        message: String,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

/// Whole-page payload of the legacy protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyPage {
    #[serde(default)]
    pub nodes: Vec<IrNode>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<DesignTokens>,
    #[serde(default)]
    pub fonts: Vec<FontRequest>,
}

/// Legacy whole-payload protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LegacyMessage {
    FullPage {
        data: LegacyPage,
    },
    Tokens {
        #[serde(default)]
        data: DesignTokens,
    },
    NodeChunk {
        #[serde(default)]
        nodes: Vec<IrNode>,
        #[serde(default)]
        #[serde(rename = "chunkIndex")]
        chunk_index: u32,
        #[serde(default)]
        #[serde(rename = "totalChunks")]
        total_chunks: u32,
    },
    Complete {},
    Error {
        #[serde(default)]
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InboundMessage {
    Streaming(ImportMessage),
    Legacy(LegacyMessage),
}

impl InboundMessage {
    /// Parses one message, picking the dialect from the `type` tag: the
    /// streaming protocol uses upper-case tags, the legacy one lower-case.
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(source)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let is_legacy = value
            .get("type")
            .and_then(Value::as_str)
            .map(|tag| tag.chars().any(|c| c.is_ascii_lowercase()))
            .unwrap_or(false);
        if is_legacy {
            serde_json::from_value(value).map(InboundMessage::Legacy)
        } else {
            serde_json::from_value(value).map(InboundMessage::Streaming)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Streaming(msg) => match msg {
                ImportMessage::Tokens { .. } => "TOKENS",
                ImportMessage::Fonts { .. } => "FONTS",
                ImportMessage::Nodes { .. } => "NODES",
                ImportMessage::ImageChunk { .. } => "IMAGE_CHUNK",
                ImportMessage::Complete { .. } => "COMPLETE",
                ImportMessage::Progress { .. } => "PROGRESS",
                ImportMessage::Error { .. } => "ERROR",
            },
            InboundMessage::Legacy(msg) => match msg {
                LegacyMessage::FullPage { .. } => "full_page",
                LegacyMessage::Tokens { .. } => "tokens",
                LegacyMessage::NodeChunk { .. } => "node_chunk",
                LegacyMessage::Complete {} => "complete",
                LegacyMessage::Error { .. } => "error",
            },
        }
    }
}

impl<'de> Deserialize<'de> for InboundMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        InboundMessage::from_value(value).map_err(D::Error::custom)
    }
}

impl From<ImportMessage> for InboundMessage {
    fn from(msg: ImportMessage) -> Self {
        InboundMessage::Streaming(msg)
    }
}

impl From<LegacyMessage> for InboundMessage {
    fn from(msg: LegacyMessage) -> Self {
        InboundMessage::Legacy(msg)
    }
}

/// Running totals for one import session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub created: usize,
    pub failed: usize,
    pub images: usize,
    pub texts: usize,
    pub orphans: usize,
    pub flattened: usize,
    pub placeholders: usize,
    pub max_depth: usize,
    pub batches: usize,
}

impl StatsSnapshot {
    pub fn merge(&mut self, other: &StatsSnapshot) {
        self.created += other.created;
        self.failed += other.failed;
        self.images += other.images;
        self.texts += other.texts;
        self.orphans += other.orphans;
        self.flattened += other.flattened;
        self.placeholders += other.placeholders;
        self.max_depth = self.max_depth.max(other.max_depth);
        self.batches += other.batches;
    }
}

/// Status events surfaced to the UI panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportEvent {
    Progress {
        message: String,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
    },
    Error {
        message: String,
    },
    Complete {
        stats: StatsSnapshot,
    },
    Notify {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_image_chunk_with_base64_data() {
        let msg = InboundMessage::from_json(
            r#"{"type":"IMAGE_CHUNK","nodeId":"img","chunkIndex":1,"data":"AAEC","totalChunks":2}"#,
        )
        .expect("chunk should parse");
        match msg {
            InboundMessage::Streaming(ImportMessage::ImageChunk {
                node_id,
                chunk_index,
                data,
                total_chunks,
            }) => {
                assert_eq!(node_id, "img");
                assert_eq!(chunk_index, 1);
                assert_eq!(total_chunks, 2);
                assert_eq!(data.as_bytes(), &[0, 1, 2]);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn chunk_data_accepts_byte_arrays_and_indexed_objects() {
        let array: ChunkData = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(array.as_bytes(), &[1, 2, 3]);
        let indexed: ChunkData = serde_json::from_str(r#"{"1":9,"0":8,"10":7}"#).unwrap();
        assert_eq!(indexed.as_bytes(), &[8, 9, 7]);
        let data_url: ChunkData = serde_json::from_str(r#""data:image/png;base64,AAEC""#).unwrap();
        assert_eq!(data_url.as_bytes(), &[0, 1, 2]);
    }

    #[test]
    fn node_messages_compare_by_content() {
        let a = InboundMessage::from_json(
            r##"{"type":"NODES","nodes":[{"id":"a","type":"FRAME","styles":{"color":"#000"},
                "pseudoElements":[{"id":"a::before","type":"TEXT","text":"*"}]}]}"##,
        )
        .unwrap();
        let b = InboundMessage::from_json(
            r##"{"nodes":[{"pseudoElements":[{"text":"*","type":"TEXT","id":"a::before"}],
                "styles":{"color":"#000"},"type":"FRAME","id":"a"}],"type":"NODES"}"##,
        )
        .unwrap();
        assert_eq!(a, b);

        let page = |id: &str| LegacyPage {
            nodes: vec![serde_json::from_value(serde_json::json!({"id": id, "type": "FRAME"})).unwrap()],
            ..LegacyPage::default()
        };
        assert_ne!(page("x"), page("y"));
    }

    #[test]
    fn legacy_dialect_is_detected_from_lowercase_tag() {
        let msg = InboundMessage::from_json(
            r#"{"type":"node_chunk","nodes":[],"chunkIndex":0,"totalChunks":1}"#,
        )
        .unwrap();
        assert_eq!(msg.kind(), "node_chunk");
        let msg = InboundMessage::from_json(r#"{"type":"complete"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::Legacy(LegacyMessage::Complete {})));
    }

    #[test]
    fn fonts_message_reads_font_faces() {
        let msg: ImportMessage = serde_json::from_str(
            r#"{"type":"FONTS","fonts":[{"family":"Inter","weight":700}],
                "fontFaces":[{"family":"Roboto","style":"italic"}]}"#,
        )
        .unwrap();
        match msg {
            ImportMessage::Fonts { fonts, font_faces } => {
                assert_eq!(fonts[0].weight, Some(StyleValue::Number(700.0)));
                assert_eq!(font_faces[0].style.as_deref(), Some("italic"));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn stats_merge_keeps_max_depth() {
        let mut total = StatsSnapshot {
            created: 2,
            max_depth: 4,
            ..Default::default()
        };
        total.merge(&StatsSnapshot {
            created: 3,
            max_depth: 2,
            batches: 1,
            ..Default::default()
        });
        assert_eq!(total.created, 5);
        assert_eq!(total.max_depth, 4);
        assert_eq!(total.batches, 1);
    }
}

//! Intermediate representation for page imports.
//!
//! A browser-side extraction agent flattens a rendered page into [`IrNode`]s
//! and streams them to the importer as [`InboundMessage`]s. This crate only
//! describes that wire model; it performs no mapping or host calls.

#![allow(clippy::all)]

pub mod message;
pub mod node;
pub mod style;

pub use message::{
    ChunkData, DesignTokens, FontRequest, ImportEvent, ImportMessage, InboundMessage,
    LegacyMessage, LegacyPage, StatsSnapshot,
};
pub use node::{
    Compositing, ImageChunkRef, ImagePayload, IrBatch, IrNode, NodeId, NodeKind, Payload, Rect,
};
pub use style::{CssProperty, StyleValue, Styles};

//! Import pipeline: IR messages in, design-tool nodes out.
//!
//! The [`Importer`] owns one [`ImportSession`] and talks to the target tool
//! only through the capabilities in [`host`]. Hierarchy assembly, paint
//! order and chunk reassembly are host independent and usable on their own.

#![allow(clippy::all)]

pub mod assembler;
pub mod chunks;
pub mod error;
pub mod fonts;
pub mod host;
pub mod importer;
pub mod materialize;
pub mod paint_order;
pub mod session;
pub mod settings;
pub mod stacking;
pub mod tokens;

#[cfg(test)]
mod testing;

pub use strata_ir::StatsSnapshot as ImportStats;

pub use assembler::{CreatedIndex, HierarchyAssembler, NodeCreator, ParentSlot};
pub use chunks::StreamingChunkReassembler;
pub use error::{HostError, ImportError, Result};
pub use fonts::FontCache;
pub use host::{
    FontLoader, FontName, Host, ImageDecoder, ImageFetcher, ImageHandle, NodeFactory, NodeSpec,
    StatusSink, TargetId, TargetKind, TextContent, VariableId, VariableStore, VariableValue,
};
pub use importer::Importer;
pub use materialize::Materializer;
pub use paint_order::PaintOrder;
pub use session::ImportSession;
pub use settings::ImportSettings;
pub use stacking::{ContextId, StackingTree};

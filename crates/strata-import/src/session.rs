//! Mutable state of one import session.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use strata_ir::{IrNode, NodeId};

use crate::ImportStats;
use crate::assembler::CreatedIndex;
use crate::chunks::StreamingChunkReassembler;
use crate::fonts::FontCache;
use crate::host::VariableId;

/// A streamed image waiting for its bytes.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub node: IrNode,
    pub since: Instant,
}

/// Everything that survives from one message to the next. Nothing here is
/// shared between sessions: [`reset`](Self::reset) starts over.
#[derive(Debug)]
pub struct ImportSession {
    pub created: CreatedIndex,
    pub chunks: StreamingChunkReassembler,
    pub fonts: FontCache,
    pub variables: HashMap<String, VariableId>,
    /// Keyed by node id; ordered so forced placeholders come out stable.
    pub pending_images: BTreeMap<NodeId, PendingImage>,
    pub stats: ImportStats,
    pub completed: bool,
}

impl ImportSession {
    pub fn new(chunk_timeout: Duration) -> Self {
        Self {
            created: CreatedIndex::default(),
            chunks: StreamingChunkReassembler::new(chunk_timeout),
            fonts: FontCache::new(),
            variables: HashMap::new(),
            pending_images: BTreeMap::new(),
            stats: ImportStats::default(),
            completed: false,
        }
    }

    pub fn reset(&mut self) {
        self.created.clear();
        self.chunks.clear();
        self.fonts.clear();
        self.variables.clear();
        self.pending_images.clear();
        self.stats = ImportStats::default();
        self.completed = false;
    }

    /// Streamed images still missing bytes.
    pub fn has_pending_images(&self) -> bool {
        !self.pending_images.is_empty()
    }
}

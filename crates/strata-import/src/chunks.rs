//! Reassembly of image bytes streamed as `IMAGE_CHUNK` messages.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ImportError, Result};

pub const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct ChunkBuffer {
    total: u32,
    chunks: BTreeMap<u32, Vec<u8>>,
    created_at: Instant,
}

impl ChunkBuffer {
    fn is_complete(&self) -> bool {
        self.chunks.len() == self.total as usize
    }
}

/// One buffer per image id. A buffer leaves the table either through a
/// successful [`assemble`](Self::assemble) or through timeout eviction;
/// partial data is never handed out.
#[derive(Debug)]
pub struct StreamingChunkReassembler {
    buffers: HashMap<String, ChunkBuffer>,
    timeout: Duration,
}

impl Default for StreamingChunkReassembler {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_TIMEOUT)
    }
}

impl StreamingChunkReassembler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            buffers: HashMap::new(),
            timeout,
        }
    }

    /// Stores one chunk. Returns `false` when this index was already held,
    /// in which case nothing changes.
    pub fn add_chunk(&mut self, id: &str, index: u32, bytes: Vec<u8>, total: u32) -> Result<bool> {
        self.add_chunk_at(id, index, bytes, total, Instant::now())
    }

    pub fn add_chunk_at(
        &mut self,
        id: &str,
        index: u32,
        bytes: Vec<u8>,
        total: u32,
        now: Instant,
    ) -> Result<bool> {
        let invalid = || ImportError::InvalidChunk {
            node_id: id.to_string(),
            index,
            total,
        };
        if total == 0 || index >= total {
            return Err(invalid());
        }
        let buffer = self
            .buffers
            .entry(id.to_string())
            .or_insert_with(|| ChunkBuffer {
                total,
                chunks: BTreeMap::new(),
                created_at: now,
            });
        if buffer.total != total {
            warn!(id, expected = buffer.total, got = total, "chunk total changed mid-transfer");
            return Err(invalid());
        }
        if buffer.chunks.contains_key(&index) {
            debug!(id, index, "duplicate chunk ignored");
            return Ok(false);
        }
        buffer.chunks.insert(index, bytes);
        Ok(true)
    }

    pub fn is_complete(&self, id: &str) -> bool {
        self.buffers.get(id).is_some_and(ChunkBuffer::is_complete)
    }

    /// Concatenates chunks `0..total` and drops the buffer. Returns `None`
    /// (and keeps the buffer) while any index is missing.
    pub fn assemble(&mut self, id: &str) -> Option<Vec<u8>> {
        if !self.is_complete(id) {
            return None;
        }
        let buffer = self.buffers.remove(id)?;
        let size = buffer.chunks.values().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(size);
        for chunk in buffer.chunks.into_values() {
            bytes.extend_from_slice(&chunk);
        }
        Some(bytes)
    }

    /// Evicts buffers older than the timeout and returns their ids.
    pub fn cleanup_timed_out(&mut self) -> Vec<String> {
        self.cleanup_timed_out_at(Instant::now())
    }

    pub fn cleanup_timed_out_at(&mut self, now: Instant) -> Vec<String> {
        let timeout = self.timeout;
        let mut expired: Vec<String> = self
            .buffers
            .iter()
            .filter(|(_, buffer)| now.saturating_duration_since(buffer.created_at) > timeout)
            .map(|(id, _)| id.clone())
            .collect();
        expired.sort();
        for id in &expired {
            if let Some(buffer) = self.buffers.remove(id) {
                warn!(
                    id = %id,
                    received = buffer.chunks.len(),
                    total = buffer.total,
                    "image transfer timed out"
                );
            }
        }
        expired
    }

    /// Removes a buffer without assembling it.
    pub fn discard(&mut self, id: &str) -> bool {
        self.buffers.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.buffers.contains_key(id)
    }

    /// `(received, total)` for an in-flight transfer.
    pub fn progress(&self, id: &str) -> Option<(u32, u32)> {
        self.buffers
            .get(id)
            .map(|b| (b.chunks.len() as u32, b.total))
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

//! Decoded images, addressed by the sha256 of their bytes.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use strata_import::{HostError, ImageHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ImageStore {
    images: BTreeMap<String, ImageInfo>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

impl ImageStore {
    /// Decodes `bytes` (PNG, JPEG, GIF or WebP). Identical bytes share a
    /// handle and are decoded once.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<ImageHandle, HostError> {
        let hash = sha256_hex(bytes);
        if self.images.contains_key(&hash) {
            return Ok(ImageHandle(hash));
        }
        let image = image::load_from_memory(bytes).map_err(|err| HostError::Decode(err.to_string()))?;
        self.images.insert(
            hash.clone(),
            ImageInfo {
                width: image.width(),
                height: image.height(),
                bytes: bytes.len(),
            },
        );
        Ok(ImageHandle(hash))
    }

    pub fn get(&self, handle: &str) -> Option<&ImageInfo> {
        self.images.get(handle)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ImageInfo)> {
        self.images.iter()
    }
}

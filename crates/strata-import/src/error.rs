//! Error types for the import pipeline.

use thiserror::Error;

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

/// Failures reported by the design-tool host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    /// The host refused to create or append a node.
    #[error("node creation failed: {0}")]
    NodeCreation(String),

    /// The requested font is not installed.
    #[error("font not available: {family} {style}")]
    FontNotFound { family: String, style: String },

    /// Image bytes could not be decoded.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Proxied fetch failed.
    #[error("fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    /// Variable could not be created.
    #[error("variable {name} rejected: {reason}")]
    Variable { name: String, reason: String },
}

/// Errors that can occur while importing.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Every step of the font fallback chain failed.
    #[error("no usable font for {family} {style}, default font included")]
    FontUnavailable { family: String, style: String },

    /// Chunk index or total out of range, or inconsistent with earlier chunks.
    #[error("invalid chunk {index}/{total} for image {node_id}")]
    InvalidChunk {
        node_id: String,
        index: u32,
        total: u32,
    },

    /// Inbound message did not parse.
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    /// Host capability call failed.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Image bytes for a node could not be decoded.
    #[error("image for node {node_id} could not be decoded: {reason}")]
    ImageDecode { node_id: String, reason: String },

    /// Remote image could not be fetched.
    #[error("image fetch failed for {url}: {reason}")]
    ImageFetch { url: String, reason: String },

    /// Import settings are unusable.
    #[error("invalid import settings: {0}")]
    Config(String),
}

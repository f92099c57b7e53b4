//! Streaming session errors.

use thiserror::Error;

use crate::decode::DecodeError;
use crate::loading::FetchError;
use crate::sector::MetadataError;

/// Errors that prevent a streaming session from starting.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to fetch scene: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid scene metadata: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Unsupported scene format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Scene has no sectors")]
    EmptyScene,

    #[error("Failed to bootstrap decoders: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to start decode workers: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

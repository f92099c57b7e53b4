//! Fetch and load errors.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::decode::DecodeError;
use crate::sector::SectorId;

/// Errors returned by fetch delegates.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The sector id is not part of the scene metadata.
    #[error("{0} is not part of the scene")]
    UnknownSector(SectorId),

    /// The sector has no simple (faces) file.
    #[error("{0} has no simple geometry")]
    NoSimpleGeometry(SectorId),

    /// Reading a local file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The HTTP request could not be completed.
    #[error("Request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Arc<reqwest::Error>,
    },

    /// The server answered with a non-success status.
    #[error("Request for {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The source is temporarily unable to serve the resource.
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Create an [`FetchError::Io`] for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Returns true if retrying cannot change the outcome.
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::UnknownSector(_) | Self::NoSimpleGeometry(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            Self::Status { status, .. } => (400..500).contains(status) && *status != 408 && *status != 429,
            Self::Http { .. } | Self::Unavailable(_) => false,
        }
    }
}

/// Why a load request was rejected.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),
}

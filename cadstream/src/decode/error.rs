//! Decode errors.

use thiserror::Error;

use crate::sector::SectorId;

/// Errors produced by the decode stage.
///
/// Cloneable so that one failed geometry file can be reported to every
/// sector that shares it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Bytes could not be parsed.
    #[error("Malformed {what}: {message}")]
    Malformed { what: &'static str, message: String },

    /// A required field is absent, e.g. a palette entry for a tree index.
    #[error("Missing {field} in {what}")]
    MissingField { what: &'static str, field: String },

    /// Decoded geometry is inconsistent (index out of range and so on).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Simple geometry buffer does not hold a whole number of instances.
    #[error("Quad buffer of {len} floats is not a multiple of the {stride}-float stride")]
    InvalidQuadBuffer { len: usize, stride: usize },

    /// The native decoder panicked while handling this job.
    #[error("Decode worker panicked: {0}")]
    WorkerPanicked(String),

    /// The pool was shut down before the job completed.
    #[error("Decode pool has shut down")]
    PoolShutdown,

    /// Error attributed to one sector.
    #[error("{sector}: {source}")]
    Sector {
        sector: SectorId,
        #[source]
        source: Box<DecodeError>,
    },

    /// Error attributed to one shared geometry file.
    #[error("geometry file {file_id}: {source}")]
    GeometryFile {
        file_id: u64,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Shorthand for [`DecodeError::Malformed`].
    pub fn malformed(what: &'static str, message: impl ToString) -> Self {
        Self::Malformed {
            what,
            message: message.to_string(),
        }
    }

    /// Attach a sector id, unless one is already attached.
    pub fn for_sector(self, sector: SectorId) -> Self {
        match self {
            Self::Sector { .. } => self,
            other => Self::Sector {
                sector,
                source: Box::new(other),
            },
        }
    }

    /// Attach a geometry file id, unless one is already attached.
    pub fn for_geometry_file(self, file_id: u64) -> Self {
        match self {
            Self::GeometryFile { .. } => self,
            other => Self::GeometryFile {
                file_id,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with id attributions removed.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            Self::Sector { source, .. } | Self::GeometryFile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

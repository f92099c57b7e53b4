//! The native decode capability.
//!
//! Binary parsing lives behind [`NativeDecoder`]. Implementations are plain
//! synchronous functions of their inputs; the pool runs them on dedicated
//! worker threads and never lets their representation leak past the
//! payload types in [`super::types`].

use super::{DecodeError, GeometryFile, SectorPrimitives};

/// Synchronous decoder executed on decode worker threads.
pub trait NativeDecoder: Send + Sync + 'static {
    /// Shared immutable state derived from the root sector, e.g. a color
    /// palette. Every worker holds a reference to it.
    type Context: Send + Sync + 'static;

    /// Derive the decode context from the root sector's bytes.
    fn decode_root(&self, bytes: &[u8]) -> Result<Self::Context, DecodeError>;

    /// Decode a detailed sector into raw primitive arrays.
    fn decode_sector(&self, context: &Self::Context, bytes: &[u8]) -> Result<SectorPrimitives, DecodeError>;

    /// Decode a shared geometry file.
    fn decode_geometry_file(&self, bytes: &[u8]) -> Result<GeometryFile, DecodeError>;

    /// Decode a simple sector into a packed quad buffer.
    fn decode_quads(&self, context: &Self::Context, bytes: &[u8]) -> Result<Vec<f32>, DecodeError>;
}

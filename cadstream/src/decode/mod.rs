//! Sector decoding on a pool of worker threads.
//!
//! Parsing of sector and geometry files is CPU-bound and synchronous, so it
//! runs on dedicated OS threads rather than the async runtime. The pool is
//! primed with a context derived from the root sector before any other
//! sector is decoded.
//!
//! # Architecture
//!
//! ```text
//! SectorLoadCoordinator ──► DetailedSectorDecoder ──┐
//!                       └─► SimpleSectorDecoder ────┼──► DecodePool ──► NativeDecoder
//!                                                   │        ▲
//!                               GeometryCache ◄─────┘        │
//!                                  (moka)             primed context
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cadstream::decode::{BincodeDecoder, DecodePool, DecodePoolConfig};
//!
//! let pool = DecodePool::new(BincodeDecoder, DecodePoolConfig::default())?;
//! let context = pool.decode_root(root_bytes).await?;
//! pool.prime(context).await?;
//! let primitives = pool.decode_sector(sector_bytes).await?;
//! ```

pub mod codec;
mod error;
mod geometry_cache;
mod merge;
mod pool;
mod sector_decoders;
mod traits;
mod types;
mod worker;

pub use codec::{BincodeDecoder, ColorPalette};
pub use error::DecodeError;
pub use geometry_cache::{GeometryCache, DEFAULT_GEOMETRY_CACHE_MB};
pub use merge::{group_by_file, group_instances, paint_mesh};
pub use pool::{DecodePool, DecodePoolConfig, AUTO_WORKER_COUNT};
pub use sector_decoders::{DetailedSectorDecoder, SimpleSectorDecoder};
pub use traits::NativeDecoder;
pub use types::{
    GeometryFile, InstancedMesh, InstancedMeshFile, InstancedMeshPrimitive, SectorGeometry, SectorPrimitives,
    SectorQuads, TriangleMesh, TriangleMeshPrimitive, QUAD_STRIDE,
};

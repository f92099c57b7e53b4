//! Collaborator interfaces consumed by load requests and coordinators.
//!
//! Fetch and decode are asynchronous and fallible; consume and discard are
//! synchronous callbacks into whatever integrates sectors into the scene.
//! All traits are dyn-compatible so coordinators can hold `Arc<dyn ...>`.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::decode::DecodeError;
use crate::sector::SectorId;

use super::{FetchError, LoadSectorRequest};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Retrieves raw sector bytes. Not abortable once started.
pub trait SectorFetcher: Send + Sync {
    fn fetch_sector(&self, id: SectorId) -> BoxFuture<'_, Result<Bytes, FetchError>>;
}

/// Retrieves raw bytes of a shared geometry file.
pub trait GeometryFetcher: Send + Sync {
    fn fetch_geometry_file(&self, file_id: u64) -> BoxFuture<'_, Result<Bytes, FetchError>>;
}

/// Turns raw sector bytes into a payload of type `P`.
pub trait SectorDecoder<P>: Send + Sync {
    fn decode_sector(&self, id: SectorId, bytes: Bytes) -> BoxFuture<'_, Result<P, DecodeError>>;
}

/// Receives loaded sectors and notifications about unwanted ones.
///
/// Both methods are called while the coordinator holds its tracking lock and
/// must not call back into the coordinator.
pub trait SectorSink<P>: Send + Sync {
    /// Called exactly once per successful load.
    fn consume(&self, id: SectorId, payload: P);

    /// Called when a sector stops being wanted. `request` is the in-flight
    /// request if the sector had not finished loading, `None` if it was
    /// active.
    fn discard(&self, id: SectorId, request: Option<&LoadSectorRequest>);
}

//! Sector load requests and the coordinator that drives them.
//!
//! One [`SectorLoadCoordinator`] exists per quality level. Each reconciles
//! the ids the classifier wants against its own `active` and `in_flight`
//! sets, spawning a [`LoadSectorRequest`] per newly wanted sector and
//! discarding sectors that are no longer wanted.
//!
//! # Example
//!
//! ```ignore
//! use cadstream::loading::SectorLoadCoordinator;
//!
//! let coordinator = SectorLoadCoordinator::new(Quality::Detailed, fetcher, decoder, sink);
//! coordinator.update(&wanted.detailed);
//! coordinator.wait_until_settled().await;
//! ```

mod coordinator;
mod delegates;
mod error;
mod request;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{SectorLoadCoordinator, DEFAULT_MAX_CONCURRENT_FETCHES};
pub use delegates::{BoxFuture, GeometryFetcher, SectorDecoder, SectorFetcher, SectorSink};
pub use error::{FetchError, LoadError};
pub use request::{LoadSectorRequest, RequestStatus, Settlement};
pub use state::LoadingState;

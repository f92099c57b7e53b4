//! Per-sector load request.
//!
//! A request runs `fetch → decode → settle` on its own Tokio task. The handle
//! exposes the current [`RequestStatus`] and a cooperative cancel flag.
//!
//! ```text
//!  Awaiting ──► InFlight ──► fetch ──► decode ──► settle ──► Resolved
//!     │            │           │          │          │
//!     └────────────┴───────────┴──────────┴──────────┴──► Cancelled
//!                              └──────────┴──────────────► Failed
//! ```
//!
//! Cancellation is sampled at three checkpoints: before the fetch, after the
//! fetch and after the decode. A fetch that has started always runs to
//! completion; its result is dropped if cancellation was observed. Once
//! cancellation has been observed neither decode nor settle is invoked.
//!
//! Requests created with [`LoadSectorRequest::spawn_limited`] queue for a
//! fetch slot after the first checkpoint and hold it until the fetch returns.
//! A request cancelled while queued leaves the queue without fetching.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::sector::SectorId;

use super::{LoadError, SectorDecoder, SectorFetcher};

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    /// Created, pipeline not yet running.
    Awaiting,
    /// Fetch or decode in progress.
    InFlight,
    /// Cancellation was observed; the payload was never handed over.
    Cancelled,
    /// The payload was decoded and accepted.
    Resolved,
    /// Fetch or decode failed.
    Failed,
}

impl RequestStatus {
    /// Returns true for `Cancelled`, `Resolved` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Resolved | Self::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Awaiting => "awaiting",
            Self::InFlight => "in-flight",
            Self::Cancelled => "cancelled",
            Self::Resolved => "resolved",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Passed to the settle callback of a request that got through all three
/// checkpoints.
pub struct Settlement<'a> {
    sequence: u64,
    status: &'a watch::Sender<RequestStatus>,
}

impl Settlement<'_> {
    /// Sequence number of the settling request.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Publish `Resolved` now, so the status is already visible while the
    /// payload is handed to a sink.
    pub fn resolve(&self) {
        publish(self.status, RequestStatus::Resolved);
    }
}

/// Handle to one sector's in-flight load.
///
/// Clones share the same request.
#[derive(Debug, Clone)]
pub struct LoadSectorRequest {
    id: SectorId,
    sequence: u64,
    cancellation: CancellationToken,
    status: watch::Receiver<RequestStatus>,
}

impl LoadSectorRequest {
    /// Start loading `id` on a new task, fetching without a concurrency cap.
    ///
    /// `on_settled` receives a [`Settlement`] and the outcome once fetch and
    /// decode are done, unless cancellation was observed first. It returns
    /// whether the outcome was taken; `false` means the request is no longer
    /// wanted and it ends as `Cancelled`. A callback taking a successful
    /// outcome should call [`Settlement::resolve`] before passing the payload
    /// on; otherwise `Resolved` is published when the callback returns.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<P, F>(
        id: SectorId,
        fetcher: Arc<dyn SectorFetcher>,
        decoder: Arc<dyn SectorDecoder<P>>,
        on_settled: F,
    ) -> Self
    where
        P: Send + 'static,
        F: FnOnce(Settlement<'_>, Result<P, LoadError>) -> bool + Send + 'static,
    {
        Self::start(id, fetcher, decoder, None, on_settled)
    }

    /// Like [`spawn`](Self::spawn), but the fetch runs only while holding a
    /// permit from `fetch_slots`.
    pub fn spawn_limited<P, F>(
        id: SectorId,
        fetcher: Arc<dyn SectorFetcher>,
        decoder: Arc<dyn SectorDecoder<P>>,
        fetch_slots: Arc<Semaphore>,
        on_settled: F,
    ) -> Self
    where
        P: Send + 'static,
        F: FnOnce(Settlement<'_>, Result<P, LoadError>) -> bool + Send + 'static,
    {
        Self::start(id, fetcher, decoder, Some(fetch_slots), on_settled)
    }

    fn start<P, F>(
        id: SectorId,
        fetcher: Arc<dyn SectorFetcher>,
        decoder: Arc<dyn SectorDecoder<P>>,
        fetch_slots: Option<Arc<Semaphore>>,
        on_settled: F,
    ) -> Self
    where
        P: Send + 'static,
        F: FnOnce(Settlement<'_>, Result<P, LoadError>) -> bool + Send + 'static,
    {
        let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let cancellation = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(RequestStatus::Awaiting);

        let token = cancellation.clone();
        tokio::spawn(async move {
            if token.is_cancelled() {
                return finish_cancelled(&status_tx, id, "before fetch");
            }

            let permit = match fetch_slots {
                Some(slots) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return finish_cancelled(&status_tx, id, "waiting for fetch slot");
                    }
                    permit = slots.acquire_owned() => permit.ok(),
                },
                None => None,
            };
            publish(&status_tx, RequestStatus::InFlight);

            let fetched = fetcher.fetch_sector(id).await;
            drop(permit);
            if token.is_cancelled() {
                return finish_cancelled(&status_tx, id, "after fetch");
            }

            let outcome = match fetched {
                Ok(bytes) => {
                    let decoded = decoder.decode_sector(id, bytes).await;
                    if token.is_cancelled() {
                        return finish_cancelled(&status_tx, id, "after decode");
                    }
                    decoded.map_err(LoadError::from)
                }
                Err(e) => Err(e.into()),
            };

            let succeeded = outcome.is_ok();
            let settlement = Settlement {
                sequence,
                status: &status_tx,
            };
            let status = if !on_settled(settlement, outcome) {
                RequestStatus::Cancelled
            } else if succeeded {
                RequestStatus::Resolved
            } else {
                RequestStatus::Failed
            };
            debug!(sector_id = id.value(), sequence, status = %status, "Load request settled");
            publish(&status_tx, status);
        });

        Self {
            id,
            sequence,
            cancellation,
            status: status_rx,
        }
    }

    /// Sector being loaded.
    pub fn id(&self) -> SectorId {
        self.id
    }

    /// Process-wide unique, increasing sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Current status.
    pub fn status(&self) -> RequestStatus {
        *self.status.borrow()
    }

    /// Request cancellation. Idempotent; takes effect at the next checkpoint.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns true once `cancel` has been called.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Wait until the request reaches a terminal status.
    ///
    /// If the task ended without settling (for instance because the runtime
    /// shut down) the last published status is returned.
    pub async fn finished(&self) -> RequestStatus {
        let mut rx = self.status.clone();
        let settled = rx.wait_for(RequestStatus::is_terminal).await.map(|status| *status);
        settled.unwrap_or_else(|_| *rx.borrow())
    }
}

/// Publish a status unless a terminal one was already published.
fn publish(tx: &watch::Sender<RequestStatus>, status: RequestStatus) {
    tx.send_if_modified(|current| {
        if current.is_terminal() {
            false
        } else {
            *current = status;
            true
        }
    });
}

fn finish_cancelled(tx: &watch::Sender<RequestStatus>, id: SectorId, checkpoint: &'static str) {
    debug!(sector_id = id.value(), checkpoint, "Load request cancelled");
    publish(tx, RequestStatus::Cancelled);
}

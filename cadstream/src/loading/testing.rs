//! Controllable delegates for load request and coordinator tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::decode::DecodeError;
use crate::sector::SectorId;

use super::{BoxFuture, FetchError, LoadSectorRequest, SectorDecoder, SectorFetcher, SectorSink};

/// Upper bound for any single wait in async tests.
pub(crate) const WAIT: Duration = Duration::from_secs(5);

/// Gate that holds callers until opened.
struct Gate {
    open: watch::Sender<bool>,
    calls: watch::Sender<usize>,
}

impl Gate {
    fn new(open: bool) -> Self {
        Self {
            open: watch::channel(open).0,
            calls: watch::channel(0).0,
        }
    }

    async fn pass(&self) {
        self.calls.send_modify(|calls| *calls += 1);
        let mut open = self.open.subscribe();
        let _ = open.wait_for(|open| *open).await;
    }

    fn release(&self) {
        self.open.send_replace(true);
    }

    fn calls(&self) -> usize {
        *self.calls.borrow()
    }

    async fn wait_calls(&self, count: usize) {
        let mut calls = self.calls.subscribe();
        let _ = calls.wait_for(|calls| *calls >= count).await;
    }
}

/// Fetcher returning `sector-{id}` once its gate is open.
pub(crate) struct GatedFetcher {
    gate: Gate,
    failing: Mutex<HashSet<SectorId>>,
    fail_all: bool,
    fetched: Mutex<Vec<SectorId>>,
}

impl GatedFetcher {
    fn with(open: bool, fail_all: bool) -> Self {
        Self {
            gate: Gate::new(open),
            failing: Mutex::new(HashSet::new()),
            fail_all,
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn open() -> Self {
        Self::with(true, false)
    }

    pub(crate) fn closed() -> Self {
        Self::with(false, false)
    }

    pub(crate) fn failing() -> Self {
        Self::with(true, true)
    }

    pub(crate) fn fail_sector(&self, id: SectorId) {
        self.failing.lock().insert(id);
    }

    pub(crate) fn heal_sector(&self, id: SectorId) {
        self.failing.lock().remove(&id);
    }

    pub(crate) fn release(&self) {
        self.gate.release();
    }

    pub(crate) fn calls(&self) -> usize {
        self.gate.calls()
    }

    pub(crate) fn fetched(&self) -> Vec<SectorId> {
        self.fetched.lock().clone()
    }

    pub(crate) async fn wait_started(&self) {
        self.gate.wait_calls(1).await;
    }

    pub(crate) async fn wait_calls(&self, count: usize) {
        self.gate.wait_calls(count).await;
    }
}

impl SectorFetcher for GatedFetcher {
    fn fetch_sector(&self, id: SectorId) -> BoxFuture<'_, Result<Bytes, FetchError>> {
        Box::pin(async move {
            self.fetched.lock().push(id);
            self.gate.pass().await;
            if self.fail_all || self.failing.lock().contains(&id) {
                return Err(FetchError::Unavailable(format!("{} offline", id)));
            }
            Ok(Bytes::from(format!("sector-{}", id.value())))
        })
    }
}

/// Decoder turning the fetched bytes into a `String` once its gate is open.
pub(crate) struct GatedDecoder {
    gate: Gate,
}

impl GatedDecoder {
    pub(crate) fn open() -> Self {
        Self { gate: Gate::new(true) }
    }

    pub(crate) fn closed() -> Self {
        Self { gate: Gate::new(false) }
    }

    pub(crate) fn release(&self) {
        self.gate.release();
    }

    pub(crate) fn calls(&self) -> usize {
        self.gate.calls()
    }

    pub(crate) async fn wait_started(&self) {
        self.gate.wait_calls(1).await;
    }

    pub(crate) fn handle(self: &Arc<Self>) -> Arc<dyn SectorDecoder<String>> {
        self.clone()
    }
}

impl SectorDecoder<String> for GatedDecoder {
    fn decode_sector(&self, id: SectorId, bytes: Bytes) -> BoxFuture<'_, Result<String, DecodeError>> {
        Box::pin(async move {
            self.gate.pass().await;
            String::from_utf8(bytes.to_vec())
                .map_err(|e| DecodeError::malformed("test sector", e).for_sector(id))
        })
    }
}

/// Sink recording every callback.
#[derive(Default)]
pub(crate) struct RecordingSink {
    consumed: Mutex<Vec<(SectorId, String)>>,
    discarded: Mutex<Vec<(SectorId, Option<u64>)>>,
}

impl RecordingSink {
    pub(crate) fn consumed_ids(&self) -> Vec<SectorId> {
        self.consumed.lock().iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn consumed(&self) -> Vec<(SectorId, String)> {
        self.consumed.lock().clone()
    }

    /// Discarded ids with the sequence number of the in-flight request, if any.
    pub(crate) fn discarded(&self) -> Vec<(SectorId, Option<u64>)> {
        self.discarded.lock().clone()
    }
}

impl SectorSink<String> for RecordingSink {
    fn consume(&self, id: SectorId, payload: String) {
        self.consumed.lock().push((id, payload));
    }

    fn discard(&self, id: SectorId, request: Option<&LoadSectorRequest>) {
        self.discarded.lock().push((id, request.map(LoadSectorRequest::sequence)));
    }
}

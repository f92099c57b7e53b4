//! Reconciles wanted sector sets with active and in-flight loads.
//!
//! # Architecture
//!
//! ```text
//!                 wanted ids
//!                     │
//!        ┌────────────▼─────────────┐
//!        │  SectorLoadCoordinator   │   tracked = active ∪ in_flight
//!        │                          │   start   = wanted − tracked
//!        │  active    in_flight     │   stop    = tracked − wanted
//!        └──┬────────────┬──────────┘
//!   discard │            │ spawn LoadSectorRequest
//!           ▼            ▼
//!      SectorSink    fetch ─► decode ─► settle ─► consume, move to active
//! ```
//!
//! The whole diff runs under one lock, so an update always finishes its
//! bookkeeping before another update or a settling request can observe the
//! tracking state. A sector id is in at most one of `active` and `in_flight`.
//!
//! There is no retry policy here: a failed load just leaves the id
//! untracked, and the next update that still wants it starts over.
//!
//! Fetches are capped by a semaphore of fetch slots, which may be shared
//! between coordinators. Requests discarded while queued for a slot give it
//! up without fetching, so a new wanted set never waits behind stale ones.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, trace, warn};

use crate::culling::Quality;
use crate::sector::{difference, union, SectorId, SectorIdSet};
use crate::telemetry::StreamingMetrics;

use super::{
    LoadError, LoadSectorRequest, LoadingState, SectorDecoder, SectorFetcher, SectorSink,
};

/// Default number of sector fetches allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 50;

#[derive(Debug, Default)]
struct Tracking {
    active: SectorIdSet,
    in_flight: BTreeMap<SectorId, LoadSectorRequest>,
    batch: usize,
}

impl Tracking {
    fn loading_state(&self) -> LoadingState {
        LoadingState::from_batch(self.batch, self.in_flight.len())
    }
}

/// Drives loads for one quality level.
pub struct SectorLoadCoordinator<P> {
    quality: Quality,
    fetcher: Arc<dyn SectorFetcher>,
    decoder: Arc<dyn SectorDecoder<P>>,
    sink: Arc<dyn SectorSink<P>>,
    metrics: Arc<StreamingMetrics>,
    fetch_slots: Arc<Semaphore>,
    tracking: Arc<Mutex<Tracking>>,
    loading: Arc<watch::Sender<LoadingState>>,
}

impl<P: Send + 'static> SectorLoadCoordinator<P> {
    pub fn new(
        quality: Quality,
        fetcher: Arc<dyn SectorFetcher>,
        decoder: Arc<dyn SectorDecoder<P>>,
        sink: Arc<dyn SectorSink<P>>,
    ) -> Self {
        Self {
            quality,
            fetcher,
            decoder,
            sink,
            metrics: Arc::new(StreamingMetrics::new()),
            fetch_slots: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_FETCHES)),
            tracking: Arc::new(Mutex::new(Tracking::default())),
            loading: Arc::new(watch::channel(LoadingState::default()).0),
        }
    }

    /// Share a metrics instance with other components.
    pub fn with_metrics(mut self, metrics: Arc<StreamingMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Allow at most `limit` fetches at once (at least one).
    pub fn with_max_concurrent_fetches(self, limit: usize) -> Self {
        self.with_fetch_slots(Arc::new(Semaphore::new(limit.max(1))))
    }

    /// Draw fetch slots from a semaphore shared with other coordinators.
    pub fn with_fetch_slots(mut self, slots: Arc<Semaphore>) -> Self {
        self.fetch_slots = slots;
        self
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Reconcile tracking state with the wanted ids.
    ///
    /// Unwanted in-flight sectors are discarded with their request and then
    /// cancelled; unwanted active sectors are discarded without one. Newly
    /// wanted sectors get a fresh load request each. Must be called from
    /// within a Tokio runtime.
    pub fn update(&self, wanted: &SectorIdSet) {
        let mut tracking = self.tracking.lock();

        let in_flight: SectorIdSet = tracking.in_flight.keys().copied().collect();
        let tracked = union(&tracking.active, &in_flight);
        let to_start = difference(wanted, &tracked);
        let to_stop = difference(&tracked, wanted);

        for id in &to_stop {
            if let Some(request) = tracking.in_flight.remove(id) {
                self.sink.discard(*id, Some(&request));
                request.cancel();
                self.metrics.request_cancelled();
                trace!(sector_id = id.value(), quality = %self.quality, "Cancelled in-flight sector");
            } else if tracking.active.remove(id) {
                self.sink.discard(*id, None);
                trace!(sector_id = id.value(), quality = %self.quality, "Discarded active sector");
            }
            self.metrics.request_discarded();
        }

        for id in &to_start {
            let request = self.start(*id);
            tracking.in_flight.insert(*id, request);
        }

        tracking.batch = tracking.in_flight.len();
        if !to_start.is_empty() || !to_stop.is_empty() {
            debug!(
                quality = %self.quality,
                started = to_start.len(),
                stopped = to_stop.len(),
                active = tracking.active.len(),
                in_flight = tracking.in_flight.len(),
                "Sector update"
            );
        }
        self.loading.send_replace(tracking.loading_state());
    }

    /// Discard everything this coordinator tracks.
    pub fn clear(&self) {
        self.update(&SectorIdSet::new());
    }

    fn start(&self, id: SectorId) -> LoadSectorRequest {
        self.metrics.request_started();

        let quality = self.quality;
        let tracking = self.tracking.clone();
        let loading = self.loading.clone();
        let sink = self.sink.clone();
        let metrics = self.metrics.clone();

        LoadSectorRequest::spawn_limited(
            id,
            self.fetcher.clone(),
            self.decoder.clone(),
            self.fetch_slots.clone(),
            move |settlement, outcome: Result<P, LoadError>| {
                let sequence = settlement.sequence();
                let mut tracking = tracking.lock();
                match tracking.in_flight.get(&id) {
                    Some(current) if current.sequence() == sequence && !current.is_cancel_requested() => {}
                    _ => {
                        debug!(sector_id = id.value(), sequence, "Ignoring stale load result");
                        return false;
                    }
                }
                tracking.in_flight.remove(&id);

                match outcome {
                    Ok(payload) => {
                        settlement.resolve();
                        sink.consume(id, payload);
                        tracking.active.insert(id);
                        metrics.request_consumed(quality);
                    }
                    Err(e) => {
                        warn!(sector_id = id.value(), quality = %quality, error = %e, "Sector load failed");
                        metrics.request_failed();
                    }
                }
                loading.send_replace(tracking.loading_state());
                true
            },
        )
    }

    /// Ids that have been consumed and are still wanted.
    pub fn active_ids(&self) -> SectorIdSet {
        self.tracking.lock().active.clone()
    }

    /// Ids with a load in progress.
    pub fn in_flight_ids(&self) -> SectorIdSet {
        self.tracking.lock().in_flight.keys().copied().collect()
    }

    pub fn is_active(&self, id: SectorId) -> bool {
        self.tracking.lock().active.contains(&id)
    }

    /// Current progress of the last batch.
    pub fn loading_state(&self) -> LoadingState {
        *self.loading.borrow()
    }

    /// Subscribe to progress changes.
    pub fn subscribe_loading(&self) -> watch::Receiver<LoadingState> {
        self.loading.subscribe()
    }

    /// Wait until no load is in flight.
    pub async fn wait_until_settled(&self) {
        let mut rx = self.loading.subscribe();
        let _ = rx.wait_for(|state| !state.is_loading).await;
    }
}

impl<P> Drop for SectorLoadCoordinator<P> {
    fn drop(&mut self) {
        for request in self.tracking.lock().in_flight.values() {
            request.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::testing::{GatedDecoder, GatedFetcher, RecordingSink, WAIT};
    use crate::loading::RequestStatus;
    use std::time::Duration;
    use tokio::time::timeout;

    fn ids(values: &[u32]) -> SectorIdSet {
        values.iter().copied().map(SectorId).collect()
    }

    struct Fixture {
        fetcher: Arc<GatedFetcher>,
        decoder: Arc<GatedDecoder>,
        sink: Arc<RecordingSink>,
        coordinator: SectorLoadCoordinator<String>,
    }

    fn fixture(fetcher: GatedFetcher, decoder: GatedDecoder) -> Fixture {
        let fetcher = Arc::new(fetcher);
        let decoder = Arc::new(decoder);
        let sink = Arc::new(RecordingSink::default());
        let coordinator =
            SectorLoadCoordinator::new(Quality::Detailed, fetcher.clone(), decoder.handle(), sink.clone());
        Fixture {
            fetcher,
            decoder,
            sink,
            coordinator,
        }
    }

    async fn settle(coordinator: &SectorLoadCoordinator<String>) {
        timeout(WAIT, coordinator.wait_until_settled()).await.unwrap();
    }

    #[tokio::test]
    async fn test_wanted_sectors_are_consumed_exactly_once() {
        let f = fixture(GatedFetcher::open(), GatedDecoder::open());

        f.coordinator.update(&ids(&[1, 2, 3]));
        settle(&f.coordinator).await;

        let mut consumed = f.sink.consumed_ids();
        consumed.sort();
        assert_eq!(consumed, vec![SectorId(1), SectorId(2), SectorId(3)]);
        assert_eq!(f.coordinator.active_ids(), ids(&[1, 2, 3]));
        assert!(f.coordinator.in_flight_ids().is_empty());
        assert!(f.sink.consumed().iter().all(|(id, payload)| *payload == format!("sector-{}", id.value())));
    }

    #[tokio::test]
    async fn test_superset_consumes_only_new_ids() {
        let f = fixture(GatedFetcher::open(), GatedDecoder::open());

        f.coordinator.update(&ids(&[1, 2]));
        settle(&f.coordinator).await;
        f.coordinator.update(&ids(&[1, 2, 3, 4]));
        settle(&f.coordinator).await;

        let mut consumed = f.sink.consumed_ids();
        consumed.sort();
        assert_eq!(consumed, vec![SectorId(1), SectorId(2), SectorId(3), SectorId(4)]);
        assert_eq!(f.fetcher.calls(), 4);
        assert!(f.sink.discarded().is_empty());
    }

    #[tokio::test]
    async fn test_subset_discards_exactly_removed_ids() {
        let f = fixture(GatedFetcher::open(), GatedDecoder::open());

        f.coordinator.update(&ids(&[1, 2, 3]));
        settle(&f.coordinator).await;
        f.coordinator.update(&ids(&[2]));

        let discarded = f.sink.discarded();
        assert_eq!(discarded, vec![(SectorId(1), None), (SectorId(3), None)]);
        assert_eq!(f.coordinator.active_ids(), ids(&[2]));
    }

    #[tokio::test]
    async fn test_discard_in_flight_cancels_request() {
        let f = fixture(GatedFetcher::closed(), GatedDecoder::open());

        f.coordinator.update(&ids(&[7]));
        timeout(WAIT, f.fetcher.wait_started()).await.unwrap();
        let request = f.coordinator.tracking.lock().in_flight[&SectorId(7)].clone();

        f.coordinator.update(&ids(&[]));
        assert_eq!(f.sink.discarded(), vec![(SectorId(7), Some(request.sequence()))]);
        assert!(f.coordinator.in_flight_ids().is_empty());

        f.fetcher.release();
        let status = timeout(WAIT, request.finished()).await.unwrap();
        assert_eq!(status, RequestStatus::Cancelled);
        assert_eq!(f.decoder.calls(), 0);
        assert!(f.sink.consumed().is_empty());
        assert!(!f.coordinator.is_active(SectorId(7)));
    }

    #[tokio::test]
    async fn test_rerequest_after_discard_fetches_again() {
        let f = fixture(GatedFetcher::open(), GatedDecoder::open());

        f.coordinator.update(&ids(&[5]));
        settle(&f.coordinator).await;
        f.coordinator.update(&ids(&[]));
        f.coordinator.update(&ids(&[5]));
        settle(&f.coordinator).await;

        assert_eq!(f.fetcher.fetched(), vec![SectorId(5), SectorId(5)]);
        assert_eq!(f.sink.consumed_ids(), vec![SectorId(5), SectorId(5)]);
        assert!(f.coordinator.is_active(SectorId(5)));
    }

    #[tokio::test]
    async fn test_rerequest_while_cancelled_fetch_pending_uses_fresh_request() {
        let f = fixture(GatedFetcher::closed(), GatedDecoder::open());

        f.coordinator.update(&ids(&[5]));
        f.coordinator.update(&ids(&[]));
        f.coordinator.update(&ids(&[5]));
        timeout(WAIT, f.fetcher.wait_calls(1)).await.unwrap();
        f.fetcher.release();
        settle(&f.coordinator).await;

        // Only the second request may be consumed
        assert_eq!(f.sink.consumed_ids(), vec![SectorId(5)]);
        assert!(f.coordinator.is_active(SectorId(5)));
    }

    #[tokio::test]
    async fn test_failed_load_is_untracked_and_retried_on_next_update() {
        let f = fixture(GatedFetcher::open(), GatedDecoder::open());
        f.fetcher.fail_sector(SectorId(2));

        f.coordinator.update(&ids(&[1, 2]));
        settle(&f.coordinator).await;
        assert_eq!(f.coordinator.active_ids(), ids(&[1]));
        assert!(f.coordinator.in_flight_ids().is_empty());

        f.fetcher.heal_sector(SectorId(2));
        f.coordinator.update(&ids(&[1, 2]));
        settle(&f.coordinator).await;
        assert_eq!(f.coordinator.active_ids(), ids(&[1, 2]));
    }

    #[tokio::test]
    async fn test_loading_state_tracks_batch() {
        let f = fixture(GatedFetcher::closed(), GatedDecoder::open());

        f.coordinator.update(&ids(&[1, 2, 3]));
        let state = f.coordinator.loading_state();
        assert!(state.is_loading);
        assert_eq!(state.items_requested, 3);
        assert_eq!(state.items_loaded, 0);

        f.fetcher.release();
        settle(&f.coordinator).await;
        let state = f.coordinator.loading_state();
        assert!(!state.is_loading);
        assert_eq!(state.items_loaded, 3);
    }

    #[tokio::test]
    async fn test_unchanged_wanted_set_is_a_no_op() {
        let f = fixture(GatedFetcher::open(), GatedDecoder::open());

        f.coordinator.update(&ids(&[1]));
        settle(&f.coordinator).await;
        f.coordinator.update(&ids(&[1]));
        settle(&f.coordinator).await;

        assert_eq!(f.fetcher.calls(), 1);
        assert_eq!(f.sink.consumed_ids(), vec![SectorId(1)]);
    }

    #[tokio::test]
    async fn test_clear_discards_everything() {
        let f = fixture(GatedFetcher::open(), GatedDecoder::open());

        f.coordinator.update(&ids(&[1, 2]));
        settle(&f.coordinator).await;
        f.coordinator.clear();

        assert!(f.coordinator.active_ids().is_empty());
        assert_eq!(f.sink.discarded().len(), 2);
    }

    #[tokio::test]
    async fn test_fetches_are_capped_by_fetch_slots() {
        let f = fixture(GatedFetcher::closed(), GatedDecoder::open());
        let coordinator = f.coordinator.with_max_concurrent_fetches(3);
        let wanted: SectorIdSet = (0..200).map(SectorId).collect();

        coordinator.update(&wanted);
        timeout(WAIT, f.fetcher.wait_calls(3)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(f.fetcher.calls(), 3);
        assert_eq!(coordinator.in_flight_ids().len(), 200);

        // Narrowing to the running fetches drops every queued request
        let fetching: SectorIdSet = f.fetcher.fetched().into_iter().collect();
        coordinator.update(&fetching);
        f.fetcher.release();
        settle(&coordinator).await;

        assert_eq!(f.fetcher.calls(), 3);
        assert_eq!(coordinator.active_ids(), fetching);
    }

    #[tokio::test]
    async fn test_capped_fetches_all_complete() {
        let f = fixture(GatedFetcher::open(), GatedDecoder::open());
        let coordinator = f.coordinator.with_max_concurrent_fetches(2);
        let wanted: SectorIdSet = (0..20).map(SectorId).collect();

        coordinator.update(&wanted);
        settle(&coordinator).await;

        assert_eq!(coordinator.active_ids(), wanted);
        assert_eq!(f.fetcher.calls(), 20);
    }
}

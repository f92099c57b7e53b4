//! Fixed-size decode worker pool.
//!
//! # Architecture
//!
//! ```text
//!   async callers                    worker threads
//!  ┌──────────────┐  least-loaded  ┌──────────────────┐
//!  │ decode_*()   │──── job ──────►│ worker 0 (ctx)   │──┐
//!  │  .await      │                ├──────────────────┤  │ oneshot
//!  │              │──── job ──────►│ worker 1 (ctx)   │──┤ result
//!  │              │◄───────────────┴──────────────────┴──┘
//!  └──────────────┘
//! ```
//!
//! The pool is primed once with the decode context derived from the root
//! sector. Priming is a broadcast to every worker; jobs that need the context
//! wait until all workers have acknowledged it. Each job goes to the worker
//! with the fewest unfinished jobs (ties go to the lowest index). The
//! counter is raised before dispatch and lowered when the job ends, whatever
//! the outcome. A panicking decode fails that job only.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, trace};

use crate::telemetry::StreamingMetrics;

use super::worker::{run_isolated, Job, PendingTicket, WorkerEntry};
use super::{DecodeError, GeometryFile, NativeDecoder, SectorPrimitives};

/// Worker count meaning "one per available hardware thread".
pub const AUTO_WORKER_COUNT: usize = 0;

/// Configuration for [`DecodePool`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodePoolConfig {
    /// Number of worker threads, or [`AUTO_WORKER_COUNT`].
    pub workers: usize,
}

impl Default for DecodePoolConfig {
    fn default() -> Self {
        Self {
            workers: AUTO_WORKER_COUNT,
        }
    }
}

impl DecodePoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Worker count after resolving [`AUTO_WORKER_COUNT`].
    pub fn resolved_workers(&self) -> usize {
        if self.workers == AUTO_WORKER_COUNT {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.workers
        }
    }
}

/// Pool of decode worker threads sharing one native decoder.
pub struct DecodePool<D: NativeDecoder> {
    decoder: Arc<D>,
    workers: Vec<WorkerEntry<D>>,
    primed: watch::Sender<bool>,
    metrics: Arc<StreamingMetrics>,
}

impl<D: NativeDecoder> DecodePool<D> {
    /// Start the worker threads.
    pub fn new(decoder: D, config: DecodePoolConfig) -> std::io::Result<Self> {
        let decoder = Arc::new(decoder);
        let count = config.resolved_workers();
        let workers = (0..count)
            .map(|index| WorkerEntry::spawn(index, decoder.clone()))
            .collect::<std::io::Result<Vec<_>>>()?;
        info!(workers = count, "Decode pool started");

        Ok(Self {
            decoder,
            workers,
            primed: watch::channel(false).0,
            metrics: Arc::new(StreamingMetrics::new()),
        })
    }

    /// Share a metrics instance with other components.
    pub fn with_metrics(mut self, metrics: Arc<StreamingMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Unfinished jobs per worker, in pool order.
    pub fn pending_jobs(&self) -> Vec<usize> {
        self.workers.iter().map(WorkerEntry::pending).collect()
    }

    pub fn is_primed(&self) -> bool {
        *self.primed.borrow()
    }

    /// Derive the decode context from the root sector's bytes.
    ///
    /// Runs on a worker without waiting for priming.
    pub async fn decode_root(&self, bytes: Bytes) -> Result<D::Context, DecodeError> {
        self.dispatch(false, move |decoder, _| decoder.decode_root(&bytes))
            .await
    }

    /// Hand the context to every worker and wait for all of them.
    pub async fn prime(&self, context: D::Context) -> Result<(), DecodeError> {
        let context = Arc::new(context);
        let acks = self
            .workers
            .iter()
            .map(|worker| {
                let (ack, acked) = oneshot::channel();
                worker
                    .sender
                    .send(Job::Prime {
                        context: context.clone(),
                        ack,
                    })
                    .map(|_| acked)
                    .map_err(|_| DecodeError::PoolShutdown)
            })
            .collect::<Result<Vec<_>, _>>()?;

        for acked in join_all(acks).await {
            acked.map_err(|_| DecodeError::PoolShutdown)?;
        }

        self.primed.send_replace(true);
        info!(workers = self.workers.len(), "Decode pool primed");
        Ok(())
    }

    /// Decode a detailed sector into raw primitives.
    pub async fn decode_sector(&self, bytes: Bytes) -> Result<SectorPrimitives, DecodeError> {
        self.dispatch(true, move |decoder, context| match context {
            Some(context) => decoder.decode_sector(context, &bytes),
            None => Err(DecodeError::malformed("sector", "decode context missing")),
        })
        .await
    }

    /// Decode a shared geometry file. Does not wait for priming.
    pub async fn decode_geometry_file(&self, bytes: Bytes) -> Result<GeometryFile, DecodeError> {
        self.dispatch(false, move |decoder, _| decoder.decode_geometry_file(&bytes))
            .await
    }

    /// Decode a simple sector into a packed quad buffer.
    pub async fn decode_quads(&self, bytes: Bytes) -> Result<Vec<f32>, DecodeError> {
        self.dispatch(true, move |decoder, context| match context {
            Some(context) => decoder.decode_quads(context, &bytes),
            None => Err(DecodeError::malformed("quad file", "decode context missing")),
        })
        .await
    }

    /// Run arbitrary CPU work on a worker, after priming.
    pub async fn run<T, F>(&self, f: F) -> Result<T, DecodeError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, DecodeError> + Send + 'static,
    {
        self.dispatch(true, move |_, _| f()).await
    }

    async fn dispatch<T, F>(&self, needs_context: bool, f: F) -> Result<T, DecodeError>
    where
        T: Send + 'static,
        F: FnOnce(&D, Option<&D::Context>) -> Result<T, DecodeError> + Send + 'static,
    {
        if needs_context {
            let mut primed = self.primed.subscribe();
            primed
                .wait_for(|primed| *primed)
                .await
                .map_err(|_| DecodeError::PoolShutdown)?;
        }

        let (index, worker) = self.least_loaded().ok_or(DecodeError::PoolShutdown)?;
        let ticket = PendingTicket::new(worker.pending.clone());
        let (reply, result) = oneshot::channel();
        trace!(worker = index, pending = worker.pending(), "Dispatching decode job");

        let job = Job::Run(Box::new(move |decoder: &D, context: Option<&D::Context>| {
            let outcome = run_isolated(|| f(decoder, context));
            drop(ticket);
            let _ = reply.send(outcome);
        }));
        worker.sender.send(job).map_err(|_| DecodeError::PoolShutdown)?;
        self.metrics.decode_job_dispatched();

        let outcome = result.await.map_err(|_| DecodeError::PoolShutdown)?;
        if outcome.is_err() {
            self.metrics.decode_job_failed();
        }
        outcome
    }

    fn least_loaded(&self) -> Option<(usize, &WorkerEntry<D>)> {
        self.workers
            .iter()
            .enumerate()
            .min_by_key(|(index, worker)| (worker.pending(), *index))
    }
}

impl<D: NativeDecoder> Drop for DecodePool<D> {
    fn drop(&mut self) {
        let threads: Vec<_> = std::mem::take(&mut self.workers)
            .into_iter()
            .filter_map(|WorkerEntry { sender, thread, .. }| {
                // Closing the channel ends the worker loop
                drop(sender);
                thread
            })
            .collect();
        for thread in threads {
            let _ = thread.join();
        }
        debug!("Decode pool shut down");
    }
}

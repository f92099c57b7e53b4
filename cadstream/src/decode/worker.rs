//! Decode worker threads.
//!
//! Each worker is an OS thread draining an unbounded job channel. It keeps
//! the decode context it was primed with and hands it to every job.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use super::{DecodeError, NativeDecoder};

/// Work executed on a worker thread.
pub(crate) type JobFn<D> = Box<dyn FnOnce(&D, Option<&<D as NativeDecoder>::Context>) + Send>;

pub(crate) enum Job<D: NativeDecoder> {
    /// Replace the worker's decode context and acknowledge.
    Prime {
        context: Arc<D::Context>,
        ack: oneshot::Sender<()>,
    },
    Run(JobFn<D>),
}

/// Pool entry: the worker's job channel and its unfinished-job counter.
pub(crate) struct WorkerEntry<D: NativeDecoder> {
    pub(crate) sender: mpsc::UnboundedSender<Job<D>>,
    pub(crate) pending: Arc<AtomicUsize>,
    pub(crate) thread: Option<JoinHandle<()>>,
}

impl<D: NativeDecoder> WorkerEntry<D> {
    pub(crate) fn spawn(index: usize, decoder: Arc<D>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let thread = std::thread::Builder::new()
            .name(format!("cadstream-decode-{}", index))
            .spawn(move || run(index, decoder, receiver))?;
        Ok(Self {
            sender,
            pending: Arc::new(AtomicUsize::new(0)),
            thread: Some(thread),
        })
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

/// Unfinished-job ticket. Increments the counter on creation and
/// decrements it when dropped, whichever way the job ends.
pub(crate) struct PendingTicket(Arc<AtomicUsize>);

impl PendingTicket {
    pub(crate) fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for PendingTicket {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn run<D: NativeDecoder>(index: usize, decoder: Arc<D>, mut receiver: mpsc::UnboundedReceiver<Job<D>>) {
    debug!(worker = index, "Decode worker started");
    let mut context: Option<Arc<D::Context>> = None;

    while let Some(job) = receiver.blocking_recv() {
        match job {
            Job::Prime { context: primed, ack } => {
                context = Some(primed);
                let _ = ack.send(());
                trace!(worker = index, "Decode worker primed");
            }
            Job::Run(job) => job(&decoder, context.as_deref()),
        }
    }

    debug!(worker = index, "Decode worker stopped");
}

/// Run `f`, turning a panic into [`DecodeError::WorkerPanicked`].
pub(crate) fn run_isolated<T>(f: impl FnOnce() -> Result<T, DecodeError>) -> Result<T, DecodeError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| Err(DecodeError::WorkerPanicked(panic_message(panic))))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Background diff scheduling with last-writer-wins semantics.
//!
//! Every submitted `(old, new)` pair becomes one job on a [`Worker`] owned by
//! this scheduler alone, so the diffs for one view are computed strictly in
//! submission order and never overlap. Finished diffs are handed to the UI
//! side as [`ApplyRequest`]s over a channel.
//!
//! # Cancellation
//!
//! Cancellation is advisory. A submission raises the scheduler's "latest"
//! mark; a queued job that finds a newer mark when it starts skips the diff
//! entirely (when coalescing is enabled). Each diff is taken against the
//! last model actually delivered, so a skipped job never leaves the next one
//! diffing from a base the view has not seen. A job that is already running is
//! never interrupted: its result is stamped with its sequence number and the
//! applier discards it if something newer has been applied. Correctness only
//! depends on the latter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use strata_core::logging::{span_names, targets};
use strata_core::{Result, Worker, WorkerConfig};

use super::diff::Diff;
use super::sections::Sections;
use super::store::Versioned;

/// Item comparison used for update detection: `(new_item, old_item) -> same`.
pub type Matcher<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Callback that nudges the host's UI loop to drain pending applies.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// A finished diff on its way to the UI thread.
#[derive(Debug)]
pub struct ApplyRequest<T> {
    /// Sequence number of `model`.
    pub sequence: u64,
    /// Sequence number of the model `diff` was computed against.
    pub base_sequence: u64,
    /// The model to display.
    pub model: Arc<Sections<T>>,
    /// The edit from the base model to `model`.
    pub diff: Diff,
}

/// Handle to an in-flight background diff.
///
/// Dropping it does not cancel anything; it only lets the submitter observe
/// whether the computation has been superseded.
#[derive(Debug, Clone)]
pub struct PendingComputation {
    sequence: u64,
    latest: Arc<AtomicU64>,
}

impl PendingComputation {
    /// The sequence number this computation was stamped with.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns `true` once a newer submission (or move) exists. A superseded
    /// computation's result will never reach the view.
    pub fn is_superseded(&self) -> bool {
        self.latest.load(Ordering::Acquire) > self.sequence
    }
}

/// Runs diffs for one binding on a dedicated worker thread.
pub struct UpdateScheduler<T> {
    worker: Worker,
    latest: Arc<AtomicU64>,
    /// The newest model handed to the UI side; every diff starts from it.
    delivered: Arc<Mutex<Versioned<T>>>,
    resync: Arc<AtomicBool>,
    matcher: Matcher<T>,
    deliver: Sender<ApplyRequest<T>>,
    waker: Option<Waker>,
    coalesce: bool,
}

impl<T: Send + Sync + 'static> UpdateScheduler<T> {
    /// Starts a scheduler whose results are sent to `deliver`.
    ///
    /// `initial` is the model the view starts with.
    pub fn new(
        worker_config: WorkerConfig,
        coalesce: bool,
        initial: Versioned<T>,
        matcher: Matcher<T>,
        deliver: Sender<ApplyRequest<T>>,
        waker: Option<Waker>,
    ) -> Result<Self> {
        Ok(Self {
            worker: Worker::with_config(worker_config)?,
            latest: Arc::new(AtomicU64::new(initial.sequence)),
            delivered: Arc::new(Mutex::new(initial)),
            resync: Arc::new(AtomicBool::new(false)),
            matcher,
            deliver,
            waker,
            coalesce,
        })
    }

    /// Queues the diff that brings the view from `old` to `new`.
    ///
    /// `new.sequence` becomes the latest mark immediately, superseding every
    /// earlier submission. The diff is taken against the last model actually
    /// delivered, which is `old` unless intermediate submissions were skipped.
    ///
    /// On error nothing was queued and a resync is requested, since the
    /// committed model has moved past anything the worker will deliver.
    pub fn submit(&self, old: Versioned<T>, new: Versioned<T>) -> Result<PendingComputation> {
        let sequence = new.sequence;
        self.supersede(sequence);

        let job = DiffJob {
            old,
            new,
            latest: self.latest.clone(),
            delivered: self.delivered.clone(),
            matcher: self.matcher.clone(),
            deliver: self.deliver.clone(),
            waker: self.waker.clone(),
            coalesce: self.coalesce,
        };
        let unfinished = ResyncUnlessFinished {
            resync: self.resync.clone(),
            waker: self.waker.clone(),
            finished: false,
        };

        if let Err(error) = self.worker.send(move || {
            job.run();
            unfinished.finish();
        }) {
            self.resync.store(true, Ordering::Release);
            return Err(error);
        }

        tracing::trace!(target: targets::SCHEDULER, sequence, "diff submitted");
        Ok(PendingComputation {
            sequence,
            latest: self.latest.clone(),
        })
    }
}

/// One queued diff, run on the worker thread.
struct DiffJob<T> {
    old: Versioned<T>,
    new: Versioned<T>,
    latest: Arc<AtomicU64>,
    delivered: Arc<Mutex<Versioned<T>>>,
    matcher: Matcher<T>,
    deliver: Sender<ApplyRequest<T>>,
    waker: Option<Waker>,
    coalesce: bool,
}

impl<T: Send + Sync + 'static> DiffJob<T> {
    fn run(self) {
        let sequence = self.new.sequence;
        if self.coalesce && self.latest.load(Ordering::Acquire) > sequence {
            tracing::trace!(target: targets::SCHEDULER, sequence, "superseded before start, skipping");
            return;
        }

        let base = {
            let delivered = self.delivered.lock();
            if delivered.sequence >= sequence {
                tracing::trace!(target: targets::SCHEDULER, sequence, delivered = delivered.sequence, "older than delivered model, skipping");
                return;
            }
            delivered.clone()
        };
        if base.sequence != self.old.sequence {
            tracing::trace!(target: targets::SCHEDULER, sequence, base = base.sequence, "diffing against last delivered model");
        }

        let diff = {
            let _span = tracing::trace_span!(target: targets::DIFF, span_names::DIFF, sequence).entered();
            compute(&*base.model, &*self.new.model, &*self.matcher)
        };

        {
            let mut delivered = self.delivered.lock();
            if delivered.sequence < sequence {
                *delivered = self.new.clone();
            }
        }
        let request = ApplyRequest {
            sequence,
            base_sequence: base.sequence,
            model: self.new.model,
            diff,
        };

        if self.deliver.send(request).is_err() {
            tracing::trace!(target: targets::SCHEDULER, sequence, "binding gone, dropping result");
            return;
        }
        if let Some(waker) = self.waker {
            waker();
        }
    }
}

/// Requests a resync unless the job it travels with ran to completion.
///
/// Fires when the matcher panics mid-diff and when a queued job is discarded
/// without running.
struct ResyncUnlessFinished {
    resync: Arc<AtomicBool>,
    waker: Option<Waker>,
    finished: bool,
}

impl ResyncUnlessFinished {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for ResyncUnlessFinished {
    fn drop(&mut self) {
        if !self.finished {
            self.resync.store(true, Ordering::Release);
            if let Some(waker) = &self.waker {
                waker();
            }
        }
    }
}

impl<T> UpdateScheduler<T> {
    /// Marks everything below `sequence` as superseded without queuing work.
    pub fn supersede(&self, sequence: u64) {
        self.latest.fetch_max(sequence, Ordering::AcqRel);
    }

    /// Records that the view now shows `current` through a path that bypassed
    /// the worker (a direct move or a resync), so later diffs start from it.
    ///
    /// Older values than the one already recorded are ignored.
    pub fn rebase(&self, current: Versioned<T>) {
        self.supersede(current.sequence);
        let mut delivered = self.delivered.lock();
        if delivered.sequence < current.sequence {
            *delivered = current;
        }
    }

    /// Sequence of the newest model delivered or rebased onto.
    pub fn delivered_sequence(&self) -> u64 {
        self.delivered.lock().sequence
    }

    /// The highest sequence number submitted or superseded so far.
    pub fn latest_sequence(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Clears and returns the resync request.
    ///
    /// Set when a submission was rejected or a queued diff never completed,
    /// so the committed model may not arrive through the channel.
    pub fn take_resync(&self) -> bool {
        self.resync.swap(false, Ordering::AcqRel)
    }

    /// Number of diff jobs queued or running.
    pub fn pending_jobs(&self) -> usize {
        self.worker.pending_jobs()
    }

    /// Returns `true` while the worker accepts submissions.
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Invokes the host waker, if any.
    pub fn wake(&self) {
        if let Some(waker) = &self.waker {
            waker();
        }
    }

    /// Stops accepting submissions. Queued jobs still run; their results go
    /// nowhere once the receiving binding is gone.
    pub fn shutdown(&self) {
        self.worker.stop();
    }
}

impl<T> std::fmt::Debug for UpdateScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("worker", &self.worker)
            .field("latest", &self.latest.load(Ordering::Relaxed))
            .field("coalesce", &self.coalesce)
            .finish()
    }
}

#[cfg(not(feature = "parallel"))]
fn compute<T>(old: &Sections<T>, new: &Sections<T>, matcher: &(dyn Fn(&T, &T) -> bool + Send + Sync)) -> Diff {
    super::diff::diff(old, new, matcher)
}

#[cfg(feature = "parallel")]
fn compute<T: Sync>(old: &Sections<T>, new: &Sections<T>, matcher: &(dyn Fn(&T, &T) -> bool + Send + Sync)) -> Diff {
    super::diff::diff_par(old, new, matcher)
}

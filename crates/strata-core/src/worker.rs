//! Dedicated background thread with its own FIFO job queue.
//!
//! A [`Worker`] owns exactly one thread and runs submitted jobs sequentially,
//! in submission order. Unlike a shared pool, two jobs sent to the same worker
//! never overlap, which is what the list pipeline relies on to keep the diffs
//! for one view strictly ordered.
//!
//! # Example
//!
//! ```no_run
//! use strata_core::worker::{Worker, WorkerBuilder};
//!
//! let worker = WorkerBuilder::new()
//!     .name("strata-diff")
//!     .queue_capacity(64)
//!     .build()?;
//!
//! worker.send(|| {
//!     println!("runs on the worker thread");
//! })?;
//!
//! // Graceful shutdown: queued jobs still run.
//! worker.stop_and_join();
//! # Ok::<(), strata_core::Error>(())
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::logging::{span_names, targets};

/// Default capacity for the worker's job queue.
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How often an idle worker re-checks for shutdown.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Configuration for creating a Worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name for the worker thread.
    pub name: String,
    /// Stack size for the worker thread in bytes. `None` uses the default.
    pub stack_size: Option<usize>,
    /// Capacity of the job queue.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "strata-worker".to_string(),
            stack_size: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl WorkerConfig {
    /// Create a new configuration with the given thread name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Builder for creating Workers with custom configuration.
#[derive(Debug, Default)]
pub struct WorkerBuilder {
    config: WorkerConfig,
}

impl WorkerBuilder {
    /// Create a new WorkerBuilder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the stack size for the worker thread.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Set the job queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Build and start the worker.
    pub fn build(self) -> Result<Worker> {
        Worker::with_config(self.config)
    }
}

/// Internal state shared between the Worker handle and worker thread.
struct WorkerState {
    /// Whether the worker accepts new jobs.
    running: AtomicBool,
    /// Set once the thread has left its loop.
    exited: AtomicBool,
    /// Count of jobs queued or executing.
    pending_jobs: AtomicUsize,
    /// Condvar for waiting on shutdown.
    shutdown_condvar: Condvar,
    /// Mutex for the condvar.
    shutdown_mutex: Mutex<()>,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            exited: AtomicBool::new(false),
            pending_jobs: AtomicUsize::new(0),
            shutdown_condvar: Condvar::new(),
            shutdown_mutex: Mutex::new(()),
        }
    }

    fn signal_exited(&self) {
        let _guard = self.shutdown_mutex.lock();
        self.running.store(false, Ordering::Release);
        self.exited.store(true, Ordering::Release);
        self.shutdown_condvar.notify_all();
    }
}

/// Marks the worker exited when the thread leaves, including by unwinding.
///
/// Jobs still queued after a panic are discarded and uncounted.
struct ExitGuard {
    state: Arc<WorkerState>,
    receiver: Receiver<WorkerMessage>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.state.running.store(false, Ordering::Release);
            let mut discarded = 0usize;
            while let Ok(message) = self.receiver.try_recv() {
                if let WorkerMessage::Run(job) = message {
                    drop(job);
                    self.state.pending_jobs.fetch_sub(1, Ordering::AcqRel);
                    discarded += 1;
                }
            }
            tracing::error!(target: targets::WORKER, discarded, "job panicked, worker exiting");
        }
        self.state.signal_exited();
    }
}

/// Counts one job as finished when dropped, so a panicking job is counted too.
struct JobGuard<'a>(&'a WorkerState);

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.0.pending_jobs.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A message for the worker thread.
enum WorkerMessage {
    /// Execute a job.
    Run(Box<dyn FnOnce() + Send>),
    /// Finish what is queued, then exit.
    Shutdown,
}

/// A dedicated worker thread with its own job queue.
///
/// # Thread Safety
///
/// `Worker` is `Send + Sync`; any thread may submit jobs. Jobs run one at a
/// time on the worker thread in the order they were accepted.
pub struct Worker {
    /// Channel sender for submitting jobs.
    sender: Sender<WorkerMessage>,
    /// Thread handle for joining.
    handle: Mutex<Option<JoinHandle<()>>>,
    /// Shared state with the worker thread.
    state: Arc<WorkerState>,
    /// Queue capacity, for error reporting.
    capacity: usize,
    /// Thread name, for logging.
    name: String,
}

impl Worker {
    /// Create a new worker with default configuration.
    ///
    /// The worker thread starts immediately.
    pub fn new() -> Result<Self> {
        Self::with_config(WorkerConfig::default())
    }

    /// Create a new worker with custom configuration.
    pub fn with_config(config: WorkerConfig) -> Result<Self> {
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        let state = Arc::new(WorkerState::new());

        let thread_state = state.clone();
        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder
            .spawn(move || {
                let exit = ExitGuard {
                    state: thread_state,
                    receiver,
                };
                worker_loop(&exit.receiver, &exit.state);
            })
            .map_err(|source| Error::worker_spawn(config.name.clone(), source))?;

        tracing::debug!(target: targets::WORKER, name = %config.name, capacity, "worker started");

        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
            state,
            capacity,
            name: config.name,
        })
    }

    /// The worker thread's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the worker still accepts jobs.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Get the number of jobs queued or executing.
    pub fn pending_jobs(&self) -> usize {
        self.state.pending_jobs.load(Ordering::Acquire)
    }

    /// Send a job to the worker for execution.
    ///
    /// Fails with [`Error::WorkerStopped`] after [`stop`](Self::stop) and with
    /// [`Error::QueueFull`] when the queue is at capacity.
    pub fn send<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.is_running() {
            return Err(Error::WorkerStopped);
        }

        self.state.pending_jobs.fetch_add(1, Ordering::AcqRel);

        match self.sender.try_send(WorkerMessage::Run(Box::new(job))) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.state.pending_jobs.fetch_sub(1, Ordering::AcqRel);
                Err(Error::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Disconnected(_)) => {
                self.state.pending_jobs.fetch_sub(1, Ordering::AcqRel);
                Err(Error::WorkerStopped)
            }
        }
    }

    /// Request the worker to stop after processing queued jobs.
    ///
    /// Non-blocking. No new jobs are accepted afterwards. Use
    /// [`join`](Self::join) to wait for the thread.
    pub fn stop(&self) {
        if self.state.running.swap(false, Ordering::AcqRel) {
            tracing::debug!(target: targets::WORKER, name = %self.name, "worker stopping");
        }
        // If the queue is full the loop notices `running == false` on its own.
        let _ = self.sender.try_send(WorkerMessage::Shutdown);
    }

    /// Wait for the worker thread to finish.
    ///
    /// Returns `true` if the worker was joined successfully, `false` if
    /// already joined or the thread panicked.
    pub fn join(&self) -> bool {
        let handle = self.handle.lock().take();
        match handle {
            Some(h) => h.join().is_ok(),
            None => false,
        }
    }

    /// Stop the worker and wait for it to finish.
    pub fn stop_and_join(&self) -> bool {
        self.stop();
        self.join()
    }

    /// Wait for the worker thread to exit, with a timeout.
    ///
    /// Returns `true` if the thread exited within the timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.state.shutdown_mutex.lock();
        while !self.state.exited.load(Ordering::Acquire) {
            if self
                .state
                .shutdown_condvar
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                return self.state.exited.load(Ordering::Acquire);
            }
        }
        true
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .field("pending_jobs", &self.pending_jobs())
            .finish()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Don't block in drop - just request shutdown
        self.stop();
    }
}

/// The main worker loop that processes jobs.
fn worker_loop(receiver: &Receiver<WorkerMessage>, state: &WorkerState) {
    let run = |job: Box<dyn FnOnce() + Send>| {
        let _done = JobGuard(state);
        let _span = tracing::trace_span!(target: targets::WORKER, span_names::WORKER_JOB).entered();
        job();
    };

    loop {
        match receiver.recv_timeout(IDLE_POLL) {
            Ok(WorkerMessage::Run(job)) => run(job),
            Ok(WorkerMessage::Shutdown) => break,
            Err(RecvTimeoutError::Timeout) => {
                if !state.running.load(Ordering::Acquire) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }

    // Drain whatever was accepted before the stop.
    while let Ok(message) = receiver.try_recv() {
        if let WorkerMessage::Run(job) = message {
            run(job);
        }
    }
}

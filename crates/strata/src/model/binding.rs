//! Binding a model pipeline to a live list view.
//!
//! A [`ListBinding`] lives on the UI thread and owns the view, the rendered
//! model and the receiving end of the diff channel. Any number of
//! [`ModelHandle`]s can be cloned off it and moved to other threads to push
//! new model values.
//!
//! ```text
//!   any thread                worker thread               UI thread
//!   ──────────                ─────────────               ─────────
//!   ModelHandle::set ──► store ──► UpdateScheduler ──► channel ──► process_pending
//!                                   (diff)                        (ViewApplier)
//! ```
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use strata::model::{BindingBuilder, ListBinding, ListView, Sections, ViewOp};
//!
//! struct Table;
//!
//! impl ListView<u32> for Table {
//!     fn is_presentable(&self) -> bool { true }
//!     fn reload_data(&mut self, _model: &Sections<u32>) {}
//!     fn perform_batch(&mut self, _model: &Sections<u32>, _ops: &[ViewOp]) {}
//! }
//!
//! let mut binding: ListBinding<u32, Table> = BindingBuilder::new()
//!     .name("numbers-diff")
//!     .build()?;
//! binding.bind(Table);
//!
//! let handle = binding.handle();
//! std::thread::spawn(move || handle.set(Sections::single(vec![1, 2, 3])))
//!     .join()
//!     .unwrap();
//!
//! assert!(binding.settle(Duration::from_secs(1)));
//! assert_eq!(binding.row_count(0), 3);
//! # Ok::<(), strata_core::Error>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use strata_core::logging::targets;
use strata_core::{ConnectionGuard, Result, Signal, ThreadAffinity, WorkerConfig};

use super::applier::{ApplyOutcome, ViewApplier};
use super::position::Position;
use super::scheduler::{ApplyRequest, Matcher, PendingComputation, UpdateScheduler, Waker};
use super::sections::Sections;
use super::store::{ModelStore, Versioned};
use super::view::ListView;

/// Default name of a binding's diff thread.
pub const DEFAULT_WORKER_NAME: &str = "strata-diff";

/// How often [`ListBinding::settle`] re-checks for a resync.
const SETTLE_POLL: Duration = Duration::from_millis(10);

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a [`ListBinding`].
#[derive(Debug, Clone)]
pub struct BindingConfig {
    /// The dedicated diff worker.
    pub worker: WorkerConfig,
    /// Skip queued diffs that a newer submission has already superseded.
    ///
    /// When `false` every submission is diffed; results are still gated by
    /// sequence number when applied.
    pub coalesce: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            worker: WorkerConfig::with_name(DEFAULT_WORKER_NAME),
            coalesce: true,
        }
    }
}

/// Lifecycle transitions of the view a binding drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The view is about to become visible.
    WillAppear,
    /// The view became visible.
    DidAppear,
    /// The view is about to be hidden.
    WillDisappear,
    /// The view was hidden.
    DidDisappear,
}

/// Builder for [`ListBinding`].
pub struct BindingBuilder<T> {
    config: BindingConfig,
    matcher: Matcher<T>,
    waker: Option<Waker>,
    initial: Sections<T>,
}

impl<T: PartialEq + Send + Sync + 'static> BindingBuilder<T> {
    /// Creates a builder that compares items with `==`.
    pub fn new() -> Self {
        Self::with_matcher(|new: &T, old: &T| new == old)
    }
}

impl<T: PartialEq + Send + Sync + 'static> Default for BindingBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> BindingBuilder<T> {
    /// Creates a builder with a custom item matcher, for item types without
    /// `PartialEq` or when updates should be detected differently.
    ///
    /// The matcher is called as `matcher(new_item, old_item)`.
    pub fn with_matcher<F>(matcher: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            config: BindingConfig::default(),
            matcher: Arc::new(matcher),
            waker: None,
            initial: Sections::default(),
        }
    }

    /// Replaces the item matcher.
    pub fn matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.matcher = Arc::new(matcher);
        self
    }

    /// Sets the diff thread name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.worker.name = name.into();
        self
    }

    /// Sets the diff thread stack size.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.worker.stack_size = Some(size);
        self
    }

    /// Sets the capacity of the diff job queue.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.worker.queue_capacity = capacity;
        self
    }

    /// Enables or disables skipping superseded queued diffs.
    pub fn coalesce(mut self, coalesce: bool) -> Self {
        self.config.coalesce = coalesce;
        self
    }

    /// Sets a callback run on the diff thread whenever a result is ready,
    /// so the host can schedule [`ListBinding::process_pending`] on its UI
    /// loop.
    pub fn waker<F>(mut self, waker: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.waker = Some(Arc::new(waker));
        self
    }

    /// Sets the model the binding starts with (default: one empty section).
    pub fn initial(mut self, model: impl Into<Sections<T>>) -> Self {
        self.initial = model.into();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts the diff worker and creates the binding on the calling thread,
    /// which becomes its UI thread.
    pub fn build<V: ListView<T>>(self) -> Result<ListBinding<T, V>> {
        let store = ModelStore::new(self.initial);
        let initial = store.snapshot();
        let (deliver, receiver) = unbounded();
        let scheduler = UpdateScheduler::new(
            self.config.worker,
            self.config.coalesce,
            initial.clone(),
            self.matcher,
            deliver,
            self.waker,
        )?;

        Ok(ListBinding {
            affinity: ThreadAffinity::current(),
            view: None,
            applier: ViewApplier::new(initial),
            receiver,
            shared: Arc::new(Shared { store, scheduler }),
            input: None,
            lifecycle: Signal::new(),
        })
    }
}

impl<T> std::fmt::Debug for BindingBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingBuilder")
            .field("config", &self.config)
            .field("waker", &self.waker.is_some())
            .field("initial_shape", &self.initial.shape())
            .finish()
    }
}

// =============================================================================
// ModelHandle
// =============================================================================

struct Shared<T> {
    store: ModelStore<T>,
    scheduler: UpdateScheduler<T>,
}

/// Cloneable, thread-safe access to a binding's committed model.
///
/// Handles may outlive the binding: reads keep working and `set` keeps
/// updating the committed value, but no view is updated any more.
pub struct ModelHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ModelHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> ModelHandle<T> {
    /// Returns the most recently committed model, whether or not the view has
    /// caught up with it.
    pub fn get(&self) -> Arc<Sections<T>> {
        self.shared.store.get()
    }

    /// Returns the committed model with its sequence number.
    pub fn snapshot(&self) -> Versioned<T> {
        self.shared.store.snapshot()
    }

    /// Sequence number of the committed model.
    pub fn sequence(&self) -> u64 {
        self.shared.store.sequence()
    }

    /// Commits `model` and queues its diff against the previous value.
    ///
    /// The model is committed even when this returns an error; the error only
    /// reports that no diff was queued (the view resyncs on the next
    /// [`ListBinding::process_pending`]).
    pub fn try_set(&self, model: impl Into<Arc<Sections<T>>>) -> Result<PendingComputation> {
        let (previous, next) = self.shared.store.replace(model);
        self.shared.scheduler.submit(previous, next)
    }

    /// Commits `model` and queues its diff. Never fails; a rejected
    /// submission is logged and the host is woken so the view can resync.
    pub fn set(&self, model: impl Into<Arc<Sections<T>>>) {
        if let Err(error) = self.try_set(model) {
            tracing::warn!(target: targets::BINDING, %error, "diff submission rejected, view will resync");
            self.shared.scheduler.wake();
        }
    }
}

impl<T> std::fmt::Debug for ModelHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("store", &self.shared.store)
            .finish()
    }
}

// =============================================================================
// ListBinding
// =============================================================================

/// Connects a model pipeline to a [`ListView`] on the UI thread.
///
/// All methods taking `&mut self` must be called on the thread that built the
/// binding (checked in debug builds).
pub struct ListBinding<T, V> {
    affinity: ThreadAffinity,
    view: Option<V>,
    applier: ViewApplier<T>,
    receiver: Receiver<ApplyRequest<T>>,
    shared: Arc<Shared<T>>,
    input: Option<ConnectionGuard>,
    lifecycle: Signal<LifecycleEvent>,
}

impl<T, V> ListBinding<T, V>
where
    T: PartialEq + Send + Sync + 'static,
    V: ListView<T>,
{
    /// Creates a binding with default configuration starting at `initial`.
    pub fn new(initial: impl Into<Sections<T>>) -> Result<Self> {
        BindingBuilder::new().initial(initial).build()
    }
}

impl<T, V> ListBinding<T, V>
where
    T: Send + Sync + 'static,
    V: ListView<T>,
{
    /// Attaches `view`, replacing (and returning) any previous one.
    ///
    /// The new view is fully reloaded from the rendered model.
    pub fn bind(&mut self, view: V) -> Option<V> {
        self.affinity.debug_check("ListBinding::bind");
        let previous = self.view.replace(view);
        if let Some(view) = self.view.as_mut() {
            view.reload_data(self.applier.rendered());
        }
        tracing::debug!(target: targets::BINDING, replaced = previous.is_some(), "view bound");
        previous
    }

    /// Detaches and returns the view. The rendered model keeps advancing.
    pub fn unbind(&mut self) -> Option<V> {
        self.affinity.debug_check("ListBinding::unbind");
        self.view.take()
    }

    /// The bound view, if any.
    pub fn view(&self) -> Option<&V> {
        self.view.as_ref()
    }

    /// The bound view, if any.
    pub fn view_mut(&mut self) -> Option<&mut V> {
        self.view.as_mut()
    }

    /// Returns a handle for pushing models from any thread.
    pub fn handle(&self) -> ModelHandle<T> {
        ModelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Commits `model` and queues its diff. See [`ModelHandle::set`].
    pub fn set(&self, model: impl Into<Arc<Sections<T>>>) {
        self.handle().set(model);
    }

    /// Returns the most recently committed model.
    pub fn committed(&self) -> Arc<Sections<T>> {
        self.shared.store.get()
    }

    /// The model the view currently reflects.
    pub fn rendered(&self) -> &Arc<Sections<T>> {
        self.applier.rendered()
    }

    /// Sequence number of the rendered model.
    pub fn rendered_sequence(&self) -> u64 {
        self.applier.rendered_sequence()
    }

    /// Number of sections in the rendered model.
    pub fn section_count(&self) -> usize {
        self.applier.rendered().section_count()
    }

    /// Number of rows in `section` of the rendered model, 0 if out of range.
    pub fn row_count(&self, section: usize) -> usize {
        self.applier.rendered().row_count(section)
    }

    /// The rendered item at `position`, `None` if out of range.
    pub fn item(&self, position: Position) -> Option<&T> {
        self.applier.rendered().get(position)
    }

    /// Returns `true` when the view shows the committed model.
    pub fn is_settled(&self) -> bool {
        self.applier.rendered_sequence() == self.shared.store.sequence()
    }

    /// Applies every finished diff waiting for this binding.
    ///
    /// Call this on the UI thread whenever the waker fires (or on every
    /// frame). If a submission was rejected or a diff failed, the view is
    /// then reloaded with the committed model.
    ///
    /// Returns the number of updates that reached the rendered model.
    pub fn process_pending(&mut self) -> usize {
        self.affinity.debug_check("ListBinding::process_pending");

        let mut applied = 0;
        while let Ok(request) = self.receiver.try_recv() {
            applied += self.apply(request);
        }

        if self.shared.scheduler.take_resync() {
            let latest = self.shared.store.snapshot();
            tracing::debug!(
                target: targets::BINDING,
                committed = latest.sequence,
                rendered = self.applier.rendered_sequence(),
                "committed model will not arrive as a diff, resyncing"
            );
            self.shared.scheduler.rebase(latest.clone());
            if self.applier.resync(self.view.as_mut(), latest) != ApplyOutcome::Stale {
                applied += 1;
            }
        }
        applied
    }

    /// Blocks the UI thread until the view shows the committed model or
    /// `timeout` elapses. Returns `true` if settled.
    ///
    /// Intended for tests and for hosts without an event loop.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_pending();
            if self.is_settled() {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            match self.receiver.recv_timeout((deadline - now).min(SETTLE_POLL)) {
                Ok(request) => {
                    self.apply(request);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return self.is_settled(),
            }
        }
    }

    /// Forwards every model emitted by `signal` to [`set`](Self::set).
    ///
    /// Replaces the previously bound signal, if any.
    pub fn bind_signal(&mut self, signal: &Signal<Sections<T>>)
    where
        T: Clone,
    {
        let handle = self.handle();
        self.input = Some(signal.connect_scoped(move |model: &Sections<T>| {
            handle.set(model.clone());
        }));
        tracing::debug!(target: targets::BINDING, "input signal bound");
    }

    /// Disconnects the bound input signal. Returns `true` if one was bound.
    pub fn unbind_signal(&mut self) -> bool {
        self.input.take().is_some()
    }

    /// Hooks fired by [`notify_lifecycle`](Self::notify_lifecycle).
    pub fn lifecycle(&self) -> &Signal<LifecycleEvent> {
        &self.lifecycle
    }

    /// Reports a lifecycle transition of the view.
    ///
    /// Registered hooks run first. On [`LifecycleEvent::DidAppear`] pending
    /// updates are then drained so the view is current once shown.
    pub fn notify_lifecycle(&mut self, event: LifecycleEvent) {
        self.affinity.debug_check("ListBinding::notify_lifecycle");
        tracing::trace!(target: targets::BINDING, ?event, "lifecycle");
        self.lifecycle.emit(event);
        if event == LifecycleEvent::DidAppear {
            self.process_pending();
        }
    }

    fn apply(&mut self, request: ApplyRequest<T>) -> usize {
        match self.applier.apply(self.view.as_mut(), request) {
            ApplyOutcome::Stale => 0,
            _ => 1,
        }
    }
}

impl<T, V> ListBinding<T, V>
where
    T: Clone + Send + Sync + 'static,
    V: ListView<T>,
{
    /// Moves one row of the committed model from `from` to `to`.
    ///
    /// Out-of-range positions (and `from == to`) are silently ignored and
    /// return `false`. A presentable view showing the latest model gets a
    /// single move operation; otherwise it is reloaded. Diffs still in flight
    /// are superseded.
    pub fn move_item(&mut self, from: Position, to: Position) -> bool {
        self.affinity.debug_check("ListBinding::move_item");

        let Some((previous, next)) = self.shared.store.update(|model| model.moved(from, to)) else {
            tracing::trace!(target: targets::BINDING, %from, %to, "move out of range, ignored");
            return false;
        };

        self.shared.scheduler.rebase(next.clone());
        self.applier
            .apply_move(self.view.as_mut(), previous.sequence, next, from, to);
        true
    }
}

impl<T, V> Drop for ListBinding<T, V> {
    fn drop(&mut self) {
        self.input = None;
        self.shared.scheduler.shutdown();
        tracing::debug!(target: targets::BINDING, "binding dropped");
    }
}

impl<T, V> std::fmt::Debug for ListBinding<T, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListBinding")
            .field("applier", &self.applier)
            .field("store", &self.shared.store)
            .field("scheduler", &self.shared.scheduler)
            .field("view_bound", &self.view.is_some())
            .field("input_bound", &self.input.is_some())
            .finish()
    }
}

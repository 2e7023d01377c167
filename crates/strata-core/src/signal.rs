//! Multi-subscriber notifications.
//!
//! Signals are the seam through which external event streams feed the list
//! pipeline: whatever produces new model values (a network poller, a reactive
//! store, a test) emits them on a [`Signal`], and a binding subscribes a slot
//! that commits them. View lifecycle transitions are broadcast the same way.
//!
//! Slots run synchronously on the emitting thread. Emission works on a
//! snapshot of the subscriber table, so a slot may subscribe, unsubscribe or
//! emit again without deadlocking.
//!
//! # Example
//!
//! ```
//! use strata_core::Signal;
//!
//! let rows_loaded = Signal::<Vec<String>>::new();
//!
//! let id = rows_loaded.connect(|rows| {
//!     println!("{} rows arrived", rows.len());
//! });
//!
//! assert_eq!(rows_loaded.emit(vec!["a".into(), "b".into()]), 1);
//! rows_loaded.disconnect(id);
//! assert_eq!(rows_loaded.emit(Vec::new()), 0);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Identifies one subscription to a [`Signal`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;
type Slots<Args> = Mutex<SlotMap<ConnectionId, Slot<Args>>>;

/// A broadcast point carrying values of type `Args` to every subscriber.
///
/// `Signal` is `Send + Sync`; share it behind an `Arc` to emit from several
/// threads.
pub struct Signal<Args> {
    slots: Arc<Slots<Args>>,
    muted: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Creates a signal with no subscribers.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(SlotMap::with_key())),
            muted: AtomicBool::new(false),
        }
    }

    /// Subscribes `slot` until [`disconnect`](Self::disconnect) is called
    /// with the returned id.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Subscribes `slot` for as long as the returned guard lives.
    ///
    /// The guard holds only a weak reference, so it never keeps the signal
    /// alive and dropping it after the signal is gone does nothing.
    ///
    /// ```
    /// use strata_core::Signal;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let refreshed = Signal::<()>::new();
    /// let hits = Arc::new(AtomicUsize::new(0));
    ///
    /// let counter = hits.clone();
    /// let guard = refreshed.connect_scoped(move |_| {
    ///     counter.fetch_add(1, Ordering::SeqCst);
    /// });
    /// refreshed.emit(());
    /// drop(guard);
    /// refreshed.emit(());
    ///
    /// assert_eq!(hits.load(Ordering::SeqCst), 1);
    /// ```
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard
    where
        F: Fn(&Args) + Send + Sync + 'static,
        Args: Send,
    {
        let id = self.connect(slot);
        let slots = Arc::downgrade(&self.slots);
        ConnectionGuard {
            id,
            detach: Some(Box::new(move |id| {
                if let Some(slots) = Weak::upgrade(&slots) {
                    slots.lock().remove(id);
                }
            })),
        }
    }

    /// Removes one subscription. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    /// Removes every subscription.
    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    /// Number of live subscriptions.
    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// While muted, [`emit`](Self::emit) drops values without calling anyone.
    pub fn set_blocked(&self, blocked: bool) {
        self.muted.store(blocked, Ordering::Release);
    }

    /// Returns `true` while muted.
    pub fn is_blocked(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    /// Delivers `args` to every subscriber and returns how many were called.
    #[tracing::instrument(skip_all, target = "strata_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) -> usize {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "muted, value dropped");
            return 0;
        }

        let snapshot: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        for slot in &snapshot {
            slot(&args);
        }
        tracing::trace!(target: targets::SIGNAL, delivered = snapshot.len(), "emitted");
        snapshot.len()
    }
}

/// Keeps a subscription alive; dropping it unsubscribes.
///
/// Created by [`Signal::connect_scoped`]. The guard does not carry the
/// signal's argument type, so guards for different signals can be stored
/// together.
pub struct ConnectionGuard {
    id: ConnectionId,
    detach: Option<Box<dyn FnOnce(ConnectionId) + Send + Sync>>,
}

impl ConnectionGuard {
    /// The guarded subscription.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Disarms the guard and returns the id; the slot stays subscribed.
    pub fn forget(mut self) -> ConnectionId {
        self.detach = None;
        self.id
    }
}

impl std::fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("id", &self.id)
            .field("armed", &self.detach.is_some())
            .finish()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    static_assertions::assert_impl_all!(Signal<Vec<u8>>: Send, Sync);
    static_assertions::assert_impl_all!(ConnectionGuard: Send, Sync);

    fn recorder<T: Clone + Send + 'static>(signal: &Signal<T>) -> Arc<Mutex<Vec<T>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        signal.connect(move |value: &T| sink.lock().push(value.clone()));
        seen
    }

    #[test]
    fn test_every_subscriber_sees_each_value() {
        let models = Signal::<Vec<u32>>::new();
        let first = recorder(&models);
        let second = recorder(&models);

        assert_eq!(models.emit(vec![1, 2]), 2);
        assert_eq!(models.emit(vec![]), 2);

        assert_eq!(*first.lock(), vec![vec![1, 2], vec![]]);
        assert_eq!(*first.lock(), *second.lock());
    }

    #[test]
    fn test_disconnect_stops_delivery() {
        let signal = Signal::<u8>::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = seen.clone();
        let id = signal.connect(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        signal.emit(0);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(0);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_muted_signal_drops_values() {
        let signal = Signal::<&'static str>::new();
        let seen = recorder(&signal);

        signal.set_blocked(true);
        assert!(signal.is_blocked());
        assert_eq!(signal.emit("lost"), 0);
        signal.set_blocked(false);
        signal.emit("kept");

        assert_eq!(*seen.lock(), vec!["kept"]);
    }

    #[test]
    fn test_disconnect_all() {
        let signal = Signal::<()>::new();
        for _ in 0..4 {
            signal.connect(|_| {});
        }
        assert_eq!(signal.connection_count(), 4);
        signal.disconnect_all();
        assert_eq!(signal.emit(()), 0);
    }

    #[test]
    fn test_guard_scopes_subscription() {
        let signal = Signal::<i32>::new();
        let guard = signal.connect_scoped(|_| {});
        assert_eq!(signal.connection_count(), 1);
        drop(guard);
        assert_eq!(signal.connection_count(), 0);

        // Dropping a guard after its signal is harmless.
        let orphan = signal.connect_scoped(|_| {});
        drop(signal);
        drop(orphan);
    }

    #[test]
    fn test_forgotten_guard_leaves_slot_connected() {
        let signal = Signal::<i32>::new();
        let id = signal.connect_scoped(|_| {}).forget();
        assert_eq!(signal.connection_count(), 1);
        assert!(signal.disconnect(id));
    }

    #[test]
    fn test_slot_may_resubscribe_during_emit() {
        let signal = Arc::new(Signal::<i32>::new());
        let weak = Arc::downgrade(&signal);
        signal.connect(move |_| {
            if let Some(signal) = weak.upgrade() {
                signal.connect(|_| {});
            }
        });

        assert_eq!(signal.emit(0), 1);
        assert_eq!(signal.connection_count(), 2);
    }
}

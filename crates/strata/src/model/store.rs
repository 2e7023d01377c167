//! The authoritative model value, guarded for cross-thread access.

use std::sync::Arc;

use parking_lot::Mutex;
use strata_core::logging::targets;

use super::sections::Sections;

/// A model value stamped with the sequence number of the mutation that
/// produced it.
///
/// Every mutation of a store (a replacement or a move) draws the next number
/// from the store's counter while holding its lock, so sequence order is the
/// order in which values were committed.
#[derive(Debug)]
pub struct Versioned<T> {
    /// Sequence number of the mutation that produced `model`. 0 for the
    /// initial value.
    pub sequence: u64,
    /// The model value.
    pub model: Arc<Sections<T>>,
}

impl<T> Clone for Versioned<T> {
    fn clone(&self) -> Self {
        Self {
            sequence: self.sequence,
            model: Arc::clone(&self.model),
        }
    }
}

/// Owns the committed model under mutual exclusion.
///
/// Critical sections only swap `Arc`s and bump a counter; no diffing, view
/// work, or user callbacks run while the lock is held, so `get` and
/// `replace` may be called from any thread, including from inside a
/// completion callback, without re-entering the lock.
pub struct ModelStore<T> {
    committed: Mutex<Versioned<T>>,
}

impl<T> ModelStore<T> {
    /// Creates a store holding `initial` at sequence 0.
    pub fn new(initial: impl Into<Arc<Sections<T>>>) -> Self {
        Self {
            committed: Mutex::new(Versioned {
                sequence: 0,
                model: initial.into(),
            }),
        }
    }

    /// Returns the committed model.
    ///
    /// This always reflects the most recent `replace`, whether or not the
    /// view has caught up with it yet.
    pub fn get(&self) -> Arc<Sections<T>> {
        Arc::clone(&self.committed.lock().model)
    }

    /// Returns the committed model together with its sequence number.
    pub fn snapshot(&self) -> Versioned<T> {
        self.committed.lock().clone()
    }

    /// Returns the sequence number of the committed model.
    pub fn sequence(&self) -> u64 {
        self.committed.lock().sequence
    }

    /// Commits `model`, returning the previous and the new committed values.
    pub fn replace(&self, model: impl Into<Arc<Sections<T>>>) -> (Versioned<T>, Versioned<T>) {
        let model = model.into();
        let mut committed = self.committed.lock();
        let next = Versioned {
            sequence: committed.sequence + 1,
            model,
        };
        let previous = std::mem::replace(&mut *committed, next.clone());
        drop(committed);

        tracing::trace!(target: targets::STORE, sequence = next.sequence, "model committed");
        (previous, next)
    }

    /// Derives a new model from the committed one and commits it.
    ///
    /// `derive` runs under the lock and must be cheap and non-reentrant; it
    /// returns `None` to leave the store untouched (no sequence is consumed).
    pub(crate) fn update<F>(&self, derive: F) -> Option<(Versioned<T>, Versioned<T>)>
    where
        F: FnOnce(&Sections<T>) -> Option<Sections<T>>,
    {
        let mut committed = self.committed.lock();
        let model = Arc::new(derive(&committed.model)?);
        let next = Versioned {
            sequence: committed.sequence + 1,
            model,
        };
        let previous = std::mem::replace(&mut *committed, next.clone());
        Some((previous, next))
    }
}

impl<T> std::fmt::Debug for ModelStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let committed = self.committed.lock();
        f.debug_struct("ModelStore")
            .field("sequence", &committed.sequence)
            .field("sections", &committed.model.section_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    static_assertions::assert_impl_all!(ModelStore<String>: Send, Sync);

    #[test]
    fn test_get_returns_latest_replace() {
        let store = ModelStore::new(Sections::single(vec![1]));
        assert_eq!(store.sequence(), 0);

        let (old, new) = store.replace(Sections::single(vec![2]));
        assert_eq!(old.sequence, 0);
        assert_eq!(*old.model, Sections::single(vec![1]));
        assert_eq!(new.sequence, 1);
        assert_eq!(*store.get(), Sections::single(vec![2]));
        assert!(Arc::ptr_eq(&store.get(), &new.model));
    }

    #[test]
    fn test_update_skips_sequence_on_none() {
        let store = ModelStore::new(Sections::single(vec![1, 2]));
        assert!(store.update(|_| None).is_none());
        assert_eq!(store.sequence(), 0);

        let (old, new) = store
            .update(|m| Some(Sections::single(m.section(0).unwrap().iter().rev().copied().collect())))
            .unwrap();
        assert_eq!((old.sequence, new.sequence), (0, 1));
        assert_eq!(*store.get(), Sections::single(vec![2, 1]));
    }

    #[test]
    fn test_concurrent_replace_sequences_are_unique() {
        let store = Arc::new(ModelStore::new(Sections::<usize>::default()));
        let mut handles = Vec::new();

        for t in 0..4 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                (0..25)
                    .map(|i| store.replace(Sections::single(vec![t * 100 + i])).1.sequence)
                    .collect::<Vec<_>>()
            }));
        }

        let mut seen: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=100).collect::<Vec<_>>());
        assert_eq!(store.sequence(), 100);
    }
}

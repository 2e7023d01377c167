//! Thread confinement checks for UI-side objects.
//!
//! A list binding is created on the UI thread, and everything that touches the
//! bound view (applying diffs, moving rows, reloading) must stay there. Model
//! updates, on the other hand, may arrive from any thread. [`ThreadAffinity`]
//! records the owning thread and turns a violation into a loud panic in debug
//! builds instead of a torn view.
//!
//! # Example
//!
//! ```
//! use strata_core::thread_check::ThreadAffinity;
//! use std::cell::Cell;
//!
//! struct RowCache {
//!     owner: ThreadAffinity,
//!     rows: Cell<usize>,
//! }
//!
//! impl RowCache {
//!     fn set_rows(&self, rows: usize) {
//!         self.owner.debug_check("RowCache::set_rows");
//!         self.rows.set(rows);
//!     }
//! }
//!
//! let cache = RowCache { owner: ThreadAffinity::current(), rows: Cell::new(0) };
//! cache.set_rows(3);
//! ```

use std::thread::{self, ThreadId};

/// The thread a UI-confined object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl ThreadAffinity {
    /// Binds to the calling thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    /// The owning thread.
    #[inline]
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Returns `true` on the owning thread.
    #[inline]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panics unless called on the owning thread, in every build profile.
    ///
    /// `operation` names the call being checked, e.g. `"ListBinding::bind"`.
    pub fn check(&self, operation: &str) {
        if !self.is_current() {
            self.violation(operation);
        }
    }

    /// Like [`check`](Self::check), but compiled out of release builds.
    #[inline]
    pub fn debug_check(&self, operation: &str) {
        if cfg!(debug_assertions) {
            self.check(operation);
        }
    }

    #[cold]
    #[inline(never)]
    fn violation(&self, operation: &str) -> ! {
        let here = thread::current();
        panic!(
            "{operation} called on thread {:?} ({}), but this object belongs to thread {:?}.\n\
             View work (apply, move, reload, bind) must run on the thread that built the \
             list binding. Push models from other threads with `ModelHandle::set` and drain \
             them with `ListBinding::process_pending` on the owning thread.",
            here.id(),
            here.name().unwrap_or("unnamed"),
            self.owner,
        )
    }
}

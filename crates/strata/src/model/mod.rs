//! Sectioned list models and the update pipeline that keeps a view in sync
//! with them.
//!
//! # Core Types
//!
//! - `Position`: a `(section, row)` coordinate
//! - `Sections`: the immutable-by-convention list model value
//! - `Diff`: positional difference between two models, computed by `diff`
//! - `ListView`: the trait a toolkit widget implements to receive updates
//!
//! # Pipeline
//!
//! - `ModelStore`: the committed model under a short-lived lock
//! - `UpdateScheduler`: diffs on a dedicated worker, last writer wins
//! - `ViewApplier`: sequence-gated batch or full-reload application
//! - `ListBinding` / `ModelHandle`: the UI-side owner and its thread-safe setter
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────┐  set   ┌─────────────┐  (old, new)  ┌─────────────────┐
//! │ ModelHandle │───────>│ ModelStore  │─────────────>│ UpdateScheduler │
//! └─────────────┘        └─────────────┘              └─────────────────┘
//!                                                             │ ApplyRequest
//!                                                             v
//! ┌─────────────┐  ops   ┌─────────────┐  process_pending ┌─────────────┐
//! │  ListView   │<───────│ ViewApplier │<─────────────────│ ListBinding │
//! └─────────────┘        └─────────────┘                  └─────────────┘
//! ```
//!
//! # Positional diffing
//!
//! Rows are compared slot by slot. Inserting or deleting in the middle of a
//! section shifts every later row, which is reported as a run of updates
//! followed by an insert or delete at the tail, never as a single interior
//! insert or delete. Use [`ListBinding::move_item`] for explicit reordering.

mod applier;
mod binding;
mod diff;
mod position;
mod scheduler;
mod sections;
mod store;
mod view;

pub use applier::{ApplyOutcome, ViewApplier, batch_for};
pub use binding::{
    BindingBuilder, BindingConfig, DEFAULT_WORKER_NAME, LifecycleEvent, ListBinding, ModelHandle,
};
#[cfg(feature = "parallel")]
pub use diff::diff_par;
pub use diff::{Diff, SectionChange, diff, diff_eq};
pub use position::Position;
pub use scheduler::{ApplyRequest, Matcher, PendingComputation, UpdateScheduler, Waker};
pub use sections::Sections;
pub use store::{ModelStore, Versioned};
pub use view::{ListView, ViewOp};

//! Core systems for Strata.
//!
//! This crate provides the threading and notification primitives the list
//! pipeline in `strata` is built on:
//!
//! - **Signals**: broadcast values (new models, lifecycle events) to subscribers
//! - **Worker**: one dedicated background thread with a FIFO job queue
//! - **Thread Affinity**: debug checks that UI-confined work stays on its thread
//! - **Logging**: `tracing` targets and span names
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strata_core::{Signal, WorkerBuilder};
//!
//! let progress = Arc::new(Signal::<u32>::new());
//! progress.connect(|percent| println!("{percent}%"));
//!
//! let worker = WorkerBuilder::new().name("loader").build()?;
//! let emitter = progress.clone();
//! worker.send(move || {
//!     emitter.emit(100);
//! })?;
//! worker.stop_and_join();
//! # Ok::<(), strata_core::Error>(())
//! ```

mod error;
pub mod logging;
pub mod signal;
pub mod thread_check;
pub mod worker;

pub use error::{Error, Result};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use thread_check::ThreadAffinity;
pub use worker::{Worker, WorkerBuilder, WorkerConfig};

//! Error types for Strata.

/// Result type alias for Strata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when starting or feeding a background worker.
///
/// None of the list-model failure classes (out-of-range positions, stale
/// diff results) are represented here; those are recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The dedicated worker thread could not be spawned.
    #[error("Failed to spawn worker thread '{name}': {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker has been stopped and no longer accepts jobs.
    #[error("Worker has been stopped")]
    WorkerStopped,

    /// The worker's job queue is at capacity.
    #[error("Worker queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },
}

impl Error {
    /// Create a spawn error.
    pub fn worker_spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::WorkerSpawn {
            name: name.into(),
            source,
        }
    }

    /// Returns `true` if this error means the worker is gone for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WorkerSpawn { .. } | Self::WorkerStopped)
    }
}

//! Core error taxonomy.
//!
//! Two classes of failure flow through this crate and they must never mix:
//!
//! - **Whole-collection failures** (retrieval, configuration) propagate to
//!   the caller as a [`CoreError`]; the affected cache entry is left empty so
//!   the next access retries.
//! - **Per-record failures** (malformed record, ambiguous pairing) are
//!   contained inside the correlation pass: logged, excluded from output,
//!   never escalated. [`CoreError::MalformedRecord`] exists so constructors
//!   can report *why* a record failed; the correlator catches it.

use crate::fetch::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An upstream fetch failed; distinguishable from legitimately-empty.
    /// Retry policy belongs to the fetch collaborator, not this crate.
    #[error("failed to retrieve {what}: {source}")]
    Retrieval {
        what: &'static str,
        #[source]
        source: FetchError,
    },

    /// The fetch succeeded but the resource the collection is built around
    /// was absent (e.g. a patient query returning no patient).
    #[error("upstream returned no {0} resource")]
    MissingResource(&'static str),

    /// Coding configuration or collaborator wiring is missing/invalid.
    /// Fatal to session initialisation, not recoverable per-request.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// An individual record is missing required fields. Callers inside the
    /// correlation pass log and skip; this never crosses the pass boundary.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("failed to read configuration file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("failed to start worker thread: {0}")]
    WorkerSpawn(std::io::Error),

    /// The background queue is at capacity; the task was rejected, not
    /// silently dropped.
    #[error("background queue full, rejected task '{0}'")]
    QueueFull(String),

    /// The worker pool has been shut down.
    #[error("worker pool unavailable, rejected task '{0}'")]
    PoolShutDown(String),
}

impl CoreError {
    /// Shorthand for wrapping a fetch failure with the collection it hit.
    pub fn retrieval(what: &'static str, source: FetchError) -> Self {
        CoreError::Retrieval { what, source }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

//! External collaborator seams.
//!
//! The workspace never talks to the EHR, the recommendation service or the
//! local database directly; it goes through these traits. Implementations
//! own transport, authentication and retry policy. A legitimately empty
//! result is an empty bundle / empty list; [`FetchError`] is reserved for
//! genuine failure, so callers can always tell the two apart.

use crate::model::{Card, CdsHook, GoalModel};
use cuff_fhir::Bundle;

/// Ways an upstream request can fail.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

/// Fetches raw resource bundles from the EHR, one method per logical request.
pub trait ResourceFetcher: Send + Sync {
    fn patient(&self) -> Result<Bundle, FetchError>;
    fn encounters(&self) -> Result<Bundle, FetchError>;
    fn blood_pressure_observations(&self) -> Result<Bundle, FetchError>;
    fn goals(&self) -> Result<Bundle, FetchError>;
    fn medication_statements(&self) -> Result<Bundle, FetchError>;
    fn medication_requests(&self) -> Result<Bundle, FetchError>;
    fn adverse_events(&self) -> Result<Bundle, FetchError>;
}

/// Produces recommendation cards, one list per hook.
pub trait CardBuilder: Send + Sync {
    /// The recommendation hooks available to this session.
    fn hooks(&self) -> Result<Vec<CdsHook>, FetchError>;

    /// The cards for one hook. Card text evaluation happens behind this
    /// seam; the workspace only caches the result.
    fn cards(&self, hook_id: &str) -> Result<Vec<Card>, FetchError>;
}

/// Persistence collaborator for locally owned entities.
///
/// The relational store itself is out of scope; the workspace only needs
/// these narrow views of it.
pub trait LocalStore: Send + Sync {
    /// Find-or-create the internal patient id for a salted id digest.
    fn internal_patient_id(&self, pat_id_hash: &str) -> Result<i64, FetchError>;

    /// Goals created in this application.
    fn local_goals(&self) -> Result<Vec<GoalModel>, FetchError>;

    /// Ids of goal suggestions the user has already responded to; cards drop
    /// these before caching.
    fn responded_goal_ids(&self) -> Result<Vec<String>, FetchError>;
}

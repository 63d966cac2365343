//! # CUFF Core
//!
//! Core business logic for the CUFF clinical reconciliation service.
//!
//! This crate owns two tightly coupled subsystems:
//! - the **observation correlation engine** ([`transform`]): reconciles a
//!   fetched bundle of clinical resources into unified blood-pressure
//!   readings, attributing each to its visit where possible and pairing
//!   orphaned component observations by timestamp where not;
//! - the **session workspace** ([`workspace`]): a per-session, time-expiring,
//!   lazily populated cache of derived collections with background
//!   population and fine-grained invalidation.
//!
//! **No transport concerns**: the EHR client, HTTP surfaces and relational
//! persistence live behind the traits in [`fetch`].

mod builders;

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod transform;
pub mod worker;
pub mod workspace;

pub use cache::DEFAULT_TTL;
pub use config::CodingConfig;
pub use error::{CoreError, CoreResult};
pub use fetch::{CardBuilder, FetchError, LocalStore, ResourceFetcher};
pub use transform::{classify, correlate_blood_pressures, EncounterIndex, ObservationClass};
pub use worker::{TaskHandle, TaskOutcome, WorkerPool};
pub use workspace::{pat_id_hash, CollectionKey, Workspace, WorkspaceSettings};

// Session identity comes from the shared types crate.
pub use cuff_types::SessionId;

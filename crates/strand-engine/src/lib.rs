//! # strand-engine
//!
//! Authoritative state engine for the Strand partition core.
//!
//! This crate turns the ordered record stream into materialized, queryable
//! partition state:
//!
//! - **Processing State**: Tenant-scoped sub-states (forms, processes,
//!   deployments, jobs, process instances) behind one mutable facade
//! - **Appliers**: One deterministic state mutation per (value type, intent)
//!   pair, resolved once at startup
//! - **Deployment Behavior**: Checksum-based versioning and deduplication,
//!   atomic per deployment
//! - **Job Lifecycle**: Activation, completion, failure with bounded retries
//!   and cooperative backoff
//! - **Stream Processor**: The single-threaded loop that replays the log,
//!   processes commands, and appends the resulting records
//!
//! ## Guarantees
//!
//! - **Deterministic**: Appliers are pure functions of (state, record);
//!   replaying the same record sequence from empty state always produces
//!   identical state
//! - **Atomic**: All sub-state mutations of one applied record are visible
//!   together to subsequent reads
//! - **Serialized**: Concurrent intent (e.g., competing job activations) is
//!   funneled through the single-writer command path, not through locks

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod appliers;
pub mod deployment;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod processor;
pub mod state;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::appliers::{EventApplier, EventAppliers};
    pub use crate::deployment::DeploymentBehavior;
    pub use crate::error::{Error, Rejection, RejectionKind, Result};
    pub use crate::jobs::JobLifecycleController;
    pub use crate::processor::{CommandResult, PendingRecord, StreamProcessor};
    pub use crate::state::jobs::{JobEntity, JobStatus};
    pub use crate::state::{ProcessingState, ScheduledTaskStateView};
}

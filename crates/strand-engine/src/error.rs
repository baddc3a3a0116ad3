//! Error types for the state engine.
//!
//! Failures come in three tiers: [`Rejection`]s are expected, caller-facing
//! refusals of a command (wrong-state job, unknown key) and never crash the
//! engine; [`Error::Storage`] covers transient log I/O failures retried at
//! the operation boundary; everything else in [`Error`] — in particular
//! [`Error::Internal`] and [`Error::MissingApplier`] — signals an invariant
//! violation for a record the log already accepted, and the processing loop
//! must stop rather than continue with corrupted state.

use std::fmt;

use strand_core::{Intent, Key, ValueType};

/// The result type used throughout strand-engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in state-engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No applier is registered for an event record's (value type, intent).
    ///
    /// Events are validated before they are appended, so reaching this
    /// during application is a defect in the engine, not in the caller.
    #[error("no applier registered for {value_type:?} {intent:?}")]
    MissingApplier {
        /// The record's value type.
        value_type: ValueType,
        /// The record's intent.
        intent: Intent,
    },

    /// An applied record references a job that is not in partition state.
    #[error("job not found in partition state: {job_key}")]
    JobNotFound {
        /// The job key the record referenced.
        job_key: Key,
    },

    /// An applied record implies a state transition the entity cannot make.
    #[error("invalid state transition: {from} -> {to} ({reason})")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
        /// The reason the transition is invalid.
        reason: String,
    },

    /// A log storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An internal invariant was violated.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },

    /// An error from strand-core.
    #[error("core error: {0}")]
    Core(#[from] strand_core::Error),
}

impl Error {
    /// Creates a new storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new internal (fatal) error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a fatal invalid-transition error.
    #[must_use]
    pub fn invalid_state_transition(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidStateTransition {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }
}

/// Classification of a command rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// The referenced entity does not exist.
    NotFound,
    /// The entity exists but is not in the required state.
    InvalidState,
    /// The command itself is malformed.
    InvalidArgument,
}

/// An expected, caller-facing refusal of a command.
///
/// Rejections are results, not errors: they are reported to the caller (and
/// written to the log as rejection records) so the caller's mental model
/// ("this job is mine to complete") stays falsifiable. They are never
/// retried automatically by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// What class of refusal this is.
    pub kind: RejectionKind,
    /// Human-readable reason, always naming the entity involved.
    pub reason: String,
}

impl Rejection {
    /// Creates a not-found rejection.
    #[must_use]
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            kind: RejectionKind::NotFound,
            reason: reason.into(),
        }
    }

    /// Creates an invalid-state rejection.
    #[must_use]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self {
            kind: RejectionKind::InvalidState,
            reason: reason.into(),
        }
    }

    /// Creates an invalid-argument rejection.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self {
            kind: RejectionKind::InvalidArgument,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.reason)
    }
}

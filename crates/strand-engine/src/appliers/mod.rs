//! Event appliers: the only code that mutates partition state.
//!
//! Each applier handles exactly one (value type, intent) pair and performs a
//! deterministic mutation of [`ProcessingState`]. All inputs come from the
//! record itself, including its log timestamp; appliers never read the wall
//! clock, generate keys, or append records. That is what makes replay from
//! position 0 reproduce identical state.

mod deployments;
mod instances;
mod jobs;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use strand_core::{Intent, Key, Record, RecordKind, RecordValue, ValueType};

use crate::error::{Error, Result};
use crate::state::ProcessingState;

use deployments::{DeploymentCreatedApplier, FormCreatedApplier, ProcessCreatedApplier};
use instances::{
    ElementActivatingApplier, ElementCompletedApplier, ElementTerminatedApplier,
    SequenceFlowTakenApplier,
};
use jobs::{
    JobActivatedApplier, JobBatchActivatedApplier, JobCompletedApplier, JobCreatedApplier,
    JobFailedApplier, JobRetriesUpdatedApplier, JobTimedOutApplier,
};

/// One deterministic state mutation for one (value type, intent) pair.
pub trait EventApplier: Send + Sync {
    /// Applies the event to partition state.
    ///
    /// # Errors
    ///
    /// Returns an error only on invariant violations (an already-accepted
    /// record that cannot be applied); such errors are fatal to the
    /// processing loop.
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()>;
}

/// The applier registry, resolved once at startup.
pub struct EventAppliers {
    appliers: HashMap<(ValueType, Intent), Box<dyn EventApplier>>,
}

impl EventAppliers {
    /// Builds the registry with every supported (value type, intent) pair.
    #[must_use]
    pub fn new() -> Self {
        let mut appliers: HashMap<(ValueType, Intent), Box<dyn EventApplier>> = HashMap::new();
        appliers.insert(
            (ValueType::Deployment, Intent::Created),
            Box::new(DeploymentCreatedApplier),
        );
        appliers.insert(
            (ValueType::Process, Intent::Created),
            Box::new(ProcessCreatedApplier),
        );
        appliers.insert(
            (ValueType::Form, Intent::Created),
            Box::new(FormCreatedApplier),
        );
        appliers.insert(
            (ValueType::Job, Intent::Created),
            Box::new(JobCreatedApplier),
        );
        appliers.insert(
            (ValueType::Job, Intent::Activated),
            Box::new(JobActivatedApplier),
        );
        appliers.insert(
            (ValueType::Job, Intent::Completed),
            Box::new(JobCompletedApplier),
        );
        appliers.insert(
            (ValueType::Job, Intent::Failed),
            Box::new(JobFailedApplier),
        );
        appliers.insert(
            (ValueType::Job, Intent::RetriesUpdated),
            Box::new(JobRetriesUpdatedApplier),
        );
        appliers.insert(
            (ValueType::Job, Intent::TimedOut),
            Box::new(JobTimedOutApplier),
        );
        appliers.insert(
            (ValueType::JobBatch, Intent::Activated),
            Box::new(JobBatchActivatedApplier),
        );
        appliers.insert(
            (ValueType::ProcessInstance, Intent::ElementActivating),
            Box::new(ElementActivatingApplier),
        );
        appliers.insert(
            (ValueType::ProcessInstance, Intent::ElementCompleted),
            Box::new(ElementCompletedApplier),
        );
        appliers.insert(
            (ValueType::ProcessInstance, Intent::ElementTerminated),
            Box::new(ElementTerminatedApplier),
        );
        appliers.insert(
            (ValueType::ProcessInstance, Intent::SequenceFlowTaken),
            Box::new(SequenceFlowTakenApplier),
        );
        Self { appliers }
    }

    /// Applies one record to partition state.
    ///
    /// Commands and rejections are skipped; only events mutate state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApplier`] for an event with no registered
    /// applier, or the applier's own error. Both are fatal.
    pub fn apply(&self, record: &Record, state: &mut ProcessingState) -> Result<()> {
        if record.kind != RecordKind::Event {
            return Ok(());
        }
        let pair = (record.value_type(), record.intent);
        let applier = self
            .appliers
            .get(&pair)
            .ok_or(Error::MissingApplier {
                value_type: pair.0,
                intent: pair.1,
            })?;
        applier.apply_state(record.key, &record.value, record.timestamp, state)
    }
}

impl Default for EventAppliers {
    fn default() -> Self {
        Self::new()
    }
}

fn mismatched_value(expected: &str, value: &RecordValue) -> Error {
    Error::internal(format!(
        "applier expected a {expected} payload, got {:?}",
        value.value_type()
    ))
}

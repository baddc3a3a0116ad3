//! Appliers for deployment, process, and form CREATED events.

use chrono::{DateTime, Utc};
use strand_core::{Key, RecordValue};

use crate::error::Result;
use crate::state::ProcessingState;
use crate::state::deployments::PersistedDeployment;
use crate::state::forms::PersistedForm;
use crate::state::processes::PersistedProcess;

use super::{EventApplier, mismatched_value};

/// Stores the per-resource version decisions of an accepted deployment.
pub(super) struct DeploymentCreatedApplier;

impl EventApplier for DeploymentCreatedApplier {
    fn apply_state(
        &self,
        _key: Key,
        value: &RecordValue,
        timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        let RecordValue::Deployment(deployment) = value else {
            return Err(mismatched_value("deployment", value));
        };
        state
            .deployments_mut()
            .put_deployment(PersistedDeployment::from_record(deployment, timestamp));
        Ok(())
    }
}

/// Persists a new process definition version.
pub(super) struct ProcessCreatedApplier;

impl EventApplier for ProcessCreatedApplier {
    fn apply_state(
        &self,
        _key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        let RecordValue::Process(process) = value else {
            return Err(mismatched_value("process", value));
        };
        state
            .processes_mut()
            .put_process(PersistedProcess::from_record(process));
        Ok(())
    }
}

/// Persists a new form version.
pub(super) struct FormCreatedApplier;

impl EventApplier for FormCreatedApplier {
    fn apply_state(
        &self,
        _key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        let RecordValue::Form(form) = value else {
            return Err(mismatched_value("form", value));
        };
        state.forms_mut().put_form(PersistedForm::from_record(form));
        Ok(())
    }
}

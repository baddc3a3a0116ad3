//! Appliers for process instance element events.

use chrono::{DateTime, Utc};
use strand_core::{Key, RecordValue};

use crate::error::Result;
use crate::state::ProcessingState;
use crate::state::instances::ElementInstance;

use super::{EventApplier, mismatched_value};

fn instance_value<'a>(
    value: &'a RecordValue,
) -> Result<&'a strand_core::record::ProcessInstanceRecord> {
    match value {
        RecordValue::ProcessInstance(instance) => Ok(instance),
        other => Err(mismatched_value("process instance", other)),
    }
}

/// Stores a newly activating element instance.
pub(super) struct ElementActivatingApplier;

impl EventApplier for ElementActivatingApplier {
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        let instance = instance_value(value)?;
        state
            .instances_mut()
            .on_element_activating(ElementInstance::from_record(key, instance));
        Ok(())
    }
}

/// Marks an element instance completed.
pub(super) struct ElementCompletedApplier;

impl EventApplier for ElementCompletedApplier {
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        instance_value(value)?;
        state.instances_mut().on_element_completed(key)
    }
}

/// Marks an element instance terminated.
pub(super) struct ElementTerminatedApplier;

impl EventApplier for ElementTerminatedApplier {
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        instance_value(value)?;
        state.instances_mut().on_element_terminated(key)
    }
}

/// Sequence flows are transient; the record exists for projections, not for
/// partition state.
pub(super) struct SequenceFlowTakenApplier;

impl EventApplier for SequenceFlowTakenApplier {
    fn apply_state(
        &self,
        _key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        _state: &mut ProcessingState,
    ) -> Result<()> {
        instance_value(value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ScheduledTaskStateView;
    use crate::state::instances::ElementState;
    use strand_core::record::{ElementType, ProcessInstanceRecord};

    fn instance_record() -> RecordValue {
        RecordValue::ProcessInstance(ProcessInstanceRecord {
            process_instance_key: Key::new(1),
            process_definition_key: Key::new(100),
            process_id: "order-process".to_string(),
            version: 1,
            element_id: "order-process".to_string(),
            element_type: ElementType::Process,
            parent_process_instance_key: None,
            parent_element_instance_key: None,
            parent_element_id: None,
            tenant_id: "tenant-1".to_string(),
        })
    }

    #[test]
    fn element_lifecycle_is_applied() {
        let mut state = ProcessingState::new();
        let value = instance_record();
        let key = Key::new(1);
        let now = Utc::now();

        ElementActivatingApplier
            .apply_state(key, &value, now, &mut state)
            .unwrap();
        ElementCompletedApplier
            .apply_state(key, &value, now, &mut state)
            .unwrap();

        assert_eq!(
            state
                .process_instance_state()
                .find_instance(key)
                .map(|i| i.state),
            Some(ElementState::Completed)
        );
    }
}

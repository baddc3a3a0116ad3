//! Process instance element sub-state.

use std::collections::HashMap;

use strand_core::{Key, record::{ElementType, ProcessInstanceRecord}};

use crate::error::{Error, Result};

/// Lifecycle state of an element instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// The element is active.
    Active,
    /// The element completed normally.
    Completed,
    /// The element was terminated.
    Terminated,
}

/// One element instance of a process instance.
///
/// The process instance itself is an element instance too, of type
/// [`ElementType::Process`], keyed by the process instance key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInstance {
    /// Key of this element instance.
    pub key: Key,
    /// Key of the owning process instance.
    pub process_instance_key: Key,
    /// Key of the deployed process definition.
    pub process_definition_key: Key,
    /// Stable process id of the definition.
    pub process_id: String,
    /// Version of the definition.
    pub version: u32,
    /// Id of the element.
    pub element_id: String,
    /// Type of the element.
    pub element_type: ElementType,
    /// Parent process instance, when spawned via a call activity.
    pub parent_process_instance_key: Option<Key>,
    /// Flow node instance of the spawning call activity.
    pub parent_element_instance_key: Option<Key>,
    /// Element id of the spawning call activity.
    pub parent_element_id: Option<String>,
    /// Current lifecycle state.
    pub state: ElementState,
    /// Owning tenant.
    pub tenant_id: String,
}

impl ElementInstance {
    /// Builds an active element instance from an ELEMENT_ACTIVATING payload.
    #[must_use]
    pub fn from_record(key: Key, value: &ProcessInstanceRecord) -> Self {
        Self {
            key,
            process_instance_key: value.process_instance_key,
            process_definition_key: value.process_definition_key,
            process_id: value.process_id.clone(),
            version: value.version,
            element_id: value.element_id.clone(),
            element_type: value.element_type,
            parent_process_instance_key: value.parent_process_instance_key,
            parent_element_instance_key: value.parent_element_instance_key,
            parent_element_id: value.parent_element_id.clone(),
            state: ElementState::Active,
            tenant_id: value.tenant_id.clone(),
        }
    }
}

/// All element instances of one partition.
#[derive(Debug, Default)]
pub struct ProcessInstanceState {
    instances: HashMap<u64, ElementInstance>,
}

impl ProcessInstanceState {
    /// Looks up an element instance by key.
    #[must_use]
    pub fn find_instance(&self, key: Key) -> Option<&ElementInstance> {
        self.instances.get(&key.value())
    }

    /// Stores a newly activating element instance.
    pub fn on_element_activating(&mut self, instance: ElementInstance) {
        self.instances.insert(instance.key.value(), instance);
    }

    /// Marks an element instance completed.
    pub fn on_element_completed(&mut self, key: Key) -> Result<()> {
        self.instance_mut(key)?.state = ElementState::Completed;
        Ok(())
    }

    /// Marks an element instance terminated.
    pub fn on_element_terminated(&mut self, key: Key) -> Result<()> {
        self.instance_mut(key)?.state = ElementState::Terminated;
        Ok(())
    }

    /// Returns all element instances, sorted by key for deterministic
    /// comparison.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ElementInstance> {
        let mut instances: Vec<_> = self.instances.values().cloned().collect();
        instances.sort_by_key(|instance| instance.key);
        instances
    }

    fn instance_mut(&mut self, key: Key) -> Result<&mut ElementInstance> {
        self.instances
            .get_mut(&key.value())
            .ok_or_else(|| Error::internal(format!("unknown element instance {key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(key: u64, element_type: ElementType) -> ElementInstance {
        ElementInstance {
            key: Key::new(key),
            process_instance_key: Key::new(key),
            process_definition_key: Key::new(100),
            process_id: "order-process".to_string(),
            version: 1,
            element_id: "order-process".to_string(),
            element_type,
            parent_process_instance_key: None,
            parent_element_instance_key: None,
            parent_element_id: None,
            state: ElementState::Active,
            tenant_id: "tenant-1".to_string(),
        }
    }

    #[test]
    fn tracks_element_lifecycle() {
        let mut state = ProcessInstanceState::default();
        state.on_element_activating(instance(1, ElementType::Process));
        assert_eq!(
            state.find_instance(Key::new(1)).map(|i| i.state),
            Some(ElementState::Active)
        );

        state.on_element_completed(Key::new(1)).unwrap();
        assert_eq!(
            state.find_instance(Key::new(1)).map(|i| i.state),
            Some(ElementState::Completed)
        );
    }

    #[test]
    fn completing_an_unknown_instance_is_an_error() {
        let mut state = ProcessInstanceState::default();
        assert!(state.on_element_completed(Key::new(9)).is_err());
    }
}

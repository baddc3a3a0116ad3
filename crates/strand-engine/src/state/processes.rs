//! Process definitions sub-state.

use strand_core::{Key, record::ProcessRecord};

use super::versions::{VersionedResource, VersionedResources};

/// A persisted, versioned process definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedProcess {
    /// Stable, human-chosen process id.
    pub process_id: String,
    /// System-assigned process definition key.
    pub process_definition_key: Key,
    /// Version, strictly increasing per (process id, tenant).
    pub version: u32,
    /// Resource file name.
    pub resource_name: String,
    /// Hex-encoded content checksum.
    pub checksum: String,
    /// Raw resource content.
    pub resource: Vec<u8>,
    /// Deployment that introduced this version.
    pub deployment_key: Key,
    /// Owning tenant.
    pub tenant_id: String,
}

impl PersistedProcess {
    /// Builds the persisted process from a PROCESS CREATED record payload.
    #[must_use]
    pub fn from_record(value: &ProcessRecord) -> Self {
        Self {
            process_id: value.process_id.clone(),
            process_definition_key: value.process_definition_key,
            version: value.version,
            resource_name: value.resource_name.clone(),
            checksum: value.checksum.clone(),
            resource: value.resource.clone(),
            deployment_key: value.deployment_key,
            tenant_id: value.tenant_id.clone(),
        }
    }
}

impl VersionedResource for PersistedProcess {
    fn resource_id(&self) -> &str {
        &self.process_id
    }

    fn key(&self) -> Key {
        self.process_definition_key
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn deployment_key(&self) -> Key {
        self.deployment_key
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

/// All persisted process definitions of one partition.
#[derive(Debug, Default)]
pub struct ProcessState {
    processes: VersionedResources<PersistedProcess>,
}

impl ProcessState {
    /// Stores a process definition version.
    pub fn put_process(&mut self, process: PersistedProcess) {
        self.processes.put(process);
    }

    /// Looks up a process definition by its system key, scoped by tenant.
    #[must_use]
    pub fn find_process_by_key(&self, key: Key, tenant: &str) -> Option<&PersistedProcess> {
        self.processes.find_by_key(key, tenant)
    }

    /// Returns the highest version of the process with the given id.
    #[must_use]
    pub fn find_latest_process_by_id(
        &self,
        process_id: &str,
        tenant: &str,
    ) -> Option<&PersistedProcess> {
        self.processes.find_latest_by_id(process_id, tenant)
    }

    /// Returns the highest persisted version number for `(process id, tenant)`.
    #[must_use]
    pub fn latest_process_version(&self, process_id: &str, tenant: &str) -> Option<u32> {
        self.processes.latest_version(process_id, tenant)
    }

    /// Returns all persisted processes, sorted by (tenant, key) for
    /// deterministic comparison.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PersistedProcess> {
        let mut processes: Vec<_> = self.processes.iter().cloned().collect();
        processes.sort_by(|a, b| {
            (a.tenant_id.as_str(), a.process_definition_key)
                .cmp(&(b.tenant_id.as_str(), b.process_definition_key))
        });
        processes
    }
}

//! Form definitions sub-state.

use strand_core::{Key, record::FormRecord};

use super::versions::{VersionedResource, VersionedResources};

/// A persisted, versioned form definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedForm {
    /// Stable, human-chosen form id.
    pub form_id: String,
    /// System-assigned form key.
    pub form_key: Key,
    /// Version, strictly increasing per (form id, tenant).
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

impl PersistedForm {
    /// Builds the persisted form from a FORM CREATED record payload.
    #[must_use]
    pub fn from_record(value: &FormRecord) -> Self {
        Self {
            form_id: value.form_id.clone(),
            form_key: value.form_key,
            version: value.version,
            resource_name: value.resource_name.clone(),
            checksum: value.checksum.clone(),
            resource: value.resource.clone(),
            deployment_key: value.deployment_key,
            tenant_id: value.tenant_id.clone(),
        }
    }
}

impl VersionedResource for PersistedForm {
    fn resource_id(&self) -> &str {
        &self.form_id
    }

    fn key(&self) -> Key {
        self.form_key
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

/// All persisted form definitions of one partition.
#[derive(Debug, Default)]
pub struct FormState {
    forms: VersionedResources<PersistedForm>,
}

impl FormState {
    /// Stores a form version.
    pub fn put_form(&mut self, form: PersistedForm) {
        self.forms.put(form);
    }

    /// Looks up a form by its system key, scoped by tenant.
    #[must_use]
    pub fn find_form_by_key(&self, key: Key, tenant: &str) -> Option<&PersistedForm> {
        self.forms.find_by_key(key, tenant)
    }

    /// Returns the highest version of the form with the given id.
    #[must_use]
    pub fn find_latest_form_by_id(&self, form_id: &str, tenant: &str) -> Option<&PersistedForm> {
        self.forms.find_latest_by_id(form_id, tenant)
    }

    /// Returns the form version introduced by the given deployment.
    #[must_use]
    pub fn find_form_by_id_and_deployment_key(
        &self,
        form_id: &str,
        deployment_key: Key,
        tenant: &str,
    ) -> Option<&PersistedForm> {
        self.forms
            .find_by_id_and_deployment_key(form_id, deployment_key, tenant)
    }

    /// Returns the highest persisted version number for `(form id, tenant)`.
    #[must_use]
    pub fn latest_form_version(&self, form_id: &str, tenant: &str) -> Option<u32> {
        self.forms.latest_version(form_id, tenant)
    }

    /// Returns all persisted forms, sorted by (tenant, key) for
    /// deterministic comparison.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PersistedForm> {
        let mut forms: Vec<_> = self.forms.iter().cloned().collect();
        forms.sort_by(|a, b| {
            (a.tenant_id.as_str(), a.form_key).cmp(&(b.tenant_id.as_str(), b.form_key))
        });
        forms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TENANT_1: &str = "tenant-1";
    const TENANT_2: &str = "tenant-2";

    fn sample_form(key: u64, id: &str, version: u32, deployment_key: u64, tenant: &str) -> PersistedForm {
        PersistedForm {
            form_id: id.to_string(),
            form_key: Key::new(key),
            version,
            resource_name: format!("{id}.form"),
            checksum: format!("checksum-{key}"),
            resource: b"resource".to_vec(),
            deployment_key: Key::new(deployment_key),
            tenant_id: tenant.to_string(),
        }
    }

    #[test]
    fn stores_and_finds_form_by_key() {
        let mut state = FormState::default();
        let form = sample_form(1, "form-id", 1, 1, TENANT_1);
        state.put_form(form.clone());

        assert_eq!(state.find_form_by_key(Key::new(1), TENANT_1), Some(&form));
        assert_eq!(state.find_form_by_key(Key::new(1), TENANT_2), None);
    }

    #[test]
    fn finds_latest_by_form_id() {
        let mut state = FormState::default();
        state.put_form(sample_form(1, "form-id", 1, 1, TENANT_1));
        let v2 = sample_form(2, "form-id", 2, 2, TENANT_1);
        state.put_form(v2.clone());

        assert_eq!(
            state.find_latest_form_by_id("form-id", TENANT_1),
            Some(&v2)
        );
        assert_eq!(state.latest_form_version("form-id", TENANT_1), Some(2));
    }

    #[test]
    fn finds_form_by_id_and_deployment_key() {
        let mut state = FormState::default();
        state.put_form(sample_form(1, "form-1", 1, 1, TENANT_1));
        state.put_form(sample_form(2, "form-2", 1, 1, TENANT_1));
        state.put_form(sample_form(3, "form-1", 2, 2, TENANT_1));

        let v1 = state.find_form_by_id_and_deployment_key("form-1", Key::new(1), TENANT_1);
        assert_eq!(v1.map(|f| f.version), Some(1));
        let v2 = state.find_form_by_id_and_deployment_key("form-1", Key::new(2), TENANT_1);
        assert_eq!(v2.map(|f| f.version), Some(2));
        // form-2 was not part of deployment 2
        assert!(
            state
                .find_form_by_id_and_deployment_key("form-2", Key::new(2), TENANT_1)
                .is_none()
        );
    }

    #[test]
    fn same_form_id_is_isolated_per_tenant() {
        let mut state = FormState::default();
        let t1 = sample_form(1, "form-id", 1, 1, TENANT_1);
        let t2 = sample_form(1, "form-id", 1, 1, TENANT_2);
        state.put_form(t1.clone());
        state.put_form(t2.clone());

        assert_eq!(state.find_latest_form_by_id("form-id", TENANT_1), Some(&t1));
        assert_eq!(state.find_latest_form_by_id("form-id", TENANT_2), Some(&t2));
    }
}

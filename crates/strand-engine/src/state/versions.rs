//! Shared storage for versioned, deployable resources.
//!
//! Forms and process definitions follow the same persistence rules: a
//! resource is identified by `(id, tenant)`, carries a system-assigned key
//! and a strictly increasing version, and "latest" always means the highest
//! version. This module holds that logic once; the typed sub-states wrap it.

use std::collections::{BTreeMap, HashMap};

use strand_core::Key;

/// A versioned resource persisted per `(id, tenant)`.
pub(crate) trait VersionedResource {
    /// Stable, human-chosen resource id.
    fn resource_id(&self) -> &str;
    /// System-assigned key.
    fn key(&self) -> Key;
    /// Version, monotonic per (id, tenant).
    fn version(&self) -> u32;
    /// Deployment that introduced this version.
    fn deployment_key(&self) -> Key;
    /// Owning tenant.
    fn tenant_id(&self) -> &str;
}

/// Version-indexed storage for one resource kind.
#[derive(Debug)]
pub(crate) struct VersionedResources<R> {
    /// (tenant, key) -> resource.
    by_key: HashMap<(String, u64), R>,
    /// (tenant, id) -> version -> key. BTreeMap keeps versions ordered so
    /// "latest" is the last entry.
    versions: HashMap<(String, String), BTreeMap<u32, Key>>,
}

impl<R> Default for VersionedResources<R> {
    fn default() -> Self {
        Self {
            by_key: HashMap::new(),
            versions: HashMap::new(),
        }
    }
}

impl<R: VersionedResource> VersionedResources<R> {
    /// Stores a resource version. Later versions of the same `(id, tenant)`
    /// shadow earlier ones in the latest-version lookup.
    pub(crate) fn put(&mut self, resource: R) {
        let tenant = resource.tenant_id().to_string();
        let id = resource.resource_id().to_string();
        self.versions
            .entry((tenant.clone(), id))
            .or_default()
            .insert(resource.version(), resource.key());
        self.by_key.insert((tenant, resource.key().value()), resource);
    }

    /// Looks up a resource by its system key, scoped by tenant.
    pub(crate) fn find_by_key(&self, key: Key, tenant: &str) -> Option<&R> {
        self.by_key.get(&(tenant.to_string(), key.value()))
    }

    /// Returns the highest version of the resource with the given id.
    pub(crate) fn find_latest_by_id(&self, id: &str, tenant: &str) -> Option<&R> {
        let versions = self.versions.get(&(tenant.to_string(), id.to_string()))?;
        let (_, key) = versions.iter().next_back()?;
        self.find_by_key(*key, tenant)
    }

    /// Returns the version of the resource introduced by the given
    /// deployment, if any.
    pub(crate) fn find_by_id_and_deployment_key(
        &self,
        id: &str,
        deployment_key: Key,
        tenant: &str,
    ) -> Option<&R> {
        let versions = self.versions.get(&(tenant.to_string(), id.to_string()))?;
        versions
            .values()
            .filter_map(|key| self.find_by_key(*key, tenant))
            .find(|resource| resource.deployment_key() == deployment_key)
    }

    /// Returns the highest persisted version number for `(id, tenant)`.
    pub(crate) fn latest_version(&self, id: &str, tenant: &str) -> Option<u32> {
        self.versions
            .get(&(tenant.to_string(), id.to_string()))?
            .keys()
            .next_back()
            .copied()
    }

    /// Iterates all stored resources in unspecified order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &R> {
        self.by_key.values()
    }
}

//! Deployments sub-state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use strand_core::Key;
use strand_core::record::{DeploymentRecord, FormMetadata, ProcessMetadata};

/// A persisted deployment: the version decisions made for its resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDeployment {
    /// System-assigned deployment key, monotonic and distinct from any
    /// resource key or version.
    pub deployment_key: Key,
    /// Process version decisions.
    pub processes: Vec<ProcessMetadata>,
    /// Form version decisions.
    pub forms: Vec<FormMetadata>,
    /// When the deployment was applied.
    pub deployed_at: DateTime<Utc>,
    /// Owning tenant.
    pub tenant_id: String,
}

impl PersistedDeployment {
    /// Builds the persisted deployment from a DEPLOYMENT CREATED payload.
    #[must_use]
    pub fn from_record(value: &DeploymentRecord, deployed_at: DateTime<Utc>) -> Self {
        Self {
            deployment_key: value.deployment_key,
            processes: value.processes.clone(),
            forms: value.forms.clone(),
            deployed_at,
            tenant_id: value.tenant_id.clone(),
        }
    }
}

/// All persisted deployments of one partition.
#[derive(Debug, Default)]
pub struct DeploymentState {
    /// (tenant, deployment key) -> deployment.
    deployments: HashMap<(String, u64), PersistedDeployment>,
}

impl DeploymentState {
    /// Stores a deployment.
    pub fn put_deployment(&mut self, deployment: PersistedDeployment) {
        self.deployments.insert(
            (
                deployment.tenant_id.clone(),
                deployment.deployment_key.value(),
            ),
            deployment,
        );
    }

    /// Looks up a deployment by key, scoped by tenant.
    #[must_use]
    pub fn find_deployment(&self, key: Key, tenant: &str) -> Option<&PersistedDeployment> {
        self.deployments.get(&(tenant.to_string(), key.value()))
    }

    /// Returns all deployments, sorted by (tenant, key) for deterministic
    /// comparison.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PersistedDeployment> {
        let mut deployments: Vec<_> = self.deployments.values().cloned().collect();
        deployments.sort_by(|a, b| {
            (a.tenant_id.as_str(), a.deployment_key)
                .cmp(&(b.tenant_id.as_str(), b.deployment_key))
        });
        deployments
    }
}

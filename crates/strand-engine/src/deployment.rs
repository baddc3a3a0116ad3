//! Deployment versioning and deduplication.
//!
//! A deployment command carries one or more raw resources. Each resource is
//! classified by file extension, identified by its file stem, and compared
//! by content checksum against the latest persisted version of the same
//! `(id, tenant)`. An unchanged resource is a duplicate: it keeps its
//! existing key and version and produces no CREATED event. A changed or new
//! resource gets a fresh key and the next version.
//!
//! Duplicate detection is decided per resource. Redeploying two resources
//! where only one changed bumps only the changed one.

use std::collections::HashSet;
use std::path::Path;

use strand_core::checksum::resource_checksum;
use strand_core::tenant::tenant_or_default;
use strand_core::record::{
    DeploymentRecord, DeploymentResource, FormMetadata, FormRecord, ProcessMetadata, ProcessRecord,
};
use strand_core::{Intent, Key, KeyGenerator, RecordKind, RecordValue};
use tracing::debug;

use crate::error::Rejection;
use crate::processor::PendingRecord;
use crate::state::{ProcessingState, ScheduledTaskStateView};

enum ResourceKind {
    Process,
    Form,
}

fn classify(resource_name: &str) -> Option<ResourceKind> {
    match Path::new(resource_name).extension().and_then(|e| e.to_str()) {
        Some("bpmn") => Some(ResourceKind::Process),
        Some("form") => Some(ResourceKind::Form),
        _ => None,
    }
}

fn resource_id(resource_name: &str) -> Option<String> {
    Path::new(resource_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

/// Transforms DEPLOYMENT CREATE commands into version decisions and events.
///
/// The whole deployment is atomic: any invalid resource rejects the command
/// and nothing is persisted.
#[derive(Debug, Default)]
pub struct DeploymentBehavior;

impl DeploymentBehavior {
    /// Decides versions for every resource and produces the follow-up
    /// events: one CREATED event per non-duplicate resource, then the
    /// DEPLOYMENT CREATED event carrying all per-resource decisions.
    ///
    /// # Errors
    ///
    /// Returns a rejection when the deployment is empty, a resource has an
    /// unsupported extension or no usable file stem, or two resources of the
    /// same kind share an id.
    pub fn transform(
        &self,
        command: &DeploymentRecord,
        state: &ProcessingState,
        keys: &mut KeyGenerator,
    ) -> Result<Vec<PendingRecord>, Rejection> {
        if command.resources.is_empty() {
            return Err(Rejection::invalid_argument(
                "expected at least one resource to deploy, but the deployment was empty",
            ));
        }

        let tenant = tenant_or_default(&command.tenant_id)
            .map_err(|err| Rejection::invalid_argument(err.to_string()))?;
        let deployment_key = keys.next_key();

        let mut seen_ids: HashSet<(u8, String)> = HashSet::new();
        let mut processes = Vec::new();
        let mut forms = Vec::new();
        let mut records = Vec::new();

        for resource in &command.resources {
            let Some(kind) = classify(&resource.resource_name) else {
                return Err(Rejection::invalid_argument(format!(
                    "expected a .bpmn or .form resource, but '{}' has an unsupported extension",
                    resource.resource_name
                )));
            };
            let Some(id) = resource_id(&resource.resource_name) else {
                return Err(Rejection::invalid_argument(format!(
                    "expected a resource file name with a stem, got '{}'",
                    resource.resource_name
                )));
            };
            let kind_tag = match kind {
                ResourceKind::Process => 0u8,
                ResourceKind::Form => 1u8,
            };
            if !seen_ids.insert((kind_tag, id.clone())) {
                return Err(Rejection::invalid_argument(format!(
                    "expected unique resource ids within one deployment, but '{id}' appears twice"
                )));
            }

            let checksum = resource_checksum(&resource.resource);
            match kind {
                ResourceKind::Process => {
                    let decision = self.decide_process(
                        &id, &checksum, resource, deployment_key, state, tenant.as_str(), keys,
                    );
                    if let Some(record) = decision.1 {
                        records.push(record);
                    }
                    processes.push(decision.0);
                }
                ResourceKind::Form => {
                    let decision = self.decide_form(
                        &id, &checksum, resource, deployment_key, state, tenant.as_str(), keys,
                    );
                    if let Some(record) = decision.1 {
                        records.push(record);
                    }
                    forms.push(decision.0);
                }
            }
        }

        debug!(
            deployment_key = %deployment_key,
            processes = processes.len(),
            forms = forms.len(),
            new_records = records.len(),
            "deployment transformed"
        );

        records.push(PendingRecord {
            key: deployment_key,
            intent: Intent::Created,
            kind: RecordKind::Event,
            rejection_reason: None,
            value: RecordValue::Deployment(DeploymentRecord {
                deployment_key,
                resources: command.resources.clone(),
                processes,
                forms,
                tenant_id: tenant.to_string(),
            }),
        });
        Ok(records)
    }

    #[allow(clippy::too_many_arguments)]
    fn decide_process(
        &self,
        id: &str,
        checksum: &str,
        resource: &DeploymentResource,
        deployment_key: Key,
        state: &ProcessingState,
        tenant: &str,
        keys: &mut KeyGenerator,
    ) -> (ProcessMetadata, Option<PendingRecord>) {
        if let Some(latest) = state.process_state().find_latest_process_by_id(id, tenant) {
            if latest.checksum == checksum {
                return (
                    ProcessMetadata {
                        process_id: id.to_string(),
                        process_definition_key: latest.process_definition_key,
                        version: latest.version,
                        checksum: checksum.to_string(),
                        is_duplicate: true,
                        resource_name: resource.resource_name.clone(),
                    },
                    None,
                );
            }
        }

        let version = state
            .process_state()
            .latest_process_version(id, tenant)
            .map_or(1, |v| v + 1);
        let key = keys.next_key();
        let metadata = ProcessMetadata {
            process_id: id.to_string(),
            process_definition_key: key,
            version,
            checksum: checksum.to_string(),
            is_duplicate: false,
            resource_name: resource.resource_name.clone(),
        };
        let record = PendingRecord {
            key,
            intent: Intent::Created,
            kind: RecordKind::Event,
            rejection_reason: None,
            value: RecordValue::Process(ProcessRecord {
                process_id: id.to_string(),
                process_definition_key: key,
                version,
                resource_name: resource.resource_name.clone(),
                checksum: checksum.to_string(),
                resource: resource.resource.clone(),
                deployment_key,
                tenant_id: tenant.to_string(),
            }),
        };
        (metadata, Some(record))
    }

    #[allow(clippy::too_many_arguments)]
    fn decide_form(
        &self,
        id: &str,
        checksum: &str,
        resource: &DeploymentResource,
        deployment_key: Key,
        state: &ProcessingState,
        tenant: &str,
        keys: &mut KeyGenerator,
    ) -> (FormMetadata, Option<PendingRecord>) {
        if let Some(latest) = state.form_state().find_latest_form_by_id(id, tenant) {
            if latest.checksum == checksum {
                return (
                    FormMetadata {
                        form_id: id.to_string(),
                        form_key: latest.form_key,
                        version: latest.version,
                        checksum: checksum.to_string(),
                        is_duplicate: true,
                        resource_name: resource.resource_name.clone(),
                    },
                    None,
                );
            }
        }

        let version = state
            .form_state()
            .latest_form_version(id, tenant)
            .map_or(1, |v| v + 1);
        let key = keys.next_key();
        let metadata = FormMetadata {
            form_id: id.to_string(),
            form_key: key,
            version,
            checksum: checksum.to_string(),
            is_duplicate: false,
            resource_name: resource.resource_name.clone(),
        };
        let record = PendingRecord {
            key,
            intent: Intent::Created,
            kind: RecordKind::Event,
            rejection_reason: None,
            value: RecordValue::Form(FormRecord {
                form_id: id.to_string(),
                form_key: key,
                version,
                resource_name: resource.resource_name.clone(),
                checksum: checksum.to_string(),
                resource: resource.resource.clone(),
                deployment_key,
                tenant_id: tenant.to_string(),
            }),
        };
        (metadata, Some(record))
    }
}

//! Deployment versioning and deduplication, end to end through the
//! processing loop.

use std::sync::Arc;

use strand_core::log::{InMemoryLogStorage, LogStorage};
use strand_core::record::{DeploymentRecord, DeploymentResource, FormMetadata, ProcessMetadata};
use strand_core::{Intent, Key, RecordKind, RecordValue, ValueType};
use strand_engine::prelude::*;

fn processor() -> StreamProcessor {
    let storage: Arc<dyn LogStorage> = Arc::new(InMemoryLogStorage::new());
    StreamProcessor::new(1, storage)
}

fn deploy(
    processor: &mut StreamProcessor,
    resources: &[(&str, &[u8])],
) -> strand_engine::processor::CommandResult {
    let value = RecordValue::Deployment(DeploymentRecord {
        deployment_key: Key::new(0),
        resources: resources
            .iter()
            .map(|(name, content)| DeploymentResource {
                resource_name: (*name).to_string(),
                resource: content.to_vec(),
            })
            .collect(),
        processes: Vec::new(),
        forms: Vec::new(),
        tenant_id: "tenant-1".to_string(),
    });
    processor
        .process_command(None, Intent::Create, value)
        .expect("deployment must process")
}

fn deployment_event(result: &strand_engine::processor::CommandResult) -> DeploymentRecord {
    let record = result
        .records
        .iter()
        .find(|r| r.kind == RecordKind::Event && r.value_type() == ValueType::Deployment)
        .expect("deployment event must be appended");
    match &record.value {
        RecordValue::Deployment(deployment) => deployment.clone(),
        other => panic!("unexpected payload {other:?}"),
    }
}

fn process_meta<'a>(event: &'a DeploymentRecord, id: &str) -> &'a ProcessMetadata {
    event
        .processes
        .iter()
        .find(|p| p.process_id == id)
        .expect("process decision missing")
}

fn form_meta<'a>(event: &'a DeploymentRecord, id: &str) -> &'a FormMetadata {
    event
        .forms
        .iter()
        .find(|f| f.form_id == id)
        .expect("form decision missing")
}

fn created_events(result: &strand_engine::processor::CommandResult, vt: ValueType) -> usize {
    result
        .records
        .iter()
        .filter(|r| r.kind == RecordKind::Event && r.intent == Intent::Created)
        .filter(|r| r.value_type() == vt)
        .count()
}

#[test]
fn redeploying_one_changed_resource_bumps_only_that_resource() {
    let mut processor = processor();

    let first = deploy(
        &mut processor,
        &[("order.bpmn", b"process-v1"), ("order-form.form", b"form-v1")],
    );
    let first_event = deployment_event(&first);
    let process_v1 = process_meta(&first_event, "order").clone();
    let form_v1 = form_meta(&first_event, "order-form").clone();
    assert_eq!(process_v1.version, 1);
    assert_eq!(form_v1.version, 1);

    // redeploy: process unchanged, form changed
    let second = deploy(
        &mut processor,
        &[("order.bpmn", b"process-v1"), ("order-form.form", b"form-v2")],
    );
    let second_event = deployment_event(&second);

    let process = process_meta(&second_event, "order");
    assert!(process.is_duplicate);
    assert_eq!(process.version, 1);
    assert_eq!(process.process_definition_key, process_v1.process_definition_key);

    let form = form_meta(&second_event, "order-form");
    assert!(!form.is_duplicate);
    assert_eq!(form.version, 2);
    assert_ne!(form.form_key, form_v1.form_key);

    // exactly one resource CREATED event: the changed form
    assert_eq!(created_events(&second, ValueType::Process), 0);
    assert_eq!(created_events(&second, ValueType::Form), 1);
}

#[test]
fn identical_redeploy_creates_no_resource_events() {
    let mut processor = processor();

    deploy(
        &mut processor,
        &[("order.bpmn", b"process-v1"), ("order-form.form", b"form-v1")],
    );
    let second = deploy(
        &mut processor,
        &[("order.bpmn", b"process-v1"), ("order-form.form", b"form-v1")],
    );
    let event = deployment_event(&second);

    assert!(event.processes.iter().all(|p| p.is_duplicate));
    assert!(event.forms.iter().all(|f| f.is_duplicate));
    assert_eq!(created_events(&second, ValueType::Process), 0);
    assert_eq!(created_events(&second, ValueType::Form), 0);
    // the deployment itself still gets its own key and CREATED event
    assert_eq!(created_events(&second, ValueType::Deployment), 1);
}

#[test]
fn each_deployment_gets_a_fresh_key() {
    let mut processor = processor();

    let first = deployment_event(&deploy(&mut processor, &[("a.bpmn", b"v1")]));
    let second = deployment_event(&deploy(&mut processor, &[("a.bpmn", b"v1")]));

    assert_ne!(first.deployment_key, second.deployment_key);
    assert!(second.deployment_key > first.deployment_key);
}

#[test]
fn changed_content_restores_a_new_version_even_after_duplicates() {
    let mut processor = processor();

    deploy(&mut processor, &[("a.bpmn", b"v1")]);
    deploy(&mut processor, &[("a.bpmn", b"v1")]);
    let third = deployment_event(&deploy(&mut processor, &[("a.bpmn", b"v2")]));

    let process = process_meta(&third, "a");
    assert!(!process.is_duplicate);
    assert_eq!(process.version, 2);
}

#[test]
fn reverting_to_old_content_is_a_new_version_not_a_duplicate() {
    // dedup compares against the latest version only
    let mut processor = processor();

    deploy(&mut processor, &[("a.bpmn", b"v1")]);
    deploy(&mut processor, &[("a.bpmn", b"v2")]);
    let third = deployment_event(&deploy(&mut processor, &[("a.bpmn", b"v1")]));

    let process = process_meta(&third, "a");
    assert!(!process.is_duplicate);
    assert_eq!(process.version, 3);
}

#[test]
fn rejected_deployment_persists_nothing() {
    let mut processor = processor();

    let result = deploy(
        &mut processor,
        &[("a.bpmn", b"v1"), ("weird.txt", b"nope")],
    );

    assert!(result.is_rejected());
    assert!(
        processor
            .state()
            .process_state()
            .find_latest_process_by_id("a", "tenant-1")
            .is_none()
    );
}

#[test]
fn deployment_state_records_the_decisions() {
    let mut processor = processor();

    let event = deployment_event(&deploy(&mut processor, &[("a.bpmn", b"v1")]));
    let persisted = processor
        .state()
        .deployment_state()
        .find_deployment(event.deployment_key, "tenant-1")
        .expect("deployment must be persisted");

    assert_eq!(persisted.processes, event.processes);
}

#[test]
fn tenants_version_independently() {
    let mut processor = processor();

    let deploy_for = |processor: &mut StreamProcessor, tenant: &str| {
        let value = RecordValue::Deployment(DeploymentRecord {
            deployment_key: Key::new(0),
            resources: vec![DeploymentResource {
                resource_name: "a.bpmn".to_string(),
                resource: b"v1".to_vec(),
            }],
            processes: Vec::new(),
            forms: Vec::new(),
            tenant_id: tenant.to_string(),
        });
        deployment_event(
            &processor
                .process_command(None, Intent::Create, value)
                .expect("deployment must process"),
        )
    };

    let t1 = deploy_for(&mut processor, "tenant-1");
    let t2 = deploy_for(&mut processor, "tenant-2");

    // same content, but different tenants: both are version 1, not duplicates
    assert_eq!(t1.processes[0].version, 1);
    assert_eq!(t2.processes[0].version, 1);
    assert!(!t2.processes[0].is_duplicate);
}

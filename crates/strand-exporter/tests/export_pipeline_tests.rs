//! End-to-end projection tests: records in the log become documents in the
//! read store, tolerant of re-delivery and batch failures.

use std::sync::Arc;

use chrono::Utc;
use strand_core::log::{AppendListener, InMemoryLogStorage, LogStorage};
use strand_core::record::{ElementType, ProcessInstanceRecord};
use strand_core::{Intent, Key, Record, RecordKind, RecordValue};
use strand_exporter::handlers::list_view::LIST_VIEW_INDEX;
use strand_exporter::handlers::sequence_flow::SEQUENCE_FLOW_INDEX;
use strand_exporter::prelude::*;

struct PanickingListener;

impl AppendListener for PanickingListener {
    fn on_write(&self, _index: u64) {}
    fn on_commit(&self, _index: u64) {}
    fn on_write_error(&self, error: strand_core::Error) {
        panic!("append failed: {error}");
    }
}

fn append(storage: &InMemoryLogStorage, records: &[Record]) {
    let block = Record::encode_block(records).expect("encode");
    let lowest = records.first().expect("non-empty").position;
    let highest = records.last().expect("non-empty").position;
    storage.append(lowest, highest, block, &PanickingListener);
}

#[allow(clippy::too_many_arguments)]
fn pi_record(
    position: u64,
    key: u64,
    intent: Intent,
    element_type: ElementType,
    element_id: &str,
    process_instance_key: u64,
    parent: Option<(u64, u64, &str)>,
) -> Record {
    Record {
        key: Key::new(key),
        position,
        intent,
        kind: RecordKind::Event,
        rejection_reason: None,
        timestamp: Utc::now(),
        partition_id: 1,
        value: RecordValue::ProcessInstance(ProcessInstanceRecord {
            process_instance_key: Key::new(process_instance_key),
            process_definition_key: Key::new(900),
            process_id: "order-process".to_string(),
            version: 1,
            element_id: element_id.to_string(),
            element_type,
            parent_process_instance_key: parent.map(|(k, _, _)| Key::new(k)),
            parent_element_instance_key: parent.map(|(_, k, _)| Key::new(k)),
            parent_element_id: parent.map(|(_, _, id)| id.to_string()),
            tenant_id: "tenant-1".to_string(),
        }),
    }
}

fn process_record(position: u64, pi_key: u64, intent: Intent) -> Record {
    pi_record(
        position,
        pi_key,
        intent,
        ElementType::Process,
        "order-process",
        pi_key,
        None,
    )
}

#[tokio::test]
async fn activating_instance_becomes_an_active_document() {
    let storage = InMemoryLogStorage::new();
    let store = Arc::new(InMemoryReadStore::new());
    append(&storage, &[process_record(1, 100, Intent::ElementActivating)]);

    let mut exporter = Exporter::new(1, &storage, Arc::clone(&store) as Arc<dyn ReadStore>);
    assert_eq!(exporter.export_available().await.unwrap(), 1);

    let doc = store.document(LIST_VIEW_INDEX, "100").await.unwrap().unwrap();
    assert_eq!(doc["state"], "ACTIVE");
    assert_eq!(doc["treePath"], "100");
    assert_eq!(doc["processId"], "order-process");
    assert!(doc.get("endDate").is_none());
}

#[tokio::test]
async fn completion_closes_the_document() {
    let storage = InMemoryLogStorage::new();
    let store = Arc::new(InMemoryReadStore::new());
    append(&storage, &[process_record(1, 100, Intent::ElementActivating)]);
    append(&storage, &[process_record(2, 100, Intent::ElementCompleted)]);

    let mut exporter = Exporter::new(1, &storage, Arc::clone(&store) as Arc<dyn ReadStore>);
    assert_eq!(exporter.export_available().await.unwrap(), 2);

    let doc = store.document(LIST_VIEW_INDEX, "100").await.unwrap().unwrap();
    assert_eq!(doc["state"], "COMPLETED");
    assert!(doc.get("endDate").is_some());
    // start date from activation survives the update
    assert!(doc.get("startDate").is_some());
}

#[tokio::test]
async fn re_exporting_the_same_records_changes_nothing() {
    let storage = InMemoryLogStorage::new();
    let store = Arc::new(InMemoryReadStore::new());
    append(&storage, &[process_record(1, 100, Intent::ElementActivating)]);
    append(&storage, &[process_record(2, 100, Intent::ElementCompleted)]);

    let mut first = Exporter::new(1, &storage, Arc::clone(&store) as Arc<dyn ReadStore>);
    first.export_available().await.unwrap();
    let after_first = store.document(LIST_VIEW_INDEX, "100").await.unwrap();

    // a second exporter with a fresh bookmark re-delivers everything
    let mut second = Exporter::new(1, &storage, Arc::clone(&store) as Arc<dyn ReadStore>);
    second.export_available().await.unwrap();

    let after_second = store.document(LIST_VIEW_INDEX, "100").await.unwrap();
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn a_stale_update_does_not_move_the_document_backwards() {
    let storage = InMemoryLogStorage::new();
    let store = Arc::new(InMemoryReadStore::new());
    append(&storage, &[process_record(1, 100, Intent::ElementActivating)]);
    append(&storage, &[process_record(2, 100, Intent::ElementCompleted)]);

    // export everything, then re-export only the activation
    let mut exporter = Exporter::new(1, &storage, Arc::clone(&store) as Arc<dyn ReadStore>);
    exporter.export_available().await.unwrap();

    let replay_storage = InMemoryLogStorage::new();
    append(
        &replay_storage,
        &[process_record(1, 100, Intent::ElementActivating)],
    );
    let mut replayer = Exporter::new(
        1,
        &replay_storage,
        Arc::clone(&store) as Arc<dyn ReadStore>,
    );
    replayer.export_available().await.unwrap();

    let doc = store.document(LIST_VIEW_INDEX, "100").await.unwrap().unwrap();
    assert_eq!(doc["state"], "COMPLETED");
}

#[tokio::test]
async fn child_instances_extend_the_parent_tree_path() {
    let storage = InMemoryLogStorage::new();
    let store = Arc::new(InMemoryReadStore::new());
    append(&storage, &[process_record(1, 100, Intent::ElementActivating)]);

    let mut exporter = Exporter::new(1, &storage, Arc::clone(&store) as Arc<dyn ReadStore>);
    exporter.export_available().await.unwrap();

    // child spawned by call activity "call-sub" (flow node instance 150)
    append(
        &storage,
        &[pi_record(
            2,
            200,
            Intent::ElementActivating,
            ElementType::Process,
            "sub-process",
            200,
            Some((100, 150, "call-sub")),
        )],
    );
    exporter.export_available().await.unwrap();

    let doc = store.document(LIST_VIEW_INDEX, "200").await.unwrap().unwrap();
    assert_eq!(doc["treePath"], "100/call-sub/150/200");
    assert_eq!(doc["parentProcessInstanceKey"], 100);
}

#[tokio::test]
async fn missing_parent_falls_back_to_a_root_tree_path() {
    let storage = InMemoryLogStorage::new();
    let store = Arc::new(InMemoryReadStore::new());
    // the parent was never exported
    append(
        &storage,
        &[pi_record(
            1,
            200,
            Intent::ElementActivating,
            ElementType::Process,
            "sub-process",
            200,
            Some((100, 150, "call-sub")),
        )],
    );

    let mut exporter = Exporter::new(1, &storage, Arc::clone(&store) as Arc<dyn ReadStore>);
    exporter.export_available().await.unwrap();

    let doc = store.document(LIST_VIEW_INDEX, "200").await.unwrap().unwrap();
    assert_eq!(doc["treePath"], "200");
}

#[tokio::test]
async fn sequence_flows_are_written_once() {
    let storage = InMemoryLogStorage::new();
    let store = Arc::new(InMemoryReadStore::new());
    append(
        &storage,
        &[pi_record(
            1,
            300,
            Intent::SequenceFlowTaken,
            ElementType::SequenceFlow,
            "flow-to-task",
            100,
            None,
        )],
    );

    let mut exporter = Exporter::new(1, &storage, Arc::clone(&store) as Arc<dyn ReadStore>);
    exporter.export_available().await.unwrap();

    assert_eq!(store.document_count(SEQUENCE_FLOW_INDEX), 1);
    let doc = store
        .document(SEQUENCE_FLOW_INDEX, "100_flow-to-task")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc["elementId"], "flow-to-task");
    assert_eq!(doc["processInstanceKey"], 100);
}

#[tokio::test]
async fn failed_batch_leaves_store_and_bookmark_unchanged_then_retries() {
    let storage = InMemoryLogStorage::new();
    let store = Arc::new(InMemoryReadStore::new());
    append(&storage, &[process_record(1, 100, Intent::ElementActivating)]);

    let mut exporter = Exporter::new(1, &storage, Arc::clone(&store) as Arc<dyn ReadStore>);
    let bookmark_before = exporter.next_position();

    store.fail_next_execute();
    assert!(exporter.export_available().await.is_err());
    assert_eq!(store.document_count(LIST_VIEW_INDEX), 0);
    assert_eq!(exporter.next_position(), bookmark_before);

    // the next round re-reads the same records and succeeds
    assert_eq!(exporter.export_available().await.unwrap(), 1);
    assert_eq!(store.document_count(LIST_VIEW_INDEX), 1);
}

#[tokio::test]
async fn unhandled_records_still_advance_the_bookmark() {
    use strand_engine::prelude::*;
    use strand_core::record::JobRecord;

    let storage = Arc::new(InMemoryLogStorage::new());
    let store = Arc::new(InMemoryReadStore::new());
    let mut processor = StreamProcessor::new(
        1,
        Arc::clone(&storage) as Arc<dyn strand_core::log::LogStorage>,
    );
    processor
        .process_command(
            None,
            Intent::Create,
            RecordValue::Job(JobRecord {
                job_type: "payment".to_string(),
                retries: 3,
                worker: None,
                deadline: None,
                retry_backoff_ms: 0,
                error_message: None,
                variables: None,
                process_instance_key: None,
                element_id: None,
                tenant_id: "tenant-1".to_string(),
            }),
        )
        .unwrap();

    let mut exporter = Exporter::new(
        1,
        storage.as_ref(),
        Arc::clone(&store) as Arc<dyn ReadStore>,
    );
    let exported = exporter.export_available().await.unwrap();
    assert_eq!(exported, 2); // the command and its event
    assert_eq!(exporter.next_position(), processor.next_position());
    assert_eq!(store.document_count(LIST_VIEW_INDEX), 0);
}

#[tokio::test]
async fn commit_listener_wakes_the_export_loop() {
    let storage = InMemoryLogStorage::new();
    let notify = Arc::new(tokio::sync::Notify::new());
    storage.add_commit_listener(CommitNotifier::new(Arc::clone(&notify)));

    let waiter = Arc::clone(&notify);
    let wait = tokio::spawn(async move {
        waiter.notified().await;
    });
    // give the waiter a chance to park before the append
    tokio::task::yield_now().await;

    append(&storage, &[process_record(1, 100, Intent::ElementActivating)]);

    tokio::time::timeout(std::time::Duration::from_secs(1), wait)
        .await
        .expect("commit must wake the waiter")
        .unwrap();
}

//! List-view projection of process instances.
//!
//! One document per process instance, carrying its lifecycle state, dates,
//! and tree path. Writes are position-guarded upserts: re-delivered or
//! out-of-order records never move a document backwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strand_core::record::{ElementType, ProcessInstanceRecord};
use strand_core::{Intent, Key, Record, RecordValue, ValueType};
use tracing::warn;

use crate::batch::BatchRequest;
use crate::error::{Error, Result};
use crate::handler::ExportHandler;
use crate::store::ReadStore;
use crate::tree_path;

/// Index the list-view documents are written to.
pub const LIST_VIEW_INDEX: &str = "list-view";

const STATE_ACTIVE: &str = "ACTIVE";
const STATE_COMPLETED: &str = "COMPLETED";
const STATE_CANCELED: &str = "CANCELED";

/// A process instance as the list view sees it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstanceForListView {
    /// Process instance key.
    pub key: u64,
    /// Key of the deployed process definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_definition_key: Option<u64>,
    /// Stable process id of the definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    /// Version of the definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// ACTIVE, COMPLETED, or CANCELED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// When the instance started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// When the instance ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Ancestry path, see [`crate::tree_path`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_path: Option<String>,
    /// Parent process instance, for children of call activities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_process_instance_key: Option<u64>,
    /// Partition the instance lives on.
    pub partition_id: u16,
    /// Owning tenant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Position of the last record folded into this document.
    pub position: u64,
}

/// Projects process-scoped element records into list-view documents.
#[derive(Debug, Default)]
pub struct ListViewProcessInstanceHandler;

impl ListViewProcessInstanceHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn resolve_tree_path(
        &self,
        value: &ProcessInstanceRecord,
        store: &dyn ReadStore,
    ) -> Result<String> {
        let (Some(parent_key), Some(call_activity_instance_key), Some(call_activity_id)) = (
            value.parent_process_instance_key,
            value.parent_element_instance_key,
            value.parent_element_id.as_deref(),
        ) else {
            return Ok(tree_path::root(value.process_instance_key));
        };

        let parent = store
            .document(LIST_VIEW_INDEX, &parent_key.to_string())
            .await?;
        let parent_path = parent
            .as_ref()
            .and_then(|doc| doc.get("treePath"))
            .and_then(|path| path.as_str());

        match parent_path {
            Some(parent_path) => Ok(tree_path::child(
                parent_path,
                call_activity_id,
                call_activity_instance_key,
                value.process_instance_key,
            )),
            None => {
                warn!(
                    process_instance_key = %value.process_instance_key,
                    parent_process_instance_key = %parent_key,
                    "parent process instance not exported yet, falling back to root tree path"
                );
                Ok(tree_path::root(value.process_instance_key))
            }
        }
    }
}

#[async_trait]
impl ExportHandler for ListViewProcessInstanceHandler {
    type Entity = ProcessInstanceForListView;

    fn handled_value_type(&self) -> ValueType {
        ValueType::ProcessInstance
    }

    fn index_name(&self) -> &str {
        LIST_VIEW_INDEX
    }

    fn handles_record(&self, record: &Record) -> bool {
        let RecordValue::ProcessInstance(value) = &record.value else {
            return false;
        };
        value.element_type == ElementType::Process
            && matches!(
                record.intent,
                Intent::ElementActivating | Intent::ElementCompleted | Intent::ElementTerminated
            )
    }

    fn generate_ids(&self, record: &Record) -> Vec<String> {
        match &record.value {
            RecordValue::ProcessInstance(value) => {
                vec![value.process_instance_key.to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn create_new_entity(&self, id: &str) -> Self::Entity {
        ProcessInstanceForListView {
            key: id.parse().unwrap_or(0),
            ..ProcessInstanceForListView::default()
        }
    }

    async fn update_entity(
        &self,
        record: &Record,
        entity: &mut Self::Entity,
        store: &dyn ReadStore,
    ) -> Result<()> {
        let RecordValue::ProcessInstance(value) = &record.value else {
            return Err(Error::unexpected_record(format!(
                "list-view handler got a {:?} record",
                record.value_type()
            )));
        };

        entity.position = record.position;
        entity.partition_id = record.partition_id;
        match record.intent {
            Intent::ElementActivating => {
                entity.key = value.process_instance_key.value();
                entity.process_definition_key = Some(value.process_definition_key.value());
                entity.process_id = Some(value.process_id.clone());
                entity.version = Some(value.version);
                entity.state = Some(STATE_ACTIVE.to_string());
                entity.start_date = Some(record.timestamp);
                entity.parent_process_instance_key =
                    value.parent_process_instance_key.map(Key::value);
                entity.tenant_id = Some(value.tenant_id.clone());
                entity.tree_path = Some(self.resolve_tree_path(value, store).await?);
            }
            Intent::ElementCompleted => {
                entity.state = Some(STATE_COMPLETED.to_string());
                entity.end_date = Some(record.timestamp);
            }
            Intent::ElementTerminated => {
                entity.state = Some(STATE_CANCELED.to_string());
                entity.end_date = Some(record.timestamp);
            }
            _ => {}
        }
        Ok(())
    }

    fn flush(&self, id: &str, entity: &Self::Entity, batch: &mut BatchRequest) -> Result<()> {
        let document = serde_json::to_value(entity)
            .map_err(|e| Error::serialization(format!("list-view entity: {e}")))?;
        batch.upsert(LIST_VIEW_INDEX, id, document, entity.position);
        Ok(())
    }
}

//! Sequence flow projection.
//!
//! A taken sequence flow is an immutable fact; the document is written once
//! and re-export is a no-op. The id combines the process instance key and
//! the element id, so taking the same flow in different instances yields
//! distinct documents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strand_core::{Intent, Record, RecordValue, ValueType};

use crate::batch::BatchRequest;
use crate::error::{Error, Result};
use crate::handler::ExportHandler;
use crate::store::ReadStore;

/// Index the sequence flow documents are written to.
pub const SEQUENCE_FLOW_INDEX: &str = "sequence-flows";

/// One taken sequence flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFlowEntity {
    /// Document id: `{processInstanceKey}_{elementId}`.
    pub id: String,
    /// Owning process instance.
    pub process_instance_key: u64,
    /// Key of the deployed process definition.
    pub process_definition_key: u64,
    /// Stable process id of the definition.
    pub process_id: String,
    /// Element id of the flow.
    pub element_id: String,
    /// Partition the record came from.
    pub partition_id: u16,
    /// Owning tenant.
    pub tenant_id: String,
}

/// Projects SEQUENCE_FLOW_TAKEN records into immutable flow documents.
#[derive(Debug, Default)]
pub struct SequenceFlowHandler;

impl SequenceFlowHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExportHandler for SequenceFlowHandler {
    type Entity = SequenceFlowEntity;

    fn handled_value_type(&self) -> ValueType {
        ValueType::ProcessInstance
    }

    fn index_name(&self) -> &str {
        SEQUENCE_FLOW_INDEX
    }

    fn handles_record(&self, record: &Record) -> bool {
        record.intent == Intent::SequenceFlowTaken
    }

    fn generate_ids(&self, record: &Record) -> Vec<String> {
        match &record.value {
            RecordValue::ProcessInstance(value) => {
                vec![format!(
                    "{}_{}",
                    value.process_instance_key, value.element_id
                )]
            }
            _ => Vec::new(),
        }
    }

    fn create_new_entity(&self, id: &str) -> Self::Entity {
        SequenceFlowEntity {
            id: id.to_string(),
            ..SequenceFlowEntity::default()
        }
    }

    async fn update_entity(
        &self,
        record: &Record,
        entity: &mut Self::Entity,
        _store: &dyn ReadStore,
    ) -> Result<()> {
        let RecordValue::ProcessInstance(value) = &record.value else {
            return Err(Error::unexpected_record(format!(
                "sequence flow handler got a {:?} record",
                record.value_type()
            )));
        };

        entity.process_instance_key = value.process_instance_key.value();
        entity.process_definition_key = value.process_definition_key.value();
        entity.process_id = value.process_id.clone();
        entity.element_id = value.element_id.clone();
        entity.partition_id = record.partition_id;
        entity.tenant_id = value.tenant_id.clone();
        Ok(())
    }

    fn flush(&self, id: &str, entity: &Self::Entity, batch: &mut BatchRequest) -> Result<()> {
        let document = serde_json::to_value(entity)
            .map_err(|e| Error::serialization(format!("sequence flow entity: {e}")))?;
        batch.add(SEQUENCE_FLOW_INDEX, id, document);
        Ok(())
    }
}

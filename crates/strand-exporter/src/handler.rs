//! The export handler contract.
//!
//! A handler projects one record shape into one index. The exporter calls
//! it in three phases per batch: select (`handles_record`), update (entity
//! mutations cached in memory), and flush (cached entities become deferred
//! writes). Several records touching the same entity within one batch see
//! each other's updates through the cache.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use strand_core::{Record, ValueType};

use crate::batch::BatchRequest;
use crate::error::Result;
use crate::store::ReadStore;

/// Projects records of one value type into entities of one index.
#[async_trait]
pub trait ExportHandler: Send + Sync {
    /// The projected entity type.
    type Entity: Serialize + Send;

    /// The value type this handler consumes.
    fn handled_value_type(&self) -> ValueType;

    /// The index the entities are written to.
    fn index_name(&self) -> &str;

    /// Returns true if this record should be projected.
    fn handles_record(&self, record: &Record) -> bool;

    /// The ids of the entities this record affects.
    fn generate_ids(&self, record: &Record) -> Vec<String>;

    /// Creates an empty entity for an id seen for the first time in this
    /// batch.
    fn create_new_entity(&self, id: &str) -> Self::Entity;

    /// Folds the record into the entity. Handlers may consult the store for
    /// already-exported documents (e.g. the parent's tree path).
    async fn update_entity(
        &self,
        record: &Record,
        entity: &mut Self::Entity,
        store: &dyn ReadStore,
    ) -> Result<()>;

    /// Turns one cached entity into deferred writes.
    fn flush(&self, id: &str, entity: &Self::Entity, batch: &mut BatchRequest) -> Result<()>;
}

/// Object-safe handler interface driven by the exporter.
#[async_trait]
pub trait DynExportHandler: Send {
    /// Returns true if this record should be projected.
    fn handles(&self, record: &Record) -> bool;

    /// Updates the cached entities affected by the record.
    async fn process(&mut self, record: &Record, store: &dyn ReadStore) -> Result<()>;

    /// Drains the cache into the batch.
    fn flush_batch(&mut self, batch: &mut BatchRequest) -> Result<()>;

    /// Discards the cache, e.g. after a failed flush. The records will be
    /// re-read and re-processed.
    fn reset(&mut self);
}

/// Adapts a typed [`ExportHandler`] to [`DynExportHandler`], holding the
/// per-batch entity cache.
pub struct HandlerAdapter<H: ExportHandler> {
    handler: H,
    cache: HashMap<String, H::Entity>,
}

impl<H: ExportHandler> HandlerAdapter<H> {
    /// Wraps a handler with an empty cache.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            cache: HashMap::new(),
        }
    }
}

#[async_trait]
impl<H: ExportHandler> DynExportHandler for HandlerAdapter<H> {
    fn handles(&self, record: &Record) -> bool {
        record.value_type() == self.handler.handled_value_type()
            && self.handler.handles_record(record)
    }

    async fn process(&mut self, record: &Record, store: &dyn ReadStore) -> Result<()> {
        for id in self.handler.generate_ids(record) {
            let mut entity = self
                .cache
                .remove(&id)
                .unwrap_or_else(|| self.handler.create_new_entity(&id));
            self.handler.update_entity(record, &mut entity, store).await?;
            self.cache.insert(id, entity);
        }
        Ok(())
    }

    fn flush_batch(&mut self, batch: &mut BatchRequest) -> Result<()> {
        // Deterministic flush order keeps batches reproducible.
        let mut ids: Vec<String> = self.cache.keys().cloned().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(entity) = self.cache.remove(&id) {
                self.handler.flush(&id, &entity, batch)?;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.cache.clear();
    }
}

//! The read store: where projected documents live.
//!
//! The store applies [`BatchRequest`]s atomically and serves point lookups
//! for handlers that need existing documents (e.g. parent tree paths). The
//! in-memory implementation mirrors how a document store with scripted
//! upserts behaves, including the position guard.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::batch::{BatchOp, BatchRequest};
use crate::error::{Error, Result};

/// Position field used by the upsert guard.
pub const POSITION_FIELD: &str = "position";

/// Asynchronous document store for projected read models.
#[async_trait]
pub trait ReadStore: Send + Sync {
    /// Applies a batch atomically: on error nothing is applied.
    async fn execute(&self, batch: BatchRequest) -> Result<()>;

    /// Point lookup of one document.
    async fn document(&self, index: &str, id: &str) -> Result<Option<Value>>;
}

type Indices = BTreeMap<String, BTreeMap<String, Value>>;

/// In-memory [`ReadStore`] used by the pipeline tests and embedded setups.
#[derive(Debug, Default)]
pub struct InMemoryReadStore {
    indices: RwLock<Indices>,
    fail_next_execute: AtomicBool,
}

impl InMemoryReadStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `execute` call fail without applying anything.
    pub fn fail_next_execute(&self) {
        self.fail_next_execute.store(true, Ordering::SeqCst);
    }

    /// Number of documents in an index.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn document_count(&self, index: &str) -> usize {
        self.indices
            .read()
            .expect("store lock poisoned")
            .get(index)
            .map_or(0, BTreeMap::len)
    }

    fn apply(indices: &mut Indices, op: BatchOp) {
        match op {
            BatchOp::Upsert {
                index,
                id,
                document,
                position,
            } => {
                let documents = indices.entry(index).or_default();
                match documents.get_mut(&id) {
                    Some(existing) => {
                        let stored_position = existing.get(POSITION_FIELD).and_then(Value::as_u64);
                        if stored_position.is_some_and(|stored| stored >= position) {
                            return;
                        }
                        merge_document(existing, document);
                        existing[POSITION_FIELD] = Value::from(position);
                    }
                    None => {
                        let mut fresh = document;
                        if let Value::Object(fields) = &mut fresh {
                            fields.insert(POSITION_FIELD.to_string(), Value::from(position));
                        }
                        documents.insert(id, fresh);
                    }
                }
            }
            BatchOp::Add {
                index,
                id,
                document,
            } => {
                indices.entry(index).or_default().entry(id).or_insert(document);
            }
        }
    }
}

/// Merges `incoming` object fields over `existing` ones.
fn merge_document(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(existing_fields), Value::Object(incoming_fields)) => {
            for (field, value) in incoming_fields {
                existing_fields.insert(field, value);
            }
        }
        (existing, incoming) => *existing = incoming,
    }
}

#[async_trait]
impl ReadStore for InMemoryReadStore {
    async fn execute(&self, batch: BatchRequest) -> Result<()> {
        if self.fail_next_execute.swap(false, Ordering::SeqCst) {
            return Err(Error::persistence("injected execute failure"));
        }

        let mut indices = self
            .indices
            .write()
            .map_err(|_| Error::persistence("store lock poisoned"))?;
        // All-or-nothing: stage on a copy, commit by swap.
        let mut staged = indices.clone();
        for op in batch.into_ops() {
            Self::apply(&mut staged, op);
        }
        *indices = staged;
        Ok(())
    }

    async fn document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let indices = self
            .indices
            .read()
            .map_err(|_| Error::persistence("store lock poisoned"))?;
        Ok(indices.get(index).and_then(|documents| documents.get(id)).cloned())
    }
}

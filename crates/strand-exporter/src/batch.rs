//! Deferred write batches.
//!
//! Handlers never write to the read store directly. They accumulate
//! operations into a [`BatchRequest`], which the exporter executes as one
//! atomic unit: either every operation applies or none does, and the
//! exporter's bookmark only advances on success.

use serde_json::Value;

/// One deferred write operation.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Insert or update a document, guarded by the record position: the
    /// write applies only when the stored document has no position yet or a
    /// strictly lower one. Stale and re-delivered updates degrade to no-ops.
    Upsert {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
        /// Fields to merge into the document.
        document: Value,
        /// Position of the record that produced this update.
        position: u64,
    },
    /// Insert a document once; a document that already exists is left
    /// untouched. Used for immutable documents, where re-export must be
    /// idempotent.
    Add {
        /// Target index.
        index: String,
        /// Document id.
        id: String,
        /// The full document.
        document: Value,
    },
}

/// An ordered batch of deferred writes.
#[derive(Debug, Default)]
pub struct BatchRequest {
    ops: Vec<BatchOp>,
}

impl BatchRequest {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a position-guarded upsert.
    pub fn upsert(&mut self, index: &str, id: &str, document: Value, position: u64) {
        self.ops.push(BatchOp::Upsert {
            index: index.to_string(),
            id: id.to_string(),
            document,
            position,
        });
    }

    /// Queues an insert-once operation.
    pub fn add(&mut self, index: &str, id: &str, document: Value) {
        self.ops.push(BatchOp::Add {
            index: index.to_string(),
            id: id.to_string(),
            document,
        });
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if no operations are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The queued operations, in insertion order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consumes the batch, yielding its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

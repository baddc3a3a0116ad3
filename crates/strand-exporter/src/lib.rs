//! # strand-exporter
//!
//! Read-model projection pipeline for the Strand partition core.
//!
//! The exporter tails the partition log through its own reader and projects
//! records into query-shaped documents:
//!
//! - **Handlers**: One projection per record shape, batching entity updates
//!   in memory until flush
//! - **Batch Requests**: Deferred writes, executed atomically against the
//!   read store
//! - **Position Guards**: Out-of-order and re-delivered records degrade to
//!   no-ops instead of corrupting documents
//! - **Tree Paths**: Parent/child process instance ancestry encoded as a
//!   single path string for hierarchy queries
//!
//! The exporter is eventually consistent by design: it advances its bookmark
//! only after a batch is durably applied, so a crash between append and
//! export replays records into idempotent writes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod batch;
pub mod error;
pub mod exporter;
pub mod handler;
pub mod handlers;
pub mod metrics;
pub mod store;
pub mod tree_path;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::batch::{BatchOp, BatchRequest};
    pub use crate::error::{Error, Result};
    pub use crate::exporter::{CommitNotifier, Exporter};
    pub use crate::handler::{ExportHandler, HandlerAdapter};
    pub use crate::handlers::list_view::ListViewProcessInstanceHandler;
    pub use crate::handlers::sequence_flow::SequenceFlowHandler;
    pub use crate::store::{InMemoryReadStore, ReadStore};
}

//! # strand-core
//!
//! Core abstractions for the Strand partition-local workflow execution core.
//!
//! This crate provides the foundational types and traits used across all
//! Strand components:
//!
//! - **Record Model**: The immutable, position-ordered facts flowing through
//!   the partition log
//! - **Log Storage**: Append-only block storage with seekable readers and
//!   commit notification
//! - **Keys**: Partition-scoped, monotonic entity key generation
//! - **Tenant Context**: Multi-tenant isolation primitives
//! - **Checksums**: Content hashing for deployment deduplication
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `strand-core` is the **only** crate allowed to define shared primitives.
//! The authoritative state engine (`strand-engine`) and the projection
//! pipeline (`strand-exporter`) both consume the same record stream through
//! the contracts defined here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod checksum;
pub mod error;
pub mod key;
pub mod log;
pub mod observability;
pub mod record;
pub mod tenant;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::checksum::resource_checksum;
    pub use crate::error::{Error, Result};
    pub use crate::key::{Key, KeyGenerator};
    pub use crate::log::{
        AppendListener, CommitListener, InMemoryLogStorage, LogReader, LogStorage,
    };
    pub use crate::record::{
        Intent, Record, RecordKind, RecordValue, ValueType,
    };
    pub use crate::tenant::TenantId;
}

pub use checksum::resource_checksum;
pub use error::{Error, Result};
pub use key::{Key, KeyGenerator};
pub use log::{AppendListener, CommitListener, InMemoryLogStorage, LogReader, LogStorage};
pub use observability::{LogFormat, init_logging};
pub use record::{Intent, Record, RecordKind, RecordValue, ValueType};
pub use tenant::TenantId;

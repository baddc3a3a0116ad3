//! Error types for the export pipeline.

/// The result type used throughout strand-exporter.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exporting records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The read store refused or failed a batch; the batch was not applied.
    #[error("persistence error: {message}")]
    Persistence {
        /// Description of the failure.
        message: String,
    },

    /// An entity could not be serialized into a document.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// A record payload did not match what its handler expects.
    #[error("unexpected record shape: {message}")]
    UnexpectedRecord {
        /// Description of the mismatch.
        message: String,
    },

    /// An error from strand-core, typically block decoding.
    #[error("core error: {0}")]
    Core(#[from] strand_core::Error),
}

impl Error {
    /// Creates a new persistence error.
    #[must_use]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new unexpected-record error.
    #[must_use]
    pub fn unexpected_record(message: impl Into<String>) -> Self {
        Self::UnexpectedRecord {
            message: message.into(),
        }
    }
}

//! The record model: immutable facts flowing through the partition log.
//!
//! A [`Record`] is one log entry: an entity key, an intent (the verb), a
//! typed value payload, and the position assigned when the record was
//! appended. Positions are strictly increasing and never reused; replaying
//! the log from position 0 must reproduce identical partition state.
//!
//! Records come in three kinds: **commands** (requests to change state),
//! **events** (accepted facts, the only kind appliers consume), and
//! **rejections** (commands refused with a caller-facing reason).

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::Key;

/// The closed set of record value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    /// A deployment of one or more resources.
    Deployment,
    /// A versioned process definition.
    Process,
    /// A versioned form definition.
    Form,
    /// A unit of work pulled by external workers.
    Job,
    /// A batch job activation request/result.
    JobBatch,
    /// A process instance element lifecycle fact.
    ProcessInstance,
}

/// The verb of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Command: create the entity (deployments).
    Create,
    /// Event: the entity was created.
    Created,
    /// Command: activate up to N jobs of a type.
    Activate,
    /// Event: the job (or job batch) was activated.
    Activated,
    /// Command: complete an activated job.
    Complete,
    /// Event: the job was completed.
    Completed,
    /// Command: fail an activated job.
    Fail,
    /// Event: the job was failed.
    Failed,
    /// Command: set the remaining retries of a job.
    UpdateRetries,
    /// Event: the job retries were updated.
    RetriesUpdated,
    /// Event: an activated job exceeded its deadline.
    TimedOut,
    /// Event: a process element is activating.
    ElementActivating,
    /// Event: a process element completed.
    ElementCompleted,
    /// Event: a process element was terminated.
    ElementTerminated,
    /// Event: a sequence flow was taken.
    SequenceFlowTaken,
}

/// Record category: command, event, or rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    /// A request to change state; processed, never applied.
    Command,
    /// An accepted fact; the only kind appliers consume.
    Event,
    /// A refused command with a caller-facing reason.
    Rejection,
}

/// One resource inside a deployment command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResource {
    /// File name of the resource; the extension selects the resource kind.
    pub resource_name: String,
    /// Raw resource content.
    pub resource: Vec<u8>,
}

/// Version/dedup decision for one process inside a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessMetadata {
    /// Stable, human-chosen process id.
    pub process_id: String,
    /// System-assigned process definition key.
    pub process_definition_key: Key,
    /// Version, monotonic per (process id, tenant).
    pub version: u32,
    /// Hex-encoded content checksum.
    pub checksum: String,
    /// True when the content matched the latest existing version.
    pub is_duplicate: bool,
    /// Resource file name.
    pub resource_name: String,
}

/// Version/dedup decision for one form inside a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormMetadata {
    /// Stable, human-chosen form id.
    pub form_id: String,
    /// System-assigned form key.
    pub form_key: Key,
    /// Version, monotonic per (form id, tenant).
    pub version: u32,
    /// Hex-encoded content checksum.
    pub checksum: String,
    /// True when the content matched the latest existing version.
    pub is_duplicate: bool,
    /// Resource file name.
    pub resource_name: String,
}

/// Deployment payload.
///
/// As a command it carries the raw resources; the CREATED event additionally
/// carries the per-resource version decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// System-assigned deployment key (set when the command is accepted).
    pub deployment_key: Key,
    /// Raw resources to deploy.
    pub resources: Vec<DeploymentResource>,
    /// Process version decisions (empty on the command).
    #[serde(default)]
    pub processes: Vec<ProcessMetadata>,
    /// Form version decisions (empty on the command).
    #[serde(default)]
    pub forms: Vec<FormMetadata>,
    /// Owning tenant.
    pub tenant_id: String,
}

/// Process definition payload (PROCESS CREATED events).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Stable, human-chosen process id.
    pub process_id: String,
    /// System-assigned process definition key.
    pub process_definition_key: Key,
    /// Version, monotonic per (process id, tenant).
    pub version: u32,
    /// Resource file name.
    pub resource_name: String,
    /// Hex-encoded content checksum.
    pub checksum: String,
    /// Raw resource content.
    pub resource: Vec<u8>,
    /// Deployment that introduced this version.
    pub deployment_key: Key,
    /// Owning tenant.
    pub tenant_id: String,
}

/// Form definition payload (FORM CREATED events).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRecord {
    /// Stable, human-chosen form id.
    pub form_id: String,
    /// System-assigned form key.
    pub form_key: Key,
    /// Version, monotonic per (form id, tenant).
    pub version: u32,
    /// Resource file name.
    pub resource_name: String,
    /// Hex-encoded content checksum.
    pub checksum: String,
    /// Raw resource content.
    pub resource: Vec<u8>,
    /// Deployment that introduced this version.
    pub deployment_key: Key,
    /// Owning tenant.
    pub tenant_id: String,
}

/// Job payload (job lifecycle commands and events).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job type, matched against activation type filters.
    pub job_type: String,
    /// Remaining attempts. On FAIL commands this is the resulting count the
    /// caller sets explicitly, not a decrement.
    pub retries: u32,
    /// Worker that activated the job, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    /// Processing deadline set on activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    /// Backoff duration in milliseconds set on failure.
    #[serde(default)]
    pub retry_backoff_ms: i64,
    /// Error message recorded on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Variables payload (completion) as arbitrary JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
    /// Process instance the job belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_instance_key: Option<Key>,
    /// Element the job was created for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    /// Owning tenant.
    pub tenant_id: String,
}

/// Job batch payload (ACTIVATE command and ACTIVATED event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBatchRecord {
    /// Job type filter.
    pub job_type: String,
    /// Maximum number of jobs to activate.
    pub max_jobs_to_activate: u32,
    /// Activation timeout in milliseconds; sets the processing deadline.
    pub timeout_ms: i64,
    /// Requesting worker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    /// Keys of the activated jobs (empty on the command).
    #[serde(default)]
    pub job_keys: Vec<Key>,
    /// Owning tenant.
    pub tenant_id: String,
}

/// The BPMN-ish element type of a process instance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    /// The process itself.
    Process,
    /// A call activity spawning a child process instance.
    CallActivity,
    /// A service task backed by a job.
    ServiceTask,
    /// A sequence flow between elements.
    SequenceFlow,
}

/// Process instance element payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInstanceRecord {
    /// Key of the owning process instance.
    pub process_instance_key: Key,
    /// Key of the deployed process definition.
    pub process_definition_key: Key,
    /// Stable process id of the definition.
    pub process_id: String,
    /// Version of the definition.
    pub version: u32,
    /// Id of the element this record is about.
    pub element_id: String,
    /// Type of the element.
    pub element_type: ElementType,
    /// Parent process instance, when spawned via a call activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_process_instance_key: Option<Key>,
    /// Flow node instance of the spawning call activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_element_instance_key: Option<Key>,
    /// Element id of the spawning call activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_element_id: Option<String>,
    /// Owning tenant.
    pub tenant_id: String,
}

/// Typed record payload, one variant per [`ValueType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordValue {
    /// Deployment payload.
    Deployment(DeploymentRecord),
    /// Process definition payload.
    Process(ProcessRecord),
    /// Form definition payload.
    Form(FormRecord),
    /// Job payload.
    Job(JobRecord),
    /// Job batch payload.
    JobBatch(JobBatchRecord),
    /// Process instance payload.
    ProcessInstance(ProcessInstanceRecord),
}

impl RecordValue {
    /// Returns the value type of this payload.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Deployment(_) => ValueType::Deployment,
            Self::Process(_) => ValueType::Process,
            Self::Form(_) => ValueType::Form,
            Self::Job(_) => ValueType::Job,
            Self::JobBatch(_) => ValueType::JobBatch,
            Self::ProcessInstance(_) => ValueType::ProcessInstance,
        }
    }

    /// Returns the tenant the payload belongs to.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        match self {
            Self::Deployment(v) => &v.tenant_id,
            Self::Process(v) => &v.tenant_id,
            Self::Form(v) => &v.tenant_id,
            Self::Job(v) => &v.tenant_id,
            Self::JobBatch(v) => &v.tenant_id,
            Self::ProcessInstance(v) => &v.tenant_id,
        }
    }
}

/// One immutable log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Entity key this record is about.
    pub key: Key,
    /// Position in the partition log; assigned once, never reused.
    pub position: u64,
    /// The verb.
    pub intent: Intent,
    /// Command, event, or rejection.
    pub kind: RecordKind,
    /// Caller-facing reason, set on rejections only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// When the record was written.
    pub timestamp: DateTime<Utc>,
    /// Partition the record belongs to.
    pub partition_id: u16,
    /// Typed payload.
    pub value: RecordValue,
}

impl Record {
    /// Returns the value type of the payload.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    /// Returns the tenant of the payload.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        self.value.tenant_id()
    }

    /// Serializes a block of records into log-entry bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode_block(records: &[Record]) -> Result<Bytes> {
        let bytes = serde_json::to_vec(records).map_err(|e| Error::Serialization {
            message: format!("failed to encode record block: {e}"),
        })?;
        Ok(Bytes::from(bytes))
    }

    /// Deserializes a log-entry block back into records.
    ///
    /// # Errors
    ///
    /// Returns an error if the block is not a valid record block.
    pub fn decode_block(block: &Bytes) -> Result<Vec<Record>> {
        serde_json::from_slice(block).map_err(|e| Error::Serialization {
            message: format!("failed to decode record block: {e}"),
        })
    }
}

//! The stream processor: the partition's single-threaded processing loop.
//!
//! One processor owns one partition's state, key generator, and append
//! position. Commands enter here, are validated against current state, and
//! leave as an appended block of records: the command itself, then either
//! its follow-up events or a rejection. Events are applied to state only
//! after the block is durably appended, so state never runs ahead of the
//! log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use strand_core::log::{AppendListener, LogStorage};
use strand_core::observability::processing_span;
use strand_core::{Intent, Key, KeyGenerator, Record, RecordKind, RecordValue};
use tracing::{debug, warn};

use crate::appliers::EventAppliers;
use crate::deployment::DeploymentBehavior;
use crate::error::{Error, Rejection, Result};
use crate::jobs::JobLifecycleController;
use crate::metrics::EngineMetrics;
use crate::state::ProcessingState;

/// A record produced while processing, before position and timestamp are
/// assigned.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    /// Entity key the record is about.
    pub key: Key,
    /// The verb.
    pub intent: Intent,
    /// Command, event, or rejection.
    pub kind: RecordKind,
    /// Caller-facing reason, set on rejections only.
    pub rejection_reason: Option<String>,
    /// Typed payload.
    pub value: RecordValue,
}

/// The outcome of one processed command.
#[derive(Debug)]
pub struct CommandResult {
    /// Every record appended for this command, in log order. The first is
    /// the command itself.
    pub records: Vec<Record>,
    /// The rejection, when the command was refused.
    pub rejection: Option<Rejection>,
}

impl CommandResult {
    /// Returns true if the command was rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// Returns the appended events (excluding the command and rejections).
    #[must_use]
    pub fn events(&self) -> impl Iterator<Item = &Record> {
        self.records
            .iter()
            .filter(|record| record.kind == RecordKind::Event)
    }
}

/// Captures the append outcome of a synchronous storage implementation.
#[derive(Default)]
struct CapturingListener {
    committed: AtomicBool,
    error: Mutex<Option<strand_core::Error>>,
}

impl AppendListener for CapturingListener {
    fn on_write(&self, _index: u64) {}

    fn on_commit(&self, _index: u64) {
        self.committed.store(true, Ordering::SeqCst);
    }

    fn on_write_error(&self, error: strand_core::Error) {
        if let Ok(mut slot) = self.error.lock() {
            *slot = Some(error);
        }
    }
}

/// The single-threaded processing loop of one partition.
pub struct StreamProcessor {
    partition_id: u16,
    storage: Arc<dyn LogStorage>,
    state: ProcessingState,
    appliers: EventAppliers,
    deployments: DeploymentBehavior,
    jobs: JobLifecycleController,
    keys: KeyGenerator,
    next_position: u64,
    metrics: EngineMetrics,
}

impl StreamProcessor {
    /// Creates a processor over empty state. Call [`StreamProcessor::replay`]
    /// before processing commands if the log is not empty.
    #[must_use]
    pub fn new(partition_id: u16, storage: Arc<dyn LogStorage>) -> Self {
        Self {
            partition_id,
            storage,
            state: ProcessingState::new(),
            appliers: EventAppliers::new(),
            deployments: DeploymentBehavior,
            jobs: JobLifecycleController,
            keys: KeyGenerator::new(partition_id),
            next_position: 1,
            metrics: EngineMetrics::new(),
        }
    }

    /// The partition this processor serves.
    #[must_use]
    pub const fn partition_id(&self) -> u16 {
        self.partition_id
    }

    /// Read access to partition state.
    #[must_use]
    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    /// The position the next appended record will get.
    #[must_use]
    pub const fn next_position(&self) -> u64 {
        self.next_position
    }

    /// Rebuilds partition state by applying every event in the log from
    /// position 0. Also advances the key generator past every key seen, so
    /// newly generated keys stay strictly increasing.
    ///
    /// Returns the number of replayed records.
    ///
    /// # Errors
    ///
    /// Returns an error if a block cannot be decoded or an event cannot be
    /// applied; both mean the log and the engine disagree and processing
    /// must not continue.
    pub fn replay(&mut self) -> Result<u64> {
        let span = processing_span("replay", self.partition_id);
        let _guard = span.enter();

        let mut reader = self.storage.new_reader();
        reader.seek(0);

        let mut replayed = 0u64;
        while let Some(block) = reader.next_block() {
            for record in Record::decode_block(&block)? {
                self.keys.observe(record.key);
                self.next_position = self.next_position.max(record.position + 1);
                self.appliers.apply(&record, &mut self.state)?;
                self.metrics.record_replayed();
                replayed += 1;
            }
        }
        debug!(replayed, "replay finished");
        Ok(replayed)
    }

    /// Processes one command at the current wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns an error on append failure or an internal invariant
    /// violation. Command refusals are not errors; they come back as the
    /// result's rejection.
    pub fn process_command(
        &mut self,
        key: Option<Key>,
        intent: Intent,
        value: RecordValue,
    ) -> Result<CommandResult> {
        self.process_command_at(key, intent, value, Utc::now())
    }

    /// Processes one command at an explicit timestamp.
    ///
    /// The timestamp is recorded on every resulting record and anchors all
    /// time-dependent decisions (activation deadlines, retry backoff), which
    /// keeps them reproducible on replay.
    ///
    /// # Errors
    ///
    /// See [`StreamProcessor::process_command`].
    pub fn process_command_at(
        &mut self,
        key: Option<Key>,
        intent: Intent,
        value: RecordValue,
        now: DateTime<Utc>,
    ) -> Result<CommandResult> {
        let span = processing_span("command", self.partition_id);
        let _guard = span.enter();
        let started = Instant::now();
        let value_type = value.value_type();

        let outcome = self.handle_command(key, intent, &value, now);

        let command_key = key.unwrap_or_else(|| Key::new(0));
        let mut pending = vec![PendingRecord {
            key: command_key,
            intent,
            kind: RecordKind::Command,
            rejection_reason: None,
            value: value.clone(),
        }];

        let rejection = match outcome {
            Ok(records) => {
                pending.extend(records);
                None
            }
            Err(rejection) => {
                warn!(%rejection, "command rejected");
                self.metrics
                    .record_rejection(&format!("{:?}", rejection.kind));
                pending.push(PendingRecord {
                    key: command_key,
                    intent,
                    kind: RecordKind::Rejection,
                    rejection_reason: Some(rejection.reason.clone()),
                    value,
                });
                Some(rejection)
            }
        };

        let records = self.append_and_apply(pending, now)?;
        self.metrics
            .observe_command_duration(&format!("{value_type:?}"), started.elapsed());
        Ok(CommandResult { records, rejection })
    }

    /// Scheduled sweep: emits a TIMED_OUT event for every activated job
    /// whose deadline passed at `now`, returning each to the activatable
    /// pool.
    ///
    /// # Errors
    ///
    /// Returns an error on append failure or if an emitted event cannot be
    /// applied.
    pub fn sweep_job_timeouts(&mut self, now: DateTime<Utc>) -> Result<Vec<Record>> {
        let pending = self.jobs.sweep_timeouts(&self.state, now);
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        debug!(timed_out = pending.len(), "job timeout sweep");
        self.append_and_apply(pending, now)
    }

    fn handle_command(
        &mut self,
        key: Option<Key>,
        intent: Intent,
        value: &RecordValue,
        now: DateTime<Utc>,
    ) -> std::result::Result<Vec<PendingRecord>, Rejection> {
        match (value, intent) {
            (RecordValue::Deployment(command), Intent::Create) => {
                self.deployments
                    .transform(command, &self.state, &mut self.keys)
            }
            (RecordValue::Job(command), Intent::Create) => {
                Ok(self.jobs.create(command, &mut self.keys))
            }
            (RecordValue::JobBatch(command), Intent::Activate) => {
                self.jobs
                    .activate_batch(command, &self.state, now, &mut self.keys)
            }
            (RecordValue::Job(command), Intent::Complete) => {
                let job_key = Self::require_key(key, "complete")?;
                self.jobs.complete(job_key, command, &self.state)
            }
            (RecordValue::Job(command), Intent::Fail) => {
                let job_key = Self::require_key(key, "fail")?;
                self.jobs.fail(job_key, command, &self.state)
            }
            (RecordValue::Job(command), Intent::UpdateRetries) => {
                let job_key = Self::require_key(key, "update retries of")?;
                self.jobs.update_retries(job_key, command, &self.state)
            }
            (value, intent) => Err(Rejection::invalid_argument(format!(
                "unsupported command {intent:?} for {:?}",
                value.value_type()
            ))),
        }
    }

    fn require_key(key: Option<Key>, verb: &str) -> std::result::Result<Key, Rejection> {
        key.ok_or_else(|| {
            Rejection::invalid_argument(format!("expected a job key to {verb}, but none was given"))
        })
    }

    /// Stamps, appends, and applies a batch of records as one log entry.
    fn append_and_apply(
        &mut self,
        pending: Vec<PendingRecord>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Record>> {
        let lowest = self.next_position;
        let records: Vec<Record> = pending
            .into_iter()
            .enumerate()
            .map(|(offset, record)| Record {
                key: record.key,
                position: lowest + offset as u64,
                intent: record.intent,
                kind: record.kind,
                rejection_reason: record.rejection_reason,
                timestamp: now,
                partition_id: self.partition_id,
                value: record.value,
            })
            .collect();
        let highest = lowest + (records.len() as u64) - 1;

        let block = Record::encode_block(&records)?;
        let listener = CapturingListener::default();
        self.storage.append(lowest, highest, block, &listener);

        if let Ok(mut slot) = listener.error.lock() {
            if let Some(error) = slot.take() {
                return Err(Error::Storage {
                    message: format!("append of positions [{lowest}, {highest}] failed"),
                    source: Some(Box::new(error)),
                });
            }
        }
        if !listener.committed.load(Ordering::SeqCst) {
            return Err(Error::storage(format!(
                "append of positions [{lowest}, {highest}] was not committed"
            )));
        }

        self.next_position = highest + 1;
        for record in &records {
            self.appliers.apply(record, &mut self.state)?;
            if record.kind == RecordKind::Event {
                self.metrics
                    .record_applied(&format!("{:?}", record.value_type()));
            }
            self.metrics.record_appended(
                &format!("{:?}", record.kind),
                &format!("{:?}", record.value_type()),
            );
        }
        Ok(records)
    }
}

//! Appliers for job lifecycle events.

use chrono::{DateTime, Duration, Utc};
use strand_core::{Key, RecordValue};

use crate::error::Result;
use crate::state::ProcessingState;
use crate::state::jobs::JobEntity;

use super::{EventApplier, mismatched_value};

fn job_value<'a>(value: &'a RecordValue) -> Result<&'a strand_core::record::JobRecord> {
    match value {
        RecordValue::Job(job) => Ok(job),
        other => Err(mismatched_value("job", other)),
    }
}

/// Stores a new activatable job.
pub(super) struct JobCreatedApplier;

impl EventApplier for JobCreatedApplier {
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        let job = job_value(value)?;
        state.jobs_mut().on_created(JobEntity::from_record(key, job));
        Ok(())
    }
}

/// Marks a job activated, with its worker and processing deadline.
pub(super) struct JobActivatedApplier;

impl EventApplier for JobActivatedApplier {
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        let job = job_value(value)?;
        state
            .jobs_mut()
            .on_activated(key, job.worker.clone(), job.deadline)
    }
}

/// Marks a job completed.
pub(super) struct JobCompletedApplier;

impl EventApplier for JobCompletedApplier {
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        job_value(value)?;
        state.jobs_mut().on_completed(key)
    }
}

/// Marks a job failed with the caller-set retry count.
///
/// The backoff instant is computed from the record's own timestamp, so the
/// result is identical on replay.
pub(super) struct JobFailedApplier;

impl EventApplier for JobFailedApplier {
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        let job = job_value(value)?;
        let backoff_until = (job.retry_backoff_ms > 0)
            .then(|| timestamp + Duration::milliseconds(job.retry_backoff_ms));
        state
            .jobs_mut()
            .on_failed(key, job.retries, job.error_message.clone(), backoff_until)
    }
}

/// Overwrites a job's remaining retries.
pub(super) struct JobRetriesUpdatedApplier;

impl EventApplier for JobRetriesUpdatedApplier {
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        let job = job_value(value)?;
        state.jobs_mut().on_retries_updated(key, job.retries)
    }
}

/// Returns a deadline-expired job to the activatable pool.
pub(super) struct JobTimedOutApplier;

impl EventApplier for JobTimedOutApplier {
    fn apply_state(
        &self,
        key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        state: &mut ProcessingState,
    ) -> Result<()> {
        job_value(value)?;
        state.jobs_mut().on_timed_out(key)
    }
}

/// JOB_BATCH ACTIVATED carries the batch summary; the per-job state changes
/// are applied by the individual JOB ACTIVATED events.
pub(super) struct JobBatchActivatedApplier;

impl EventApplier for JobBatchActivatedApplier {
    fn apply_state(
        &self,
        _key: Key,
        value: &RecordValue,
        _timestamp: DateTime<Utc>,
        _state: &mut ProcessingState,
    ) -> Result<()> {
        match value {
            RecordValue::JobBatch(_) => Ok(()),
            other => Err(mismatched_value("job batch", other)),
        }
    }
}

//! Job lifecycle command handling.
//!
//! Workers never mutate job state directly: every intent arrives as a
//! command, is validated against current partition state, and either becomes
//! an event or a rejection naming the job involved. Competing activations
//! are resolved by command order on the log, not by locking.

use chrono::{DateTime, Duration, Utc};
use strand_core::record::{JobBatchRecord, JobRecord};
use strand_core::{Intent, Key, KeyGenerator, RecordKind, RecordValue};
use tracing::debug;

use crate::error::Rejection;
use crate::processor::PendingRecord;
use crate::state::jobs::{JobEntity, JobStatus};
use crate::state::{ProcessingState, ScheduledTaskStateView};

/// Validates job commands and produces the resulting lifecycle events.
#[derive(Debug, Default)]
pub struct JobLifecycleController;

impl JobLifecycleController {
    /// Handles JOB CREATE: a fresh key, an activatable job.
    pub fn create(&self, command: &JobRecord, keys: &mut KeyGenerator) -> Vec<PendingRecord> {
        let key = keys.next_key();
        vec![PendingRecord {
            key,
            intent: Intent::Created,
            kind: RecordKind::Event,
            rejection_reason: None,
            value: RecordValue::Job(JobRecord {
                worker: None,
                deadline: None,
                ..command.clone()
            }),
        }]
    }

    /// Handles JOB_BATCH ACTIVATE: selects up to the requested number of
    /// activatable jobs of the type, in key order, and activates each with a
    /// deadline of `now + timeout_ms`.
    ///
    /// An empty selection still yields the batch event, with no job keys;
    /// callers poll, they are not parked.
    pub fn activate_batch(
        &self,
        command: &JobBatchRecord,
        state: &ProcessingState,
        now: DateTime<Utc>,
        keys: &mut KeyGenerator,
    ) -> Result<Vec<PendingRecord>, Rejection> {
        if command.max_jobs_to_activate == 0 {
            return Err(Rejection::invalid_argument(
                "expected to activate at least one job, but maxJobsToActivate was 0",
            ));
        }
        if command.timeout_ms <= 0 {
            return Err(Rejection::invalid_argument(format!(
                "expected a positive activation timeout, got {}ms",
                command.timeout_ms
            )));
        }

        let selected = state.job_state().activatable_jobs(
            &command.job_type,
            now,
            command.max_jobs_to_activate as usize,
        );
        let deadline = now + Duration::milliseconds(command.timeout_ms);

        let mut records = Vec::with_capacity(selected.len() + 1);
        for job_key in &selected {
            let Some(entity) = state.job_state().find_job(*job_key) else {
                continue;
            };
            records.push(PendingRecord {
                key: *job_key,
                intent: Intent::Activated,
                kind: RecordKind::Event,
                rejection_reason: None,
                value: RecordValue::Job(JobRecord {
                    job_type: entity.job_type.clone(),
                    retries: entity.retries,
                    worker: command.worker.clone(),
                    deadline: Some(deadline),
                    retry_backoff_ms: 0,
                    error_message: None,
                    variables: None,
                    process_instance_key: entity.process_instance_key,
                    element_id: entity.element_id.clone(),
                    tenant_id: entity.tenant_id.clone(),
                }),
            });
        }

        debug!(
            job_type = %command.job_type,
            activated = selected.len(),
            "job batch activation"
        );

        let batch_key = keys.next_key();
        records.push(PendingRecord {
            key: batch_key,
            intent: Intent::Activated,
            kind: RecordKind::Event,
            rejection_reason: None,
            value: RecordValue::JobBatch(JobBatchRecord {
                job_keys: selected,
                ..command.clone()
            }),
        });
        Ok(records)
    }

    /// Handles JOB COMPLETE: the job must exist and be activated.
    pub fn complete(
        &self,
        job_key: Key,
        command: &JobRecord,
        state: &ProcessingState,
    ) -> Result<Vec<PendingRecord>, Rejection> {
        let entity = self.activated_job(job_key, "complete", state)?;
        Ok(vec![PendingRecord {
            key: job_key,
            intent: Intent::Completed,
            kind: RecordKind::Event,
            rejection_reason: None,
            value: RecordValue::Job(JobRecord {
                job_type: entity.job_type.clone(),
                retries: entity.retries,
                worker: entity.worker.clone(),
                deadline: None,
                retry_backoff_ms: 0,
                error_message: None,
                variables: command.variables.clone(),
                process_instance_key: entity.process_instance_key,
                element_id: entity.element_id.clone(),
                tenant_id: entity.tenant_id.clone(),
            }),
        }])
    }

    /// Handles JOB FAIL: the job must exist and be activated. The resulting
    /// retry count is taken from the command as-is, and the backoff (if any)
    /// starts at the event's timestamp.
    pub fn fail(
        &self,
        job_key: Key,
        command: &JobRecord,
        state: &ProcessingState,
    ) -> Result<Vec<PendingRecord>, Rejection> {
        let entity = self.activated_job(job_key, "fail", state)?;
        Ok(vec![PendingRecord {
            key: job_key,
            intent: Intent::Failed,
            kind: RecordKind::Event,
            rejection_reason: None,
            value: RecordValue::Job(JobRecord {
                job_type: entity.job_type.clone(),
                retries: command.retries,
                worker: None,
                deadline: None,
                retry_backoff_ms: command.retry_backoff_ms,
                error_message: command.error_message.clone(),
                variables: None,
                process_instance_key: entity.process_instance_key,
                element_id: entity.element_id.clone(),
                tenant_id: entity.tenant_id.clone(),
            }),
        }])
    }

    /// Handles JOB UPDATE_RETRIES: revives a job that ran out of retries.
    /// The new count must be positive.
    pub fn update_retries(
        &self,
        job_key: Key,
        command: &JobRecord,
        state: &ProcessingState,
    ) -> Result<Vec<PendingRecord>, Rejection> {
        if command.retries == 0 {
            return Err(Rejection::invalid_argument(format!(
                "expected to update retries of job with key {job_key} to a positive count, got 0"
            )));
        }
        let entity = state
            .job_state()
            .find_job(job_key)
            .ok_or_else(|| Self::job_not_found(job_key, "update retries of"))?;
        Ok(vec![PendingRecord {
            key: job_key,
            intent: Intent::RetriesUpdated,
            kind: RecordKind::Event,
            rejection_reason: None,
            value: RecordValue::Job(JobRecord {
                job_type: entity.job_type.clone(),
                retries: command.retries,
                worker: None,
                deadline: None,
                retry_backoff_ms: 0,
                error_message: None,
                variables: None,
                process_instance_key: entity.process_instance_key,
                element_id: entity.element_id.clone(),
                tenant_id: entity.tenant_id.clone(),
            }),
        }])
    }

    /// Scheduled sweep over activated jobs whose deadline passed at `now`.
    /// Each produces a TIMED_OUT event returning the job to the pool.
    ///
    /// The deadline is evaluated only here; an expired job stays formally
    /// activated until the sweep runs.
    pub fn sweep_timeouts(&self, state: &ProcessingState, now: DateTime<Utc>) -> Vec<PendingRecord> {
        state
            .job_state()
            .jobs_past_deadline(now)
            .into_iter()
            .filter_map(|job_key| state.job_state().find_job(job_key))
            .map(|entity| PendingRecord {
                key: entity.key,
                intent: Intent::TimedOut,
                kind: RecordKind::Event,
                rejection_reason: None,
                value: RecordValue::Job(JobRecord {
                    job_type: entity.job_type.clone(),
                    retries: entity.retries,
                    worker: entity.worker.clone(),
                    deadline: None,
                    retry_backoff_ms: 0,
                    error_message: None,
                    variables: None,
                    process_instance_key: entity.process_instance_key,
                    element_id: entity.element_id.clone(),
                    tenant_id: entity.tenant_id.clone(),
                }),
            })
            .collect()
    }

    fn activated_job<'a>(
        &self,
        job_key: Key,
        verb: &str,
        state: &'a ProcessingState,
    ) -> Result<&'a JobEntity, Rejection> {
        let entity = state
            .job_state()
            .find_job(job_key)
            .ok_or_else(|| Self::job_not_found(job_key, verb))?;
        if entity.state != JobStatus::Activated {
            return Err(Rejection::invalid_state(format!(
                "expected to {verb} job with key {job_key}, but it is {}",
                entity.state.name()
            )));
        }
        Ok(entity)
    }

    fn job_not_found(job_key: Key, verb: &str) -> Rejection {
        Rejection::not_found(format!(
            "expected to {verb} job with key {job_key}, but no such job exists"
        ))
    }
}

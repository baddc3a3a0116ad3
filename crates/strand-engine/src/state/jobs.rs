//! Jobs sub-state: the entities behind the job lifecycle state machine.
//!
//! Job state is mutated only by appliers, never directly by callers. The
//! activatable index holds every job that could be handed to a worker:
//! jobs in `Activatable` state, and failed jobs with retries left whose
//! backoff is evaluated lazily at activation-sweep time.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use strand_core::{Key, record::JobRecord};

use crate::error::{Error, Result};

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Eligible for activation by a worker.
    Activatable,
    /// Handed to a worker; has a processing deadline.
    Activated,
    /// Failed. With retries left it becomes activatable again once its
    /// backoff elapses; with zero retries it is parked.
    Failed,
    /// Terminal.
    Completed,
}

impl JobStatus {
    /// Returns the state name as used in rejection messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Activatable => "ACTIVATABLE",
            Self::Activated => "ACTIVATED",
            Self::Failed => "FAILED",
            Self::Completed => "COMPLETED",
        }
    }
}

/// A job persisted in partition state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntity {
    /// System-assigned job key.
    pub key: Key,
    /// Job type, matched against activation type filters.
    pub job_type: String,
    /// Remaining attempts.
    pub retries: u32,
    /// Current lifecycle state.
    pub state: JobStatus,
    /// Worker holding the job, while activated.
    pub worker: Option<String>,
    /// Processing deadline, while activated.
    pub deadline: Option<DateTime<Utc>>,
    /// Earliest wall-clock instant a failed job may be re-activated.
    pub backoff_until: Option<DateTime<Utc>>,
    /// Error message recorded on the last failure.
    pub error_message: Option<String>,
    /// Process instance the job belongs to.
    pub process_instance_key: Option<Key>,
    /// Element the job was created for.
    pub element_id: Option<String>,
    /// Owning tenant.
    pub tenant_id: String,
}

impl JobEntity {
    /// Builds a fresh activatable job from a JOB CREATED record payload.
    #[must_use]
    pub fn from_record(key: Key, value: &JobRecord) -> Self {
        Self {
            key,
            job_type: value.job_type.clone(),
            retries: value.retries,
            state: JobStatus::Activatable,
            worker: None,
            deadline: None,
            backoff_until: None,
            error_message: None,
            process_instance_key: value.process_instance_key,
            element_id: value.element_id.clone(),
            tenant_id: value.tenant_id.clone(),
        }
    }

    /// Returns true if the job may be handed to a worker at `now`.
    ///
    /// Backoff is cooperative: it is checked here, at activation-sweep
    /// time, not by a timer.
    #[must_use]
    pub fn can_activate(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            JobStatus::Activatable => true,
            JobStatus::Failed => {
                self.retries > 0 && self.backoff_until.map_or(true, |until| until <= now)
            }
            JobStatus::Activated | JobStatus::Completed => false,
        }
    }
}

/// All jobs of one partition.
#[derive(Debug, Default)]
pub struct JobState {
    jobs: HashMap<u64, JobEntity>,
    /// (job type, key) index over jobs that may become activatable.
    activatable: BTreeSet<(String, u64)>,
}

impl JobState {
    /// Looks up a job by key.
    #[must_use]
    pub fn find_job(&self, key: Key) -> Option<&JobEntity> {
        self.jobs.get(&key.value())
    }

    /// Selects up to `limit` jobs of the given type that can be activated
    /// at `now`, in key order.
    #[must_use]
    pub fn activatable_jobs(&self, job_type: &str, now: DateTime<Utc>, limit: usize) -> Vec<Key> {
        self.activatable
            .range((job_type.to_string(), 0)..=(job_type.to_string(), u64::MAX))
            .filter_map(|(_, key)| self.jobs.get(key))
            .filter(|job| job.can_activate(now))
            .take(limit)
            .map(|job| job.key)
            .collect()
    }

    /// Returns activated jobs whose deadline has passed at `now`.
    #[must_use]
    pub fn jobs_past_deadline(&self, now: DateTime<Utc>) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .jobs
            .values()
            .filter(|job| job.state == JobStatus::Activated)
            .filter(|job| job.deadline.is_some_and(|deadline| deadline < now))
            .map(|job| job.key)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Stores a newly created job and indexes it as activatable.
    pub fn on_created(&mut self, entity: JobEntity) {
        self.activatable
            .insert((entity.job_type.clone(), entity.key.value()));
        self.jobs.insert(entity.key.value(), entity);
    }

    /// Applies a JOB ACTIVATED event: the job leaves the activatable index
    /// and starts its processing deadline.
    ///
    /// Commands are validated before their events are appended, so a job
    /// found in a state the event cannot apply to means the log is
    /// corrupted; the error is fatal, not a rejection.
    pub fn on_activated(
        &mut self,
        key: Key,
        worker: Option<String>,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let job = self.job_mut(key)?;
        if matches!(job.state, JobStatus::Activated | JobStatus::Completed) {
            return Err(transition_violation(job, JobStatus::Activated));
        }
        job.state = JobStatus::Activated;
        job.worker = worker;
        job.deadline = deadline;
        job.backoff_until = None;
        let job_type = job.job_type.clone();
        self.activatable.remove(&(job_type, key.value()));
        Ok(())
    }

    /// Applies a JOB COMPLETED event.
    pub fn on_completed(&mut self, key: Key) -> Result<()> {
        let job = self.job_mut(key)?;
        if job.state != JobStatus::Activated {
            return Err(transition_violation(job, JobStatus::Completed));
        }
        job.state = JobStatus::Completed;
        job.worker = None;
        job.deadline = None;
        let job_type = job.job_type.clone();
        self.activatable.remove(&(job_type, key.value()));
        Ok(())
    }

    /// Applies a JOB FAILED event. `retries` is the resulting count the
    /// caller set explicitly; with retries left the job re-enters the
    /// activatable index, otherwise it is parked.
    pub fn on_failed(
        &mut self,
        key: Key,
        retries: u32,
        error_message: Option<String>,
        backoff_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let job = self.job_mut(key)?;
        if job.state != JobStatus::Activated {
            return Err(transition_violation(job, JobStatus::Failed));
        }
        job.state = JobStatus::Failed;
        job.retries = retries;
        job.error_message = error_message;
        job.backoff_until = backoff_until;
        job.worker = None;
        job.deadline = None;
        let job_type = job.job_type.clone();
        if retries > 0 {
            self.activatable.insert((job_type, key.value()));
        } else {
            self.activatable.remove(&(job_type, key.value()));
        }
        Ok(())
    }

    /// Applies a JOB RETRIES_UPDATED event; a parked job with new retries
    /// re-enters the activatable index.
    pub fn on_retries_updated(&mut self, key: Key, retries: u32) -> Result<()> {
        let job = self.job_mut(key)?;
        job.retries = retries;
        let job_type = job.job_type.clone();
        let state = job.state;
        if state == JobStatus::Failed && retries > 0 {
            self.activatable.insert((job_type, key.value()));
        }
        Ok(())
    }

    /// Applies a JOB TIMED_OUT event: the deadline passed, the job returns
    /// to the activatable pool.
    pub fn on_timed_out(&mut self, key: Key) -> Result<()> {
        let job = self.job_mut(key)?;
        if job.state != JobStatus::Activated {
            return Err(transition_violation(job, JobStatus::Activatable));
        }
        job.state = JobStatus::Activatable;
        job.worker = None;
        job.deadline = None;
        let job_type = job.job_type.clone();
        self.activatable.insert((job_type, key.value()));
        Ok(())
    }

    /// Returns all jobs, sorted by key for deterministic comparison.
    #[must_use]
    pub fn snapshot(&self) -> Vec<JobEntity> {
        let mut jobs: Vec<_> = self.jobs.values().cloned().collect();
        jobs.sort_by_key(|job| job.key);
        jobs
    }

    fn job_mut(&mut self, key: Key) -> Result<&mut JobEntity> {
        self.jobs
            .get_mut(&key.value())
            .ok_or(Error::JobNotFound { job_key: key })
    }
}

fn transition_violation(job: &JobEntity, to: JobStatus) -> Error {
    Error::invalid_state_transition(
        job.state.name(),
        to.name(),
        format!("job {}", job.key),
    )
}

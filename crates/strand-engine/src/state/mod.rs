//! Partitioned, tenant-scoped mutable state.
//!
//! [`ProcessingState`] is the explicit state context passed to every applier
//! invocation. It is owned by the single-threaded processing loop — there is
//! no interior locking, and no two appliers ever run concurrently against
//! the same partition. An applier for one intent may touch several
//! sub-states; because records are applied one at a time, all such mutations
//! become visible atomically to subsequent reads.

pub mod deployments;
pub mod forms;
pub mod instances;
pub mod jobs;
pub mod processes;
mod versions;

use deployments::DeploymentState;
use forms::FormState;
use instances::ProcessInstanceState;
use jobs::JobState;
use processes::ProcessState;

/// Read-side facade aggregating the partition's sub-states.
///
/// Consumers that only query state (scheduled sweeps, command validation)
/// take this instead of the mutable facade.
pub trait ScheduledTaskStateView {
    /// The form definitions sub-state.
    fn form_state(&self) -> &FormState;
    /// The process definitions sub-state.
    fn process_state(&self) -> &ProcessState;
    /// The deployments sub-state.
    fn deployment_state(&self) -> &DeploymentState;
    /// The jobs sub-state.
    fn job_state(&self) -> &JobState;
    /// The process instances sub-state.
    fn process_instance_state(&self) -> &ProcessInstanceState;
}

/// The mutable state of one partition.
#[derive(Debug, Default)]
pub struct ProcessingState {
    forms: FormState,
    processes: ProcessState,
    deployments: DeploymentState,
    jobs: JobState,
    instances: ProcessInstanceState,
}

impl ProcessingState {
    /// Creates empty partition state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access to the form definitions sub-state.
    pub fn forms_mut(&mut self) -> &mut FormState {
        &mut self.forms
    }

    /// Mutable access to the process definitions sub-state.
    pub fn processes_mut(&mut self) -> &mut ProcessState {
        &mut self.processes
    }

    /// Mutable access to the deployments sub-state.
    pub fn deployments_mut(&mut self) -> &mut DeploymentState {
        &mut self.deployments
    }

    /// Mutable access to the jobs sub-state.
    pub fn jobs_mut(&mut self) -> &mut JobState {
        &mut self.jobs
    }

    /// Mutable access to the process instances sub-state.
    pub fn instances_mut(&mut self) -> &mut ProcessInstanceState {
        &mut self.instances
    }
}

impl ScheduledTaskStateView for ProcessingState {
    fn form_state(&self) -> &FormState {
        &self.forms
    }

    fn process_state(&self) -> &ProcessState {
        &self.processes
    }

    fn deployment_state(&self) -> &DeploymentState {
        &self.deployments
    }

    fn job_state(&self) -> &JobState {
        &self.jobs
    }

    fn process_instance_state(&self) -> &ProcessInstanceState {
        &self.instances
    }
}

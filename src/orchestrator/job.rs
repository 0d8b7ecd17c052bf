//! Drives one named workflow on one organization end to end: dispatch,
//! locate the newly created run, poll it to completion, classify the
//! conclusion.

use std::fmt;

use tracing::{debug, info};

use crate::error::FleetError;
use crate::github::types::{RunConclusion, WorkflowRun};
use crate::github::FleetOps;
use crate::poller::Poller;

/// Per-org progression of a dispatched workflow. A failure at any phase is
/// terminal for the whole batch, not just this org.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Dispatched,
    Located,
    Polling,
    Succeeded,
    Failed,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Dispatched => write!(f, "dispatched"),
            JobPhase::Located => write!(f, "located"),
            JobPhase::Polling => write!(f, "polling"),
            JobPhase::Succeeded => write!(f, "succeeded"),
            JobPhase::Failed => write!(f, "failed"),
        }
    }
}

pub struct JobOrchestrator<'a> {
    api: &'a dyn FleetOps,
    poller: Poller<'a>,
    repo: &'a str,
    workflow_file: &'a str,
    dispatch_ref: &'a str,
}

impl<'a> JobOrchestrator<'a> {
    pub fn new(
        api: &'a dyn FleetOps,
        poller: Poller<'a>,
        repo: &'a str,
        workflow_file: &'a str,
        dispatch_ref: &'a str,
    ) -> Self {
        Self {
            api,
            poller,
            repo,
            workflow_file,
            dispatch_ref,
        }
    }

    /// Issue the workflow dispatch. Anything but an acknowledged dispatch is
    /// fatal for the whole batch.
    pub async fn dispatch(&self, org: &str) -> Result<(), FleetError> {
        self.api
            .dispatch_workflow(org, self.repo, self.workflow_file, self.dispatch_ref)
            .await
            .map_err(|source| FleetError::DispatchRejected {
                org: org.to_string(),
                workflow: self.workflow_file.to_string(),
                source,
            })?;
        info!(
            org,
            workflow = self.workflow_file,
            phase = %JobPhase::Dispatched,
            "workflow dispatched"
        );
        Ok(())
    }

    /// Take the newest run of the workflow. Dispatches are separated from
    /// this lookup by the batch grace wait, so the newest run is ours.
    pub async fn locate_latest_run(&self, org: &str) -> Result<WorkflowRun, FleetError> {
        let run = self
            .api
            .latest_workflow_run(org, self.repo, self.workflow_file)
            .await
            .map_err(|source| FleetError::RunLookupFailed {
                org: org.to_string(),
                workflow: self.workflow_file.to_string(),
                source,
            })?
            .ok_or_else(|| FleetError::RunNotFound {
                org: org.to_string(),
                workflow: self.workflow_file.to_string(),
            })?;
        info!(
            org,
            run_id = run.id,
            created_at = %run.created_at,
            phase = %JobPhase::Located,
            "located latest workflow run"
        );
        Ok(run)
    }

    /// Poll the run until its status is completed, then classify the
    /// conclusion. The conclusion is never read before completion.
    pub async fn await_success(
        &self,
        org: &str,
        run: WorkflowRun,
    ) -> Result<WorkflowRun, FleetError> {
        println!("   ⏳ Waiting for {} to complete...", run.html_url);
        debug!(org, run_id = run.id, phase = %JobPhase::Polling, "polling run to completion");
        let run_id = run.id;
        let label = format!("{org} {} run {run_id}", self.workflow_file);

        let completed = self
            .poller
            .wait_until(
                &label,
                || async move {
                    self.api.workflow_run(org, self.repo, run_id).await.map_err(
                        |source| FleetError::RunFetchFailed {
                            org: org.to_string(),
                            run_id,
                            source,
                        },
                    )
                },
                |state: &WorkflowRun| state.status.is_completed(),
            )
            .await?;

        let conclusion = completed.conclusion.clone();
        if conclusion.as_ref().is_some_and(RunConclusion::is_success) {
            info!(org, run_id, phase = %JobPhase::Succeeded, "run concluded successfully");
            Ok(completed)
        } else {
            info!(org, run_id, phase = %JobPhase::Failed, "run concluded without success");
            Err(FleetError::JobFailed {
                org: org.to_string(),
                conclusion: conclusion
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                run_url: completed.html_url,
            })
        }
    }
}

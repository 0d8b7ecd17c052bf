// In-process fake of the GitHub boundary - no side effects, records every
// call so tests can assert on ordering across phases.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use mgmt_fleet::github::types::{
    Account, BaseRef, CheckRun, CheckRunList, HeadRef, MergeOutcome, RepoRef, RunConclusion,
    RunStatus, UpgradePull, WorkflowRun,
};
use mgmt_fleet::github::{FleetOps, GitHubError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Dispatch { org: String, workflow: String },
    ListRuns { org: String },
    GetRun { org: String, run_id: u64 },
    ListPulls { org: String },
    ListChecks { repo: String, git_ref: String },
    Merge { repo: String, number: u64 },
}

/// Scripted fake. Run and check states are consumed as sequences; the last
/// entry repeats so poll loops converge.
#[derive(Default)]
pub struct FakeFleet {
    calls: Mutex<Vec<ApiCall>>,
    dispatch_rejections: Mutex<HashMap<String, u16>>,
    latest_runs: Mutex<HashMap<String, WorkflowRun>>,
    run_states: Mutex<HashMap<String, Vec<WorkflowRun>>>,
    pulls: Mutex<HashMap<String, UpgradePull>>,
    check_states: Mutex<HashMap<String, Vec<CheckRunList>>>,
    merge_rejections: Mutex<HashMap<String, String>>,
}

#[allow(dead_code)]
impl FakeFleet {
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reject_dispatch(&self, org: &str, status: u16) {
        self.dispatch_rejections
            .lock()
            .unwrap()
            .insert(org.to_string(), status);
    }

    /// Script the newest run returned by the listing call for an org.
    pub fn script_latest_run(&self, org: &str, run: WorkflowRun) {
        self.latest_runs
            .lock()
            .unwrap()
            .insert(org.to_string(), run);
    }

    /// Script the sequence of states the run fetch returns for an org.
    pub fn script_run_states(&self, org: &str, states: Vec<WorkflowRun>) {
        self.run_states
            .lock()
            .unwrap()
            .insert(org.to_string(), states);
    }

    pub fn script_pull(&self, org: &str, pull: UpgradePull) {
        self.pulls.lock().unwrap().insert(org.to_string(), pull);
    }

    /// Script the sequence of check suites for a `owner/repo@ref` key.
    pub fn script_check_states(&self, repo_full_name: &str, git_ref: &str, states: Vec<CheckRunList>) {
        self.check_states
            .lock()
            .unwrap()
            .insert(format!("{repo_full_name}@{git_ref}"), states);
    }

    pub fn reject_merge(&self, repo_full_name: &str, message: &str) {
        self.merge_rejections
            .lock()
            .unwrap()
            .insert(repo_full_name.to_string(), message.to_string());
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn next_state<T: Clone>(sequence: &mut Vec<T>) -> T {
    if sequence.len() > 1 {
        sequence.remove(0)
    } else {
        sequence[0].clone()
    }
}

#[async_trait]
impl FleetOps for FakeFleet {
    async fn dispatch_workflow(
        &self,
        org: &str,
        _repo: &str,
        workflow_file: &str,
        _git_ref: &str,
    ) -> Result<(), GitHubError> {
        self.record(ApiCall::Dispatch {
            org: org.to_string(),
            workflow: workflow_file.to_string(),
        });
        if let Some(status) = self.dispatch_rejections.lock().unwrap().get(org) {
            return Err(GitHubError::UnexpectedStatus {
                status: *status,
                context: format!("workflow dispatch {org}"),
            });
        }
        Ok(())
    }

    async fn latest_workflow_run(
        &self,
        org: &str,
        _repo: &str,
        _workflow_file: &str,
    ) -> Result<Option<WorkflowRun>, GitHubError> {
        self.record(ApiCall::ListRuns {
            org: org.to_string(),
        });
        Ok(self.latest_runs.lock().unwrap().get(org).cloned())
    }

    async fn workflow_run(
        &self,
        org: &str,
        _repo: &str,
        run_id: u64,
    ) -> Result<WorkflowRun, GitHubError> {
        self.record(ApiCall::GetRun {
            org: org.to_string(),
            run_id,
        });
        let mut states = self.run_states.lock().unwrap();
        let sequence = states
            .get_mut(org)
            .unwrap_or_else(|| panic!("no run states scripted for {org}"));
        Ok(next_state(sequence))
    }

    async fn open_upgrade_pull(
        &self,
        org: &str,
        _repo: &str,
        _head_branch: &str,
    ) -> Result<Option<UpgradePull>, GitHubError> {
        self.record(ApiCall::ListPulls {
            org: org.to_string(),
        });
        Ok(self.pulls.lock().unwrap().get(org).cloned())
    }

    async fn check_runs_for_ref(
        &self,
        repo: &RepoRef,
        git_ref: &str,
    ) -> Result<CheckRunList, GitHubError> {
        let full_name = repo.full_name();
        self.record(ApiCall::ListChecks {
            repo: full_name.clone(),
            git_ref: git_ref.to_string(),
        });
        let key = format!("{full_name}@{git_ref}");
        let mut states = self.check_states.lock().unwrap();
        let sequence = states
            .get_mut(&key)
            .unwrap_or_else(|| panic!("no check states scripted for {key}"));
        Ok(next_state(sequence))
    }

    async fn squash_merge(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<MergeOutcome, GitHubError> {
        let full_name = repo.full_name();
        self.record(ApiCall::Merge {
            repo: full_name.clone(),
            number,
        });
        if let Some(message) = self.merge_rejections.lock().unwrap().get(&full_name) {
            return Ok(MergeOutcome {
                merged: false,
                message: Some(message.clone()),
            });
        }
        Ok(MergeOutcome {
            merged: true,
            message: None,
        })
    }
}

// -- builders ---------------------------------------------------------------

pub fn run(id: u64, status: &str, conclusion: Option<&str>) -> WorkflowRun {
    WorkflowRun {
        id,
        status: RunStatus::from(status.to_string()),
        conclusion: conclusion.map(|c| RunConclusion::from(c.to_string())),
        html_url: format!("https://github.com/org/github-mgmt/actions/runs/{id}"),
        created_at: Utc::now(),
    }
}

#[allow(dead_code)]
pub fn pull(number: u64, org: &str, head_owner: &str) -> UpgradePull {
    UpgradePull {
        number,
        html_url: format!("https://github.com/{org}/github-mgmt/pull/{number}"),
        head: HeadRef {
            ref_field: "master-upgrade".to_string(),
            repo: Some(RepoRef {
                name: "github-mgmt".to_string(),
                owner: Account {
                    login: head_owner.to_string(),
                },
            }),
        },
        base: BaseRef {
            ref_field: "master".to_string(),
            repo: RepoRef {
                name: "github-mgmt".to_string(),
                owner: Account {
                    login: org.to_string(),
                },
            },
        },
    }
}

#[allow(dead_code)]
pub fn checks(entries: &[(&str, &str, Option<&str>)]) -> CheckRunList {
    CheckRunList {
        check_runs: entries
            .iter()
            .map(|(name, status, conclusion)| CheckRun {
                name: name.to_string(),
                status: RunStatus::from(status.to_string()),
                conclusion: conclusion.map(|c| RunConclusion::from(c.to_string())),
            })
            .collect(),
    }
}

#[allow(dead_code)]
pub fn test_config(orgs: &[&str]) -> mgmt_fleet::FleetConfig {
    mgmt_fleet::FleetConfig {
        orgs: orgs.iter().map(|org| org.to_string()).collect(),
        ..mgmt_fleet::FleetConfig::default()
    }
}

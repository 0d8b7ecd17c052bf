//! Crate-owned wire types for the slice of the GitHub REST API this tool
//! consumes. Payloads are deserialized directly from the raw endpoints rather
//! than going through octocrab's model types, so the fields below are exactly
//! the ones the orchestration reads.

use serde::Deserialize;
use std::fmt;

/// Status of a workflow run or check run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Unknown(String),
}

impl From<String> for RunStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            _ => RunStatus::Unknown(status),
        }
    }
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Queued => write!(f, "queued"),
            RunStatus::InProgress => write!(f, "in_progress"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Unknown(other) => write!(f, "{other}"),
        }
    }
}

/// Conclusion of a completed workflow run or check run. Only meaningful once
/// the matching status is `completed`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RunConclusion {
    Success,
    Failure,
    Cancelled,
    TimedOut,
    Unknown(String),
}

impl From<String> for RunConclusion {
    fn from(conclusion: String) -> Self {
        match conclusion.as_str() {
            "success" => RunConclusion::Success,
            "failure" => RunConclusion::Failure,
            "cancelled" => RunConclusion::Cancelled,
            "timed_out" => RunConclusion::TimedOut,
            _ => RunConclusion::Unknown(conclusion),
        }
    }
}

impl RunConclusion {
    pub fn is_success(&self) -> bool {
        matches!(self, RunConclusion::Success)
    }
}

impl fmt::Display for RunConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunConclusion::Success => write!(f, "success"),
            RunConclusion::Failure => write!(f, "failure"),
            RunConclusion::Cancelled => write!(f, "cancelled"),
            RunConclusion::TimedOut => write!(f, "timed_out"),
            RunConclusion::Unknown(other) => write!(f, "{other}"),
        }
    }
}

/// One execution of a dispatched workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub status: RunStatus,
    pub conclusion: Option<RunConclusion>,
    pub html_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Page shape of `GET /repos/{owner}/{repo}/actions/workflows/{file}/runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunPage {
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub login: String,
}

/// A repository identity as it appears nested in pull request payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoRef {
    pub name: String,
    pub owner: Account,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }
}

/// Head side of a pull request. The repository is absent when a fork has been
/// deleted out from under an open PR.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadRef {
    #[serde(rename = "ref")]
    pub ref_field: String,
    pub repo: Option<RepoRef>,
}

/// Base side of a pull request. Write operations (check listing, merge) must
/// be scoped here, never to the head repository.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseRef {
    #[serde(rename = "ref")]
    pub ref_field: String,
    pub repo: RepoRef,
}

/// An open pull request produced by an upgrade workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct UpgradePull {
    pub number: u64,
    pub html_url: String,
    pub head: HeadRef,
    pub base: BaseRef,
}

impl UpgradePull {
    pub fn base_repo(&self) -> &RepoRef {
        &self.base.repo
    }

    pub fn head_ref(&self) -> &str {
        &self.head.ref_field
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    pub name: String,
    pub status: RunStatus,
    pub conclusion: Option<RunConclusion>,
}

/// Response shape of `GET /repos/{owner}/{repo}/commits/{ref}/check-runs`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRunList {
    pub check_runs: Vec<CheckRun>,
}

impl CheckRunList {
    /// The suite is complete once every check run has reached a terminal
    /// status. Conclusions must not be inspected before this returns true.
    pub fn all_completed(&self) -> bool {
        self.check_runs.iter().all(|check| check.status.is_completed())
    }

    /// Names of check runs whose conclusion is anything other than success.
    /// Only valid on a completed suite.
    pub fn failing_names(&self) -> Vec<String> {
        self.check_runs
            .iter()
            .filter(|check| {
                !check
                    .conclusion
                    .as_ref()
                    .is_some_and(RunConclusion::is_success)
            })
            .map(|check| check.name.clone())
            .collect()
    }
}

/// Response of `PUT /repos/{owner}/{repo}/pulls/{number}/merge`.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeOutcome {
    pub merged: bool,
    #[serde(default)]
    pub message: Option<String>,
}

use thiserror::Error;

use crate::github::GitHubError;

/// Fatal orchestration failures. Any of these aborts the whole batch; the
/// top-level caller translates them into a non-zero exit. Transient
/// rate-limit conditions never surface here, they are absorbed inside the
/// GitHub client.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("workflow dispatch rejected for {org} ({workflow}): {source}")]
    DispatchRejected {
        org: String,
        workflow: String,
        #[source]
        source: GitHubError,
    },

    #[error("failed to list {workflow} runs for {org}: {source}")]
    RunLookupFailed {
        org: String,
        workflow: String,
        #[source]
        source: GitHubError,
    },

    #[error("no {workflow} runs found for {org} after dispatch")]
    RunNotFound { org: String, workflow: String },

    #[error("failed to fetch run {run_id} for {org}: {source}")]
    RunFetchFailed {
        org: String,
        run_id: u64,
        #[source]
        source: GitHubError,
    },

    #[error("job failed for {org} with conclusion '{conclusion}': {run_url}")]
    JobFailed {
        org: String,
        conclusion: String,
        run_url: String,
    },

    #[error("failed to list open pull requests for {org}: {source}")]
    PullLookupFailed {
        org: String,
        #[source]
        source: GitHubError,
    },

    #[error("failed to list check runs for {pr_url}: {source}")]
    CheckLookupFailed {
        pr_url: String,
        #[source]
        source: GitHubError,
    },

    #[error("checks failed for {pr_url}: {}", failed.join(", "))]
    ChecksFailed { pr_url: String, failed: Vec<String> },

    #[error("failed to merge {pr_url}: {source}")]
    MergeFailed {
        pr_url: String,
        #[source]
        source: GitHubError,
    },

    #[error("merge of {pr_url} was not performed: {message}")]
    MergeRejected { pr_url: String, message: String },

    #[error("gave up waiting for {operation} after {waited_secs}s")]
    PollTimeout { operation: String, waited_secs: u64 },
}

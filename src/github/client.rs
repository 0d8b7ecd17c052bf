use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use octocrab::Octocrab;
use serde_json::json;
use tracing::{debug, warn};

use super::errors::GitHubError;
use super::types::{
    CheckRunList, MergeOutcome, RepoRef, UpgradePull, WorkflowRun, WorkflowRunPage,
};

/// The remote operations the orchestration core consumes. Kept as a trait so
/// flows can be exercised against in-process fakes.
#[async_trait]
pub trait FleetOps: Send + Sync {
    /// Dispatch a workflow file against a ref. Succeeds only when the API
    /// acknowledges with 204.
    async fn dispatch_workflow(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
    ) -> Result<(), GitHubError>;

    /// Newest run of the given workflow, if any exist.
    async fn latest_workflow_run(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
    ) -> Result<Option<WorkflowRun>, GitHubError>;

    async fn workflow_run(
        &self,
        org: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<WorkflowRun, GitHubError>;

    /// The single open PR with the given head branch, if one exists.
    async fn open_upgrade_pull(
        &self,
        org: &str,
        repo: &str,
        head_branch: &str,
    ) -> Result<Option<UpgradePull>, GitHubError>;

    async fn check_runs_for_ref(
        &self,
        repo: &RepoRef,
        git_ref: &str,
    ) -> Result<CheckRunList, GitHubError>;

    async fn squash_merge(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<MergeOutcome, GitHubError>;
}

/// Octocrab-backed client with client-side request pacing and indefinite
/// retry of rate-limited responses. Transient throttling never escapes this
/// boundary; every other error surfaces to the caller unretried.
#[derive(Debug)]
pub struct FleetClient {
    octocrab: Octocrab,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

const CHECKS_PAGE_SIZE: u8 = 100;

impl FleetClient {
    pub fn from_env() -> Result<Self, GitHubError> {
        Self::new(Self::read_token()?)
    }

    pub fn new(token: String) -> Result<Self, GitHubError> {
        let octocrab = Octocrab::builder().personal_token(token).build()?;
        Ok(Self::from_octocrab(octocrab))
    }

    /// Point the client at a non-default API endpoint (GitHub Enterprise, or
    /// a mock server in tests).
    pub fn with_base_uri(token: String, base_uri: &str) -> Result<Self, GitHubError> {
        let octocrab = Octocrab::builder()
            .personal_token(token)
            .base_uri(base_uri)?
            .build()?;
        Ok(Self::from_octocrab(octocrab))
    }

    fn from_octocrab(octocrab: Octocrab) -> Self {
        // Authenticated callers get 5000 requests/hour. One request per
        // second with a burst of 10 keeps a long polling batch well inside
        // that allowance.
        let quota = Quota::per_second(NonZeroU32::new(1).unwrap())
            .allow_burst(NonZeroU32::new(10).unwrap());
        Self {
            octocrab,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    fn read_token() -> Result<String, GitHubError> {
        for key in ["MGMT_FLEET_GITHUB_TOKEN", "GITHUB_TOKEN"] {
            if let Ok(token) = std::env::var(key) {
                if !token.is_empty() {
                    return Ok(token);
                }
            }
        }
        Err(GitHubError::TokenNotFound(
            "GitHub token not found. Set MGMT_FLEET_GITHUB_TOKEN or GITHUB_TOKEN with a \
             personal access token that can dispatch workflows on the management repositories."
                .to_string(),
        ))
    }

    /// Run one API call under the pacing quota, retrying forever while the
    /// server reports a primary or secondary rate limit.
    async fn paced<T, F, Fut>(&self, mut call: F) -> Result<T, octocrab::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, octocrab::Error>>,
    {
        let mut attempt: u32 = 0;
        loop {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if is_rate_limited(&err) => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        "GitHub rate limit hit, backing off before retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_json<T>(&self, route: String) -> Result<T, GitHubError>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!(route = %route, "GET");
        self.paced(|| {
            let octocrab = self.octocrab.clone();
            let route = route.clone();
            async move { octocrab.get(route, None::<&()>).await }
        })
        .await
        .map_err(GitHubError::ApiError)
    }
}

fn is_rate_limited(err: &octocrab::Error) -> bool {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            status == 429
                || (status == 403 && source.message.to_lowercase().contains("rate limit"))
        }
        _ => false,
    }
}

/// octocrab does not surface the server's Retry-After hint, so back off
/// exponentially, capped at the documented secondary-limit window.
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs((1u64 << (attempt - 1).min(6)).min(60))
}

#[async_trait]
impl FleetOps for FleetClient {
    async fn dispatch_workflow(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
        git_ref: &str,
    ) -> Result<(), GitHubError> {
        let route = format!("/repos/{org}/{repo}/actions/workflows/{workflow_file}/dispatches");
        let response = self
            .paced(|| {
                let octocrab = self.octocrab.clone();
                let route = route.clone();
                let payload = json!({ "ref": git_ref });
                async move {
                    let response = octocrab._post(route, Some(&payload)).await?;
                    octocrab::map_github_error(response).await
                }
            })
            .await
            .map_err(GitHubError::ApiError)?;

        let status = response.status().as_u16();
        if status != 204 {
            return Err(GitHubError::UnexpectedStatus {
                status,
                context: format!("workflow dispatch {org}/{repo}/{workflow_file}"),
            });
        }
        Ok(())
    }

    async fn latest_workflow_run(
        &self,
        org: &str,
        repo: &str,
        workflow_file: &str,
    ) -> Result<Option<WorkflowRun>, GitHubError> {
        let route =
            format!("/repos/{org}/{repo}/actions/workflows/{workflow_file}/runs?per_page=1");
        let page: WorkflowRunPage = self.get_json(route).await?;
        Ok(page.workflow_runs.into_iter().next())
    }

    async fn workflow_run(
        &self,
        org: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<WorkflowRun, GitHubError> {
        let route = format!("/repos/{org}/{repo}/actions/runs/{run_id}");
        self.get_json(route).await
    }

    async fn open_upgrade_pull(
        &self,
        org: &str,
        repo: &str,
        head_branch: &str,
    ) -> Result<Option<UpgradePull>, GitHubError> {
        let route = format!(
            "/repos/{org}/{repo}/pulls?state=open&head={org}:{head_branch}&per_page=1"
        );
        let pulls: Vec<UpgradePull> = self.get_json(route).await?;
        Ok(pulls.into_iter().next())
    }

    async fn check_runs_for_ref(
        &self,
        repo: &RepoRef,
        git_ref: &str,
    ) -> Result<CheckRunList, GitHubError> {
        let route = format!(
            "/repos/{}/{}/commits/{git_ref}/check-runs?per_page={CHECKS_PAGE_SIZE}",
            repo.owner.login, repo.name
        );
        self.get_json(route).await
    }

    async fn squash_merge(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<MergeOutcome, GitHubError> {
        let route = format!(
            "/repos/{}/{}/pulls/{number}/merge",
            repo.owner.login, repo.name
        );
        self.paced(|| {
            let octocrab = self.octocrab.clone();
            let route = route.clone();
            let payload = json!({ "merge_method": "squash" });
            async move { octocrab.put(route, Some(&payload)).await }
        })
        .await
        .map_err(GitHubError::ApiError)
    }
}

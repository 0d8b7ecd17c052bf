//! Gate for pull requests opened by the upgrade workflow: discover the one
//! persistent PR per organization, wait for its check suite to finish, and
//! squash-merge once everything passes. All write-scoped calls target the
//! PR's base repository, which matters when the head lives in a fork.

use tracing::info;

use crate::error::FleetError;
use crate::github::types::{CheckRunList, UpgradePull};
use crate::github::FleetOps;
use crate::poller::Poller;

pub struct PrGate<'a> {
    api: &'a dyn FleetOps,
    poller: Poller<'a>,
    repo: &'a str,
    head_branch: &'a str,
}

impl<'a> PrGate<'a> {
    pub fn new(
        api: &'a dyn FleetOps,
        poller: Poller<'a>,
        repo: &'a str,
        head_branch: &'a str,
    ) -> Self {
        Self {
            api,
            poller,
            repo,
            head_branch,
        }
    }

    /// Find the open upgrade PR for one organization. The upgrade workflow
    /// keeps a single PR per org alive rather than stacking duplicates, so
    /// zero or one result is expected. Zero is a successful no-op.
    pub async fn discover(&self, org: &str) -> Result<Option<UpgradePull>, FleetError> {
        println!("🔍 Finding upgrade PR for {org}...");
        let pull = self
            .api
            .open_upgrade_pull(org, self.repo, self.head_branch)
            .await
            .map_err(|source| FleetError::PullLookupFailed {
                org: org.to_string(),
                source,
            })?;

        match &pull {
            Some(pr) => println!("   Found {}", pr.html_url),
            None => println!("   No open upgrade PR for {org}"),
        }
        Ok(pull)
    }

    /// Poll the PR's check suite until every check run is completed, then
    /// return the final suite. Conclusions are not judged here.
    pub async fn await_checks(&self, pr: &UpgradePull) -> Result<CheckRunList, FleetError> {
        println!("⏳ Waiting for checks to complete on {}...", pr.html_url);
        let base = pr.base_repo();
        let head_ref = pr.head_ref();
        let pr_url = pr.html_url.as_str();
        let label = format!("checks on {pr_url}");

        self.poller
            .wait_until(
                &label,
                || async move {
                    self.api.check_runs_for_ref(base, head_ref).await.map_err(
                        |source| FleetError::CheckLookupFailed {
                            pr_url: pr_url.to_string(),
                            source,
                        },
                    )
                },
                CheckRunList::all_completed,
            )
            .await
    }

    /// Passing means every check run concluded with success. Anything else
    /// is fatal; the PR is left unmerged.
    pub fn classify(&self, pr: &UpgradePull, checks: &CheckRunList) -> Result<(), FleetError> {
        let failed = checks.failing_names();
        if failed.is_empty() {
            println!("   ✅ Checks completed for {}", pr.html_url);
            Ok(())
        } else {
            Err(FleetError::ChecksFailed {
                pr_url: pr.html_url.clone(),
                failed,
            })
        }
    }

    /// Squash-merge the PR into its base repository.
    pub async fn merge(&self, pr: &UpgradePull) -> Result<(), FleetError> {
        println!("🔀 Merging {}...", pr.html_url);
        let outcome = self
            .api
            .squash_merge(pr.base_repo(), pr.number)
            .await
            .map_err(|source| FleetError::MergeFailed {
                pr_url: pr.html_url.clone(),
                source,
            })?;

        if !outcome.merged {
            return Err(FleetError::MergeRejected {
                pr_url: pr.html_url.clone(),
                message: outcome
                    .message
                    .unwrap_or_else(|| "no reason given".to_string()),
            });
        }

        info!(pr = %pr.html_url, base = %pr.base_repo().full_name(), "merged upgrade PR");
        println!("   ✅ Merged {}", pr.html_url);
        Ok(())
    }
}

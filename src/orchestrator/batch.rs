//! Sequences the job orchestrator and PR gate over the whole organization
//! list. Strictly sequential within each phase: the first fatal error aborts
//! the batch with unambiguous attribution, and nothing runs concurrently
//! against the rate-limited API.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::{FleetConfig, FlowSettings};
use crate::error::FleetError;
use crate::github::types::UpgradePull;
use crate::github::FleetOps;
use crate::orchestrator::job::JobOrchestrator;
use crate::orchestrator::pr_gate::PrGate;
use crate::poller::{Poller, Sleeper};

pub struct BatchRunner<'a> {
    api: &'a dyn FleetOps,
    sleeper: &'a dyn Sleeper,
    config: &'a FleetConfig,
}

impl<'a> BatchRunner<'a> {
    pub fn new(api: &'a dyn FleetOps, sleeper: &'a dyn Sleeper, config: &'a FleetConfig) -> Self {
        Self {
            api,
            sleeper,
            config,
        }
    }

    /// Dispatch the sync workflow everywhere, then wait for every run to
    /// conclude successfully.
    pub async fn run_sync(&self, requested: &[String]) -> Result<(), FleetError> {
        let orgs = self.resolve_orgs(requested);
        if orgs.is_empty() {
            warn!("no organizations requested or configured, nothing to do");
            return Ok(());
        }

        let jobs = self.job_orchestrator(&self.config.sync);
        self.dispatch_and_await(&jobs, orgs, "sync").await?;
        println!("🎉 All syncs completed successfully");
        Ok(())
    }

    /// Dispatch the upgrade workflow everywhere, wait for every run, then
    /// discover, gate, and merge the PRs the upgrades opened.
    pub async fn run_upgrade(&self, requested: &[String]) -> Result<(), FleetError> {
        let orgs = self.resolve_orgs(requested);
        if orgs.is_empty() {
            warn!("no organizations requested or configured, nothing to do");
            return Ok(());
        }

        let jobs = self.job_orchestrator(&self.config.upgrade);
        self.dispatch_and_await(&jobs, orgs, "upgrade").await?;

        let gate = PrGate::new(
            self.api,
            Poller::new(
                self.sleeper,
                Duration::from_secs(self.config.checks.poll_interval_secs),
                self.config.poll_timeout(),
            ),
            &self.config.github.mgmt_repo,
            &self.config.github.upgrade_head_branch,
        );

        let mut pulls: Vec<UpgradePull> = Vec::new();
        for org in orgs {
            if let Some(pull) = gate.discover(org).await? {
                pulls.push(pull);
            }
        }
        info!(count = pulls.len(), "discovered upgrade PRs");

        // Every PR must be completed and passing before the first merge is
        // issued; merging is a separate final pass over the batch.
        for pull in &pulls {
            let checks = gate.await_checks(pull).await?;
            gate.classify(pull, &checks)?;
        }

        for pull in &pulls {
            gate.merge(pull).await?;
        }

        println!("🎉 All upgrades completed, {} PR(s) merged", pulls.len());
        Ok(())
    }

    fn resolve_orgs<'b>(&'b self, requested: &'b [String]) -> &'b [String] {
        if requested.is_empty() {
            &self.config.orgs
        } else {
            requested
        }
    }

    fn job_orchestrator(&self, flow: &'a FlowSettings) -> JobOrchestrator<'a> {
        JobOrchestrator::new(
            self.api,
            Poller::new(
                self.sleeper,
                Duration::from_secs(flow.poll_interval_secs),
                self.config.poll_timeout(),
            ),
            &self.config.github.mgmt_repo,
            &flow.workflow_file,
            &self.config.github.dispatch_ref,
        )
    }

    /// Dispatch across all orgs, grace-wait once for the remote runs to
    /// materialize, then await each run in the same order.
    async fn dispatch_and_await(
        &self,
        jobs: &JobOrchestrator<'_>,
        orgs: &[String],
        flow: &str,
    ) -> Result<(), FleetError> {
        for org in orgs {
            println!("🔄 Dispatching {flow} for {org}...");
            jobs.dispatch(org).await?;
            println!("   {org} {flow} initiated");
        }

        let grace = self.config.startup_grace();
        println!(
            "⏳ Waiting {}s for the workflow runs to start...",
            grace.as_secs()
        );
        self.sleeper.sleep(grace).await;

        for org in orgs {
            println!("👀 Waiting for {org} {flow} to complete...");
            let run = jobs.locate_latest_run(org).await?;
            let completed = jobs.await_success(org, run).await?;
            println!("   ✅ {flow} completed for {org}: {}", completed.html_url);
        }
        Ok(())
    }
}
